//! Graph mutation guard: keeps the prerequisite graph acyclic.
//!
//! `would_create_cycle` is the per-mutation check run inside `add_edge`.
//! `find_cycle` is the whole-graph check used when a catalog is loaded from
//! disk, where edges did not pass through the guard.

use crate::edge::EdgeError;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Read access to direct ("requires") adjacency.
pub trait EdgeSource {
    /// Direct prerequisites of `item_id`, in insertion order.
    fn direct_prerequisites(&self, item_id: &str) -> &[String];
}

impl EdgeSource for BTreeMap<String, Vec<String>> {
    fn direct_prerequisites(&self, item_id: &str) -> &[String] {
        self.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Whether adding `from -> to` would close a cycle.
///
/// Searches breadth-first from `to` along existing requires-edges; if `from`
/// is reachable the new edge would close a loop. O(V+E).
pub fn would_create_cycle<'a, E>(from: &str, to: &'a str, edges: &'a E) -> bool
where
    E: EdgeSource + ?Sized,
{
    if from == to {
        return true;
    }

    let mut visited: HashSet<&'a str> = HashSet::new();
    let mut queue: VecDeque<&'a str> = VecDeque::new();
    visited.insert(to);
    queue.push_back(to);

    while let Some(current) = queue.pop_front() {
        for next in edges.direct_prerequisites(current) {
            if next == from {
                return true;
            }
            if visited.insert(next.as_str()) {
                queue.push_back(next.as_str());
            }
        }
    }

    false
}

/// Reject `from -> to` with `CycleRejected` when it would close a cycle.
pub fn ensure_acyclic_insert<E>(from: &str, to: &str, edges: &E) -> Result<(), EdgeError>
where
    E: EdgeSource + ?Sized,
{
    if would_create_cycle(from, to, edges) {
        return Err(EdgeError::CycleRejected {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

/// Find one cycle among `nodes`, if any.
///
/// Returns the cycle as a path of item IDs where each element requires the
/// next and the last requires the first. Depth-first with an explicit stack,
/// so path length is bounded by memory rather than the thread stack.
pub fn find_cycle<'a, E, I>(nodes: I, edges: &'a E) -> Option<Vec<String>>
where
    E: EdgeSource + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut visiting: HashSet<&'a str> = HashSet::new();
    let mut visited: HashSet<&'a str> = HashSet::new();

    for node in nodes {
        if visited.contains(node) {
            continue;
        }
        if let Some(cycle) = cycle_dfs(node, edges, &mut visiting, &mut visited) {
            return Some(cycle);
        }
    }

    None
}

/// One DFS tree rooted at `root`. Each frame is a node on the current path
/// plus the index of its next prerequisite to explore.
fn cycle_dfs<'a, E>(
    root: &'a str,
    edges: &'a E,
    visiting: &mut HashSet<&'a str>,
    visited: &mut HashSet<&'a str>,
) -> Option<Vec<String>>
where
    E: EdgeSource + ?Sized,
{
    let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
    visiting.insert(root);

    while let Some(frame) = stack.last_mut() {
        let (node, next_child) = *frame;
        let Some(next) = edges.direct_prerequisites(node).get(next_child) else {
            stack.pop();
            visiting.remove(node);
            visited.insert(node);
            continue;
        };
        frame.1 += 1;

        let next = next.as_str();
        if visiting.contains(next) {
            let start = stack.iter().position(|(n, _)| *n == next)?;
            return Some(stack[start..].iter().map(|(n, _)| n.to_string()).collect());
        }
        if !visited.contains(next) {
            visiting.insert(next);
            stack.push((next, 0));
        }
    }

    None
}
