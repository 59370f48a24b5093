//! Prerequisite graph store.
//!
//! Owns the edge set and keeps two indices over it:
//! - `outgoing`: item -> direct prerequisites, in edge insertion order
//! - `incoming`: item -> dependents (reverse index)
//!
//! Mutations validate endpoints against an `ItemRegistry` and run the
//! mutation guard before committing, so the graph is never observably cyclic.

use crate::edge::{EdgeError, PrerequisiteEdge};
use crate::guard::{EdgeSource, ensure_acyclic_insert};
use crate::registry::ItemRegistry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PrerequisiteGraph {
    edges: Vec<PrerequisiteEdge>,
    outgoing: BTreeMap<String, Vec<String>>,
    incoming: BTreeMap<String, Vec<String>>,
}

impl PrerequisiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build indices over edges without validating them.
    ///
    /// Used by whole-graph checks that need to report on bad data rather than
    /// reject it. Duplicate pairs are indexed once.
    pub fn from_edges_unchecked(edges: impl IntoIterator<Item = PrerequisiteEdge>) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            if graph.contains_edge(&edge.from, &edge.to) {
                continue;
            }
            graph.commit(edge);
        }
        graph
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[PrerequisiteEdge] {
        &self.edges
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.outgoing
            .get(from)
            .is_some_and(|targets| targets.iter().any(|t| t == to))
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&PrerequisiteEdge> {
        self.edges.iter().find(|edge| edge.connects(from, to))
    }

    /// Direct (one-hop) prerequisites of `item_id`, in edge insertion order.
    pub fn list_prerequisites_of(&self, item_id: &str) -> &[String] {
        self.outgoing
            .get(item_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Items that name `item_id` as a direct prerequisite.
    pub fn list_dependents(&self, item_id: &str) -> &[String] {
        self.incoming
            .get(item_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every item reachable from `item_id` through the reverse index.
    ///
    /// Excludes `item_id` itself. Returned in ascending ID order.
    pub fn transitive_dependents(&self, item_id: &str) -> Vec<String> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(item_id);

        while let Some(current) = queue.pop_front() {
            for dependent in self.list_dependents(current) {
                if dependent != item_id && seen.insert(dependent.as_str()) {
                    queue.push_back(dependent.as_str());
                }
            }
        }

        seen.into_iter().map(str::to_string).collect()
    }

    /// IDs referenced by at least one edge, in ascending order.
    pub fn referenced_ids(&self) -> BTreeSet<&str> {
        self.edges
            .iter()
            .flat_map(|edge| [edge.from.as_str(), edge.to.as_str()])
            .collect()
    }

    /// Add `edge.from -> edge.to`.
    ///
    /// Checks, in order: self reference, both endpoints registered, duplicate
    /// pair, cycle. Nothing is committed unless every check passes.
    pub fn add_edge<R>(&mut self, registry: &R, edge: PrerequisiteEdge) -> Result<(), EdgeError>
    where
        R: ItemRegistry + ?Sized,
    {
        self.check_insert(registry, &edge)?;
        ensure_acyclic_insert(&edge.from, &edge.to, &*self)?;

        debug!(from = %edge.from, to = %edge.to, "prerequisite added");
        self.commit(edge);
        Ok(())
    }

    /// Add an edge with every check except the cycle guard.
    ///
    /// For bulk loads: the caller runs one `find_cycle` over the finished
    /// graph instead of one reachability search per edge, and must discard
    /// the graph if a cycle turns up.
    pub(crate) fn add_edge_deferred<R>(
        &mut self,
        registry: &R,
        edge: PrerequisiteEdge,
    ) -> Result<(), EdgeError>
    where
        R: ItemRegistry + ?Sized,
    {
        self.check_insert(registry, &edge)?;
        self.commit(edge);
        Ok(())
    }

    fn check_insert<R>(&self, registry: &R, edge: &PrerequisiteEdge) -> Result<(), EdgeError>
    where
        R: ItemRegistry + ?Sized,
    {
        if edge.is_self_reference() {
            return Err(EdgeError::SelfReferenceRejected(edge.from.clone()));
        }
        if !registry.item_exists(&edge.from) {
            return Err(EdgeError::ItemNotFound(edge.from.clone()));
        }
        if !registry.item_exists(&edge.to) {
            return Err(EdgeError::ItemNotFound(edge.to.clone()));
        }
        if self.contains_edge(&edge.from, &edge.to) {
            return Err(EdgeError::EdgeAlreadyExists {
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
        }
        Ok(())
    }

    /// Remove `from -> to`. Removing an edge can never introduce a cycle.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> Result<PrerequisiteEdge, EdgeError> {
        let position = self
            .edges
            .iter()
            .position(|edge| edge.connects(from, to))
            .ok_or_else(|| EdgeError::EdgeNotFound {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        let removed = self.edges.remove(position);
        unlink(&mut self.outgoing, from, to);
        unlink(&mut self.incoming, to, from);
        debug!(from = %from, to = %to, "prerequisite removed");
        Ok(removed)
    }

    /// Cascade-remove every edge that touches `item_id`.
    ///
    /// Returns the removed edges in their original insertion order.
    pub fn remove_item(&mut self, item_id: &str) -> Vec<PrerequisiteEdge> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|edge| edge.from == item_id || edge.to == item_id);

        for edge in &removed {
            unlink(&mut self.outgoing, &edge.from, &edge.to);
            unlink(&mut self.incoming, &edge.to, &edge.from);
        }
        self.edges = kept;

        if !removed.is_empty() {
            debug!(item = %item_id, removed = removed.len(), "cascaded prerequisite edges");
        }
        removed
    }

    fn commit(&mut self, edge: PrerequisiteEdge) {
        self.outgoing
            .entry(edge.from.clone())
            .or_default()
            .push(edge.to.clone());
        self.incoming
            .entry(edge.to.clone())
            .or_default()
            .push(edge.from.clone());
        self.edges.push(edge);
    }
}

impl EdgeSource for PrerequisiteGraph {
    fn direct_prerequisites(&self, item_id: &str) -> &[String] {
        self.list_prerequisites_of(item_id)
    }
}

fn unlink(index: &mut BTreeMap<String, Vec<String>>, key: &str, value: &str) {
    if let Some(values) = index.get_mut(key) {
        values.retain(|v| v != value);
        if values.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::would_create_cycle;
    use crate::item::Item;
    use crate::registry::MemoryRegistry;

    fn registry(ids: &[&str]) -> MemoryRegistry {
        MemoryRegistry::from_items(ids.iter().map(|id| Item::course(*id, format!("Course {id}"))))
    }

    fn add(
        graph: &mut PrerequisiteGraph,
        registry: &MemoryRegistry,
        from: &str,
        to: &str,
    ) -> Result<(), EdgeError> {
        graph.add_edge(registry, PrerequisiteEdge::new(from, to))
    }

    #[test]
    fn reverse_edge_is_rejected_and_graph_unchanged() {
        let items = registry(&["x", "y"]);
        let mut graph = PrerequisiteGraph::new();

        add(&mut graph, &items, "x", "y").expect("first edge should add");
        let err = add(&mut graph, &items, "y", "x").expect_err("reverse edge must fail");

        assert!(matches!(err, EdgeError::CycleRejected { .. }));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge("x", "y"));
        assert!(!graph.contains_edge("y", "x"));
    }

    #[test]
    fn added_edge_makes_its_reverse_a_cycle() {
        let items = registry(&["a", "b", "c"]);
        let mut graph = PrerequisiteGraph::new();

        for (from, to) in [("c", "b"), ("b", "a"), ("c", "a")] {
            add(&mut graph, &items, from, to).expect("edge should add");
            assert!(would_create_cycle(to, from, &graph));
        }
    }

    #[test]
    fn add_edge_rejects_self_reference_duplicates_and_unknown_items() {
        let items = registry(&["a", "b"]);
        let mut graph = PrerequisiteGraph::new();

        assert_eq!(
            add(&mut graph, &items, "a", "a"),
            Err(EdgeError::SelfReferenceRejected("a".to_string()))
        );
        assert_eq!(
            add(&mut graph, &items, "a", "ghost"),
            Err(EdgeError::ItemNotFound("ghost".to_string()))
        );

        add(&mut graph, &items, "a", "b").expect("edge should add");
        assert_eq!(
            add(&mut graph, &items, "a", "b"),
            Err(EdgeError::EdgeAlreadyExists {
                from: "a".to_string(),
                to: "b".to_string()
            })
        );
    }

    #[test]
    fn remove_edge_reports_missing_edge_not_cycle() {
        let items = registry(&["a", "b"]);
        let mut graph = PrerequisiteGraph::new();
        add(&mut graph, &items, "a", "b").expect("edge should add");

        let removed = graph.remove_edge("a", "b").expect("edge should remove");
        assert_eq!(removed.to, "b");
        assert!(graph.list_prerequisites_of("a").is_empty());
        assert!(graph.list_dependents("b").is_empty());

        assert_eq!(
            graph.remove_edge("a", "b"),
            Err(EdgeError::EdgeNotFound {
                from: "a".to_string(),
                to: "b".to_string()
            })
        );
    }

    #[test]
    fn prerequisites_keep_insertion_order() {
        let items = registry(&["x", "p3", "p1", "p2"]);
        let mut graph = PrerequisiteGraph::new();
        for p in ["p3", "p1", "p2"] {
            add(&mut graph, &items, "x", p).expect("edge should add");
        }
        assert_eq!(graph.list_prerequisites_of("x"), ["p3", "p1", "p2"]);
    }

    #[test]
    fn remove_item_cascades_both_directions() {
        let items = registry(&["x", "y", "z"]);
        let mut graph = PrerequisiteGraph::new();
        add(&mut graph, &items, "x", "y").expect("edge should add");
        add(&mut graph, &items, "y", "z").expect("edge should add");
        add(&mut graph, &items, "x", "z").expect("edge should add");

        let removed = graph.remove_item("y");
        assert_eq!(removed.len(), 2);
        assert_eq!(graph.list_prerequisites_of("x"), ["z"]);
        assert_eq!(graph.list_dependents("z"), ["x"]);
        assert!(graph.list_dependents("y").is_empty());
    }

    #[test]
    fn transitive_dependents_follow_reverse_index() {
        // lesson-3 requires lesson-2 requires lesson-1; capstone requires lesson-3
        let items = registry(&["lesson-1", "lesson-2", "lesson-3", "capstone", "other"]);
        let mut graph = PrerequisiteGraph::new();
        add(&mut graph, &items, "lesson-2", "lesson-1").expect("edge should add");
        add(&mut graph, &items, "lesson-3", "lesson-2").expect("edge should add");
        add(&mut graph, &items, "capstone", "lesson-3").expect("edge should add");

        assert_eq!(
            graph.transitive_dependents("lesson-1"),
            vec!["capstone", "lesson-2", "lesson-3"]
        );
        assert!(graph.transitive_dependents("other").is_empty());
    }

    #[test]
    fn unchecked_build_indexes_duplicates_once() {
        let graph = PrerequisiteGraph::from_edges_unchecked(vec![
            PrerequisiteEdge::new("a", "b"),
            PrerequisiteEdge::new("a", "b"),
        ]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.referenced_ids().into_iter().collect::<Vec<_>>(), ["a", "b"]);
    }
}
