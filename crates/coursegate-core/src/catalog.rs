//! Canonical in-memory catalog: items plus the prerequisite graph.
//!
//! Single-threaded and deterministic. `AccessEngine` wraps it with a lock;
//! the CLI mutates it inside a lock-file scope and persists it as JSONL.

use crate::access::{AccessDecision, AccessError, AccessEvaluator};
use crate::completion::CompletionTracker;
use crate::edge::{EdgeError, PrerequisiteEdge};
use crate::events::{InvalidationCause, InvalidationEvent};
use crate::graph::PrerequisiteGraph;
use crate::guard::find_cycle;
use crate::item::{Item, ItemSummary};
use crate::jsonl::{CatalogRecord, JsonlError, read_catalog_from_path, write_catalog_to_path};
use crate::registry::{ItemRegistry, MemoryRegistry, RegistryError};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Errors raised while building a catalog from records.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("record {index}: rejected prerequisite: {source}")]
    Edge {
        index: usize,
        #[source]
        source: EdgeError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    registry: MemoryRegistry,
    graph: PrerequisiteGraph,
}

/// Result of deleting an item.
#[derive(Debug, Clone)]
pub struct ItemDeletion {
    pub item: Item,
    pub removed_edges: Vec<PrerequisiteEdge>,
    pub invalidation: InvalidationEvent,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from records in file order.
    ///
    /// Items are registered first. Edges then get the per-edge checks of
    /// `add_prerequisite` (self reference, endpoints, duplicates), followed by
    /// one cycle search over the whole graph. A cycle is reported against the
    /// record that closed it: the latest edge of the cycle in file order.
    pub fn from_records(records: Vec<CatalogRecord>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        let mut edges = Vec::new();
        for (index, record) in records.into_iter().enumerate() {
            match record {
                CatalogRecord::Item(item) => {
                    catalog.registry.upsert(item);
                }
                CatalogRecord::Prerequisite(edge) => edges.push((index + 1, edge)),
            }
        }

        // Record index of each committed edge, parallel to `graph.edges()`.
        let mut record_indices = Vec::with_capacity(edges.len());
        for (index, edge) in edges {
            catalog
                .graph
                .add_edge_deferred(&catalog.registry, edge)
                .map_err(|source| CatalogError::Edge { index, source })?;
            record_indices.push(index);
        }

        if let Some(cycle) = find_cycle(catalog.graph.referenced_ids(), &catalog.graph) {
            return Err(cycle_error(&catalog.graph, &record_indices, &cycle));
        }
        Ok(catalog)
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_records(read_catalog_from_path(path)?)
    }

    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        write_catalog_to_path(path, &self.to_records())?;
        Ok(())
    }

    /// Items in ID order, then edges in insertion order.
    pub fn to_records(&self) -> Vec<CatalogRecord> {
        self.registry
            .items()
            .cloned()
            .map(CatalogRecord::Item)
            .chain(
                self.graph
                    .edges()
                    .iter()
                    .cloned()
                    .map(CatalogRecord::Prerequisite),
            )
            .collect()
    }

    pub fn registry(&self) -> &MemoryRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &PrerequisiteGraph {
        &self.graph
    }

    pub fn get_item(&self, id: &str) -> Result<&Item, RegistryError> {
        self.registry.get_item(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.registry.items()
    }

    /// Insert or replace an item. Returns the previous value if present.
    ///
    /// A replacement keeps the existing item's `created_at`.
    pub fn upsert_item(&mut self, mut item: Item) -> Option<Item> {
        if let Ok(existing) = self.registry.get_item(&item.id) {
            item.created_at = existing.created_at;
        }
        debug!(item = %item.id, kind = %item.kind, "item upserted");
        self.registry.upsert(item)
    }

    pub fn rename_item(&mut self, id: &str, title: &str) -> Result<&Item, RegistryError> {
        self.registry.rename(id, title)
    }

    /// Delete an item and cascade every edge that references it.
    ///
    /// The invalidation scope is the item and its transitive dependents,
    /// computed before the cascade removes the edges that define it.
    pub fn delete_item(&mut self, id: &str) -> Result<ItemDeletion, RegistryError> {
        let dependents = self.graph.transitive_dependents(id);
        let item = self.registry.remove(id)?;
        let removed_edges = self.graph.remove_item(id);
        debug!(item = %id, edges = removed_edges.len(), "item deleted");
        Ok(ItemDeletion {
            item,
            removed_edges,
            invalidation: InvalidationEvent::new(
                InvalidationCause::ItemDeleted {
                    item_id: id.to_string(),
                },
                id,
                dependents,
            ),
        })
    }

    pub fn add_prerequisite(
        &mut self,
        edge: PrerequisiteEdge,
    ) -> Result<InvalidationEvent, EdgeError> {
        let cause = InvalidationCause::PrerequisiteAdded {
            from: edge.from.clone(),
            to: edge.to.clone(),
        };
        let from = edge.from.clone();
        self.graph.add_edge(&self.registry, edge)?;
        Ok(self.invalidation_for(cause, &from))
    }

    pub fn remove_prerequisite(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<InvalidationEvent, EdgeError> {
        self.graph.remove_edge(from, to)?;
        let cause = InvalidationCause::PrerequisiteRemoved {
            from: from.to_string(),
            to: to.to_string(),
        };
        Ok(self.invalidation_for(cause, from))
    }

    /// Direct prerequisites of `item_id` in insertion order, resolved for
    /// display. Unresolvable IDs come back unresolved rather than dropped.
    pub fn list_prerequisites(&self, item_id: &str) -> Result<Vec<ItemSummary>, RegistryError> {
        self.registry.get_item(item_id)?;
        Ok(self.summarize(self.graph.list_prerequisites_of(item_id)))
    }

    /// Direct dependents of `item_id`, or every transitive dependent.
    pub fn list_dependents(
        &self,
        item_id: &str,
        transitive: bool,
    ) -> Result<Vec<ItemSummary>, RegistryError> {
        self.registry.get_item(item_id)?;
        if transitive {
            Ok(self.summarize(&self.graph.transitive_dependents(item_id)))
        } else {
            Ok(self.summarize(self.graph.list_dependents(item_id)))
        }
    }

    pub fn check_access<C>(
        &self,
        tracker: &C,
        learner_id: &str,
        item_id: &str,
    ) -> Result<AccessDecision, AccessError>
    where
        C: CompletionTracker + ?Sized,
    {
        AccessEvaluator::new(&self.registry, &self.graph, tracker).check_access(learner_id, item_id)
    }

    fn invalidation_for(&self, cause: InvalidationCause, root: &str) -> InvalidationEvent {
        InvalidationEvent::new(cause, root, self.graph.transitive_dependents(root))
    }

    fn summarize(&self, ids: &[String]) -> Vec<ItemSummary> {
        ids.iter()
            .map(|id| match self.registry.get_item(id) {
                Ok(item) => ItemSummary::from(item),
                Err(_) => ItemSummary::unresolved(id.as_str()),
            })
            .collect()
    }
}

fn cycle_error(
    graph: &PrerequisiteGraph,
    record_indices: &[usize],
    cycle: &[String],
) -> CatalogError {
    let pairs: HashSet<(&str, &str)> = cycle
        .iter()
        .zip(cycle.iter().cycle().skip(1))
        .map(|(from, to)| (from.as_str(), to.as_str()))
        .collect();
    let closing = graph
        .edges()
        .iter()
        .zip(record_indices)
        .rev()
        .find(|(edge, _)| pairs.contains(&(edge.from.as_str(), edge.to.as_str())));

    // find_cycle only walks committed edges, so `closing` is always found.
    let (index, from, to) = match closing {
        Some((edge, index)) => (*index, edge.from.clone(), edge.to.clone()),
        None => {
            let first = cycle.first().cloned().unwrap_or_default();
            (0, first.clone(), first)
        }
    };
    CatalogError::Edge {
        index,
        source: EdgeError::CycleRejected { from, to },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionLog, CompletionRecord};

    fn catalog(ids: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        for id in ids {
            catalog.upsert_item(Item::lesson(*id, format!("Lesson {id}")));
        }
        catalog
    }

    fn edge(from: &str, to: &str) -> PrerequisiteEdge {
        PrerequisiteEdge::new(from, to)
    }

    #[test]
    fn deleting_prerequisite_drops_it_from_dependent_decisions() {
        let mut catalog = catalog(&["x", "y"]);
        catalog.add_prerequisite(edge("x", "y")).expect("edge should add");
        let tracker = CompletionLog::default();

        let before = catalog
            .check_access(&tracker, "learner-1", "x")
            .expect("decision should evaluate");
        assert_eq!(before.missing_ids(), ["y"]);

        let deletion = catalog.delete_item("y").expect("item should delete");
        assert_eq!(deletion.removed_edges.len(), 1);
        assert_eq!(deletion.invalidation.affected, vec!["y", "x"]);

        let after = catalog
            .check_access(&tracker, "learner-1", "x")
            .expect("decision should evaluate");
        assert!(after.has_access);
        assert!(catalog.list_prerequisites("x").expect("x exists").is_empty());
    }

    #[test]
    fn mutation_invalidates_dependents_two_hops_away() {
        // capstone -> unit-2 -> unit-1; adding unit-1 -> intro changes
        // what unit-2 and capstone see downstream.
        let mut catalog = catalog(&["intro", "unit-1", "unit-2", "capstone"]);
        catalog.add_prerequisite(edge("unit-2", "unit-1")).expect("edge should add");
        catalog.add_prerequisite(edge("capstone", "unit-2")).expect("edge should add");

        let event = catalog
            .add_prerequisite(edge("unit-1", "intro"))
            .expect("edge should add");
        assert_eq!(event.affected, vec!["unit-1", "capstone", "unit-2"]);

        let event = catalog
            .remove_prerequisite("unit-1", "intro")
            .expect("edge should remove");
        assert!(event.affects("capstone"));
        assert!(matches!(
            event.cause,
            InvalidationCause::PrerequisiteRemoved { .. }
        ));
    }

    #[test]
    fn from_records_rejects_cyclic_catalog() {
        let records = vec![
            CatalogRecord::Item(Item::course("a", "A")),
            CatalogRecord::Item(Item::course("b", "B")),
            CatalogRecord::Prerequisite(edge("a", "b")),
            CatalogRecord::Prerequisite(edge("b", "a")),
        ];
        let err = Catalog::from_records(records).expect_err("cycle must be rejected");
        assert!(matches!(
            err,
            CatalogError::Edge {
                index: 4,
                source: EdgeError::CycleRejected { .. }
            }
        ));
    }

    #[test]
    fn from_records_blames_the_record_that_closes_the_cycle() {
        let records = vec![
            CatalogRecord::Item(Item::course("a", "A")),
            CatalogRecord::Item(Item::course("b", "B")),
            CatalogRecord::Item(Item::course("c", "C")),
            CatalogRecord::Item(Item::course("d", "D")),
            CatalogRecord::Prerequisite(edge("a", "b")),
            CatalogRecord::Prerequisite(edge("c", "a")),
            CatalogRecord::Prerequisite(edge("b", "c")),
            CatalogRecord::Prerequisite(edge("d", "a")),
        ];
        let err = Catalog::from_records(records).expect_err("cycle must be rejected");
        match err {
            CatalogError::Edge {
                index,
                source: EdgeError::CycleRejected { from, to },
            } => {
                assert_eq!(index, 7);
                assert_eq!((from.as_str(), to.as_str()), ("b", "c"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_records_loads_long_chain_in_authoring_order() {
        // Each lesson requires the one before it, listed oldest first.
        const LEN: usize = 20_000;
        let ids: Vec<String> = (0..LEN).map(|i| format!("n{i:07}")).collect();
        let mut records: Vec<CatalogRecord> = ids
            .iter()
            .map(|id| CatalogRecord::Item(Item::lesson(id.as_str(), id.as_str())))
            .collect();
        records.extend(
            ids.windows(2)
                .map(|pair| CatalogRecord::Prerequisite(edge(&pair[1], &pair[0]))),
        );

        let catalog = Catalog::from_records(records).expect("acyclic chain should load");
        assert_eq!(catalog.graph().edge_count(), LEN - 1);
        assert_eq!(catalog.graph().list_prerequisites_of("n0000001"), ["n0000000"]);
    }

    #[test]
    fn replacing_an_item_keeps_its_creation_time() {
        let mut catalog = Catalog::new();
        let original = Item::course("a", "A");
        let created_at = original.created_at;
        catalog.upsert_item(original);

        let mut replacement = Item::lesson("a", "A, revised");
        replacement.created_at = created_at + chrono::Duration::days(1);
        let previous = catalog.upsert_item(replacement);

        assert_eq!(previous.map(|item| item.title).as_deref(), Some("A"));
        let stored = catalog.get_item("a").expect("a exists");
        assert_eq!(stored.created_at, created_at);
        assert_eq!(stored.title, "A, revised");
        assert_eq!(stored.kind, crate::item::ItemKind::Lesson);
    }

    #[test]
    fn from_records_accepts_edges_listed_before_items() {
        let records = vec![
            CatalogRecord::Prerequisite(edge("b", "a")),
            CatalogRecord::Item(Item::course("a", "A")),
            CatalogRecord::Item(Item::course("b", "B")),
        ];
        let catalog = Catalog::from_records(records).expect("catalog should build");
        assert_eq!(catalog.graph().edge_count(), 1);
    }

    #[test]
    fn scenario_one_of_two_prerequisites_completed() {
        let mut catalog = catalog(&["a", "b", "c"]);
        catalog.add_prerequisite(edge("c", "a")).expect("edge should add");
        catalog.add_prerequisite(edge("c", "b")).expect("edge should add");
        let tracker = CompletionLog::from_records([CompletionRecord::now("learner-1", "a")]);

        let decision = catalog
            .check_access(&tracker, "learner-1", "c")
            .expect("decision should evaluate");
        assert!(!decision.has_access);
        assert_eq!(decision.missing_ids(), ["b"]);
        assert_eq!(
            decision.missing_prerequisites[0].title.as_deref(),
            Some("Lesson b")
        );
    }

    #[test]
    fn list_dependents_direct_and_transitive() {
        let mut catalog = catalog(&["a", "b", "c"]);
        catalog.add_prerequisite(edge("b", "a")).expect("edge should add");
        catalog.add_prerequisite(edge("c", "b")).expect("edge should add");

        let direct = catalog.list_dependents("a", false).expect("a exists");
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].id, "b");

        let all = catalog.list_dependents("a", true).expect("a exists");
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);

        assert!(matches!(
            catalog.list_dependents("ghost", false),
            Err(RegistryError::ItemNotFound(_))
        ));
    }
}
