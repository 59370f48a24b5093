//! Thread-safe access engine.
//!
//! One `RwLock` per engine: reads (`check_access`, listings) share it, and
//! every mutation holds the write lock across the guard check and the commit.
//! Two concurrent `add_prerequisite` calls therefore cannot both pass the
//! cycle check against the same snapshot.
//!
//! Invalidation listeners run after the write lock is released.

use crate::access::{AccessDecision, AccessError};
use crate::catalog::{Catalog, ItemDeletion};
use crate::completion::CompletionTracker;
use crate::edge::{EdgeError, PrerequisiteEdge};
use crate::events::{InvalidationEvent, InvalidationListener, Listeners};
use crate::item::{Item, ItemSummary};
use crate::registry::RegistryError;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
pub struct AccessEngine<C> {
    catalog: RwLock<Catalog>,
    tracker: C,
    listeners: Listeners,
}

impl<C: CompletionTracker> AccessEngine<C> {
    pub fn new(catalog: Catalog, tracker: C) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            tracker,
            listeners: Listeners::default(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn InvalidationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn InvalidationListener>) {
        self.listeners.push(listener);
    }

    pub fn tracker(&self) -> &C {
        &self.tracker
    }

    /// Clone of the current catalog state.
    pub fn snapshot(&self) -> Catalog {
        self.read().clone()
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn check_access(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> Result<AccessDecision, AccessError> {
        self.read()
            .check_access(&self.tracker, learner_id, item_id)
    }

    pub fn get_item(&self, id: &str) -> Result<Item, RegistryError> {
        self.read().get_item(id).cloned()
    }

    pub fn item_exists(&self, id: &str) -> bool {
        self.read().get_item(id).is_ok()
    }

    pub fn list_prerequisites(&self, item_id: &str) -> Result<Vec<ItemSummary>, RegistryError> {
        self.read().list_prerequisites(item_id)
    }

    pub fn list_dependents(
        &self,
        item_id: &str,
        transitive: bool,
    ) -> Result<Vec<ItemSummary>, RegistryError> {
        self.read().list_dependents(item_id, transitive)
    }

    pub fn upsert_item(&self, item: Item) -> Option<Item> {
        self.write().upsert_item(item)
    }

    pub fn rename_item(&self, id: &str, title: &str) -> Result<Item, RegistryError> {
        self.write().rename_item(id, title).cloned()
    }

    pub fn add_prerequisite(&self, from: &str, to: &str) -> Result<InvalidationEvent, EdgeError> {
        self.add_prerequisite_edge(PrerequisiteEdge::new(from, to))
    }

    pub fn add_prerequisite_edge(
        &self,
        edge: PrerequisiteEdge,
    ) -> Result<InvalidationEvent, EdgeError> {
        let event = self.write().add_prerequisite(edge)?;
        self.listeners.dispatch(&event);
        Ok(event)
    }

    pub fn remove_prerequisite(
        &self,
        from: &str,
        to: &str,
    ) -> Result<InvalidationEvent, EdgeError> {
        let event = self.write().remove_prerequisite(from, to)?;
        self.listeners.dispatch(&event);
        Ok(event)
    }

    /// React to an authoring-side deletion: drop the item and cascade edges.
    pub fn delete_item(&self, id: &str) -> Result<ItemDeletion, RegistryError> {
        let deletion = self.write().delete_item(id)?;
        self.listeners.dispatch(&deletion.invalidation);
        Ok(deletion)
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionLog, CompletionRecord, TrackerError};
    use crate::events::InvalidationCause;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<InvalidationEvent>>,
    }

    impl InvalidationListener for Recorder {
        fn on_invalidate(&self, event: &InvalidationEvent) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(event.clone());
            }
        }
    }

    struct Unreachable;

    impl CompletionTracker for Unreachable {
        fn is_completed(&self, _learner_id: &str, _item_id: &str) -> Result<bool, TrackerError> {
            Err(TrackerError::Unavailable("connection refused".to_string()))
        }
    }

    fn catalog(ids: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        for id in ids {
            catalog.upsert_item(Item::course(*id, format!("Course {id}")));
        }
        catalog
    }

    #[test]
    fn reverse_edge_is_rejected_and_no_event_is_emitted() {
        let recorder = Arc::new(Recorder::default());
        let engine = AccessEngine::new(catalog(&["x", "y"]), CompletionLog::default())
            .with_listener(recorder.clone());

        engine.add_prerequisite("x", "y").expect("first edge should add");
        let err = engine
            .add_prerequisite("y", "x")
            .expect_err("reverse edge must fail");
        assert!(matches!(err, EdgeError::CycleRejected { .. }));

        let seen = recorder.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            seen[0].cause,
            InvalidationCause::PrerequisiteAdded { .. }
        ));
        drop(seen);

        let prerequisites = engine.list_prerequisites("x").expect("x exists");
        assert_eq!(prerequisites.len(), 1);
        assert!(engine.list_prerequisites("y").expect("y exists").is_empty());
    }

    #[test]
    fn remove_prerequisite_never_reports_a_cycle() {
        let engine = AccessEngine::new(catalog(&["a", "b"]), CompletionLog::default());
        engine.add_prerequisite("a", "b").expect("edge should add");

        engine.remove_prerequisite("a", "b").expect("edge should remove");
        let err = engine
            .remove_prerequisite("a", "b")
            .expect_err("second removal must fail");
        assert!(matches!(err, EdgeError::EdgeNotFound { .. }));
    }

    #[test]
    fn delete_item_notifies_listeners_with_dependents() {
        let recorder = Arc::new(Recorder::default());
        let engine = AccessEngine::new(catalog(&["x", "y"]), CompletionLog::default())
            .with_listener(recorder.clone());
        engine.add_prerequisite("x", "y").expect("edge should add");

        let deletion = engine.delete_item("y").expect("item should delete");
        assert_eq!(deletion.item.id, "y");
        assert!(!engine.item_exists("y"));

        let seen = recorder.seen.lock().expect("lock");
        let last = seen.last().expect("deletion event");
        assert_eq!(last.affected, vec!["y", "x"]);
        drop(seen);

        let decision = engine
            .check_access("learner-1", "x")
            .expect("decision should evaluate");
        assert!(decision.has_access);
    }

    #[test]
    fn unreachable_tracker_is_surfaced_distinctly() {
        let engine = AccessEngine::new(catalog(&["a", "b"]), Unreachable);
        engine.add_prerequisite("b", "a").expect("edge should add");

        assert!(engine.check_access("learner-1", "a").is_ok());
        assert!(matches!(
            engine.check_access("learner-1", "b"),
            Err(AccessError::DependencyUnavailable { .. })
        ));
    }

    #[test]
    fn completions_unlock_items() {
        let tracker = CompletionLog::from_records([CompletionRecord::now("learner-1", "a")]);
        let engine = AccessEngine::new(catalog(&["a", "b"]), tracker);
        engine.add_prerequisite("b", "a").expect("edge should add");

        assert!(engine.check_access("learner-1", "b").expect("evaluates").has_access);
        assert!(!engine.check_access("learner-2", "b").expect("evaluates").has_access);
    }

    #[test]
    fn concurrent_opposite_edges_cannot_both_commit() {
        for _ in 0..32 {
            let engine = Arc::new(AccessEngine::new(
                catalog(&["p", "q"]),
                CompletionLog::default(),
            ));
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [("p", "q"), ("q", "p")]
                .into_iter()
                .map(|(from, to)| {
                    let engine = Arc::clone(&engine);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        engine.add_prerequisite(from, to).is_ok()
                    })
                })
                .collect();

            let successes = handles
                .into_iter()
                .map(|handle| handle.join().expect("thread should join"))
                .filter(|ok| *ok)
                .count();

            assert_eq!(successes, 1);
            assert_eq!(engine.snapshot().graph().edge_count(), 1);
        }
    }
}
