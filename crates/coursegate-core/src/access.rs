//! Access evaluation: may this learner open this item right now?
//!
//! Stateless. Each call reads direct prerequisites from the graph, asks the
//! completion tracker about each one, and resolves the unmet ones through the
//! registry. Nothing is cached between calls.

use crate::completion::{CompletionTracker, TrackerError};
use crate::graph::PrerequisiteGraph;
use crate::item::ItemKind;
use crate::registry::ItemRegistry;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// A prerequisite the learner has not satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPrerequisite {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    /// The edge points at an item the registry no longer knows.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dangling: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub has_access: bool,
    pub missing_prerequisites: Vec<MissingPrerequisite>,
}

impl AccessDecision {
    pub fn granted() -> Self {
        Self {
            has_access: true,
            missing_prerequisites: Vec::new(),
        }
    }

    pub fn from_missing(missing_prerequisites: Vec<MissingPrerequisite>) -> Self {
        Self {
            has_access: missing_prerequisites.is_empty(),
            missing_prerequisites,
        }
    }

    pub fn missing_ids(&self) -> Vec<&str> {
        self.missing_prerequisites
            .iter()
            .map(|p| p.id.as_str())
            .collect()
    }
}

/// Why an access decision could not be produced.
///
/// Distinct from a denied decision: callers must not render
/// `DependencyUnavailable` as "locked".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("could not determine access to {item_id}: {source}")]
    DependencyUnavailable {
        item_id: String,
        #[source]
        source: TrackerError,
    },
}

/// Borrowing view over registry, graph, and tracker.
pub struct AccessEvaluator<'a, R: ?Sized, C: ?Sized> {
    registry: &'a R,
    graph: &'a PrerequisiteGraph,
    tracker: &'a C,
}

impl<'a, R, C> AccessEvaluator<'a, R, C>
where
    R: ItemRegistry + ?Sized,
    C: CompletionTracker + ?Sized,
{
    pub fn new(registry: &'a R, graph: &'a PrerequisiteGraph, tracker: &'a C) -> Self {
        Self {
            registry,
            graph,
            tracker,
        }
    }

    /// Evaluate one-hop prerequisites of `item_id` for `learner_id`.
    ///
    /// Missing prerequisites come back in edge insertion order. A prerequisite
    /// the registry cannot resolve is always missing.
    pub fn check_access(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> Result<AccessDecision, AccessError> {
        if !self.registry.item_exists(item_id) {
            return Err(AccessError::ItemNotFound(item_id.to_string()));
        }

        let prerequisites = self.graph.list_prerequisites_of(item_id);
        if prerequisites.is_empty() {
            return Ok(AccessDecision::granted());
        }

        let mut missing = Vec::new();
        for prerequisite_id in prerequisites {
            let Ok(item) = self.registry.get_item(prerequisite_id) else {
                warn!(
                    item = %item_id,
                    prerequisite = %prerequisite_id,
                    "dangling prerequisite treated as missing"
                );
                missing.push(MissingPrerequisite {
                    id: prerequisite_id.clone(),
                    title: None,
                    kind: None,
                    dangling: true,
                });
                continue;
            };

            let completed = self
                .tracker
                .is_completed(learner_id, prerequisite_id)
                .map_err(|source| AccessError::DependencyUnavailable {
                    item_id: item_id.to_string(),
                    source,
                })?;
            if !completed {
                missing.push(MissingPrerequisite {
                    id: item.id.clone(),
                    title: Some(item.title.clone()),
                    kind: Some(item.kind),
                    dangling: false,
                });
            }
        }

        let decision = AccessDecision::from_missing(missing);
        trace!(
            learner = %learner_id,
            item = %item_id,
            has_access = decision.has_access,
            missing = decision.missing_prerequisites.len(),
            "access evaluated"
        );
        Ok(decision)
    }
}
