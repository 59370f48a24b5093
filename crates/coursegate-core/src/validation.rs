//! Whole-catalog checks over raw records.
//!
//! Mutations through `Catalog` can never produce these findings. They exist
//! for files edited by hand or exported by other tools, where the records
//! have not been through the mutation guard.

use crate::guard::find_cycle;
use crate::graph::PrerequisiteGraph;
use crate::jsonl::CatalogRecord;
use crate::registry::{ItemRegistry, MemoryRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

pub const CATALOG_CHECK_KIND: &str = "coursegate.catalog.check.v1";

pub const FAILURE_CLASS_SELF_REFERENCE: &str = "catalog.edge.self_reference";
pub const FAILURE_CLASS_DANGLING_EDGE: &str = "catalog.edge.dangling";
pub const FAILURE_CLASS_DUPLICATE_EDGE: &str = "catalog.edge.duplicate";
pub const FAILURE_CLASS_CYCLE: &str = "catalog.graph.cycle";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFinding {
    pub item_id: String,
    pub class: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub item_count: usize,
    pub edge_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCheckReport {
    pub check_kind: String,
    pub result: String,
    pub failure_classes: Vec<String>,
    pub errors: Vec<CatalogFinding>,
    pub summary: CatalogSummary,
}

impl CatalogCheckReport {
    pub fn accepted(&self) -> bool {
        self.result == "accepted"
    }
}

pub fn check_catalog(records: &[CatalogRecord]) -> CatalogCheckReport {
    let registry = MemoryRegistry::from_items(records.iter().filter_map(|record| match record {
        CatalogRecord::Item(item) => Some(item.clone()),
        CatalogRecord::Prerequisite(_) => None,
    }));
    let edges: Vec<_> = records
        .iter()
        .filter_map(|record| match record {
            CatalogRecord::Prerequisite(edge) => Some(edge.clone()),
            CatalogRecord::Item(_) => None,
        })
        .collect();

    let mut errors = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for edge in &edges {
        if edge.is_self_reference() {
            errors.push(CatalogFinding {
                item_id: edge.from.clone(),
                class: FAILURE_CLASS_SELF_REFERENCE.to_string(),
                message: format!("{edge} requires itself"),
            });
        }
        for endpoint in [&edge.from, &edge.to] {
            if !registry.item_exists(endpoint) {
                errors.push(CatalogFinding {
                    item_id: endpoint.clone(),
                    class: FAILURE_CLASS_DANGLING_EDGE.to_string(),
                    message: format!("{edge} references unregistered item {endpoint}"),
                });
            }
        }
        if !seen.insert((edge.from.as_str(), edge.to.as_str())) {
            errors.push(CatalogFinding {
                item_id: edge.from.clone(),
                class: FAILURE_CLASS_DUPLICATE_EDGE.to_string(),
                message: format!("{edge} is listed more than once"),
            });
        }
    }

    // Self references are already reported; keep them out of the cycle search.
    let graph = PrerequisiteGraph::from_edges_unchecked(
        edges.iter().filter(|edge| !edge.is_self_reference()).cloned(),
    );
    let nodes: Vec<&str> = graph.referenced_ids().into_iter().collect();
    if let Some(cycle) = find_cycle(nodes, &graph) {
        let mut path = cycle.join(" -> ");
        if let Some(first) = cycle.first() {
            path.push_str(" -> ");
            path.push_str(first);
        }
        errors.push(CatalogFinding {
            item_id: cycle.first().cloned().unwrap_or_default(),
            class: FAILURE_CLASS_CYCLE.to_string(),
            message: format!("prerequisite cycle: {path}"),
        });
    }

    let failure_classes: Vec<String> = errors
        .iter()
        .map(|finding| finding.class.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    CatalogCheckReport {
        check_kind: CATALOG_CHECK_KIND.to_string(),
        result: if errors.is_empty() {
            "accepted".to_string()
        } else {
            "rejected".to_string()
        },
        failure_classes,
        summary: CatalogSummary {
            item_count: registry.len(),
            edge_count: edges.len(),
            error_count: errors.len(),
        },
        errors,
    }
}
