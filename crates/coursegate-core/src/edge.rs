//! Prerequisite edges: typed "requires" relationships between items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `from` requires completion of `to` before access is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteEdge {
    /// JSONL compatibility: authoring exports use `item_id`.
    #[serde(alias = "item_id")]
    pub from: String,
    /// JSONL compatibility: authoring exports use `prerequisite_id`.
    #[serde(alias = "prerequisite_id")]
    pub to: String,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl PrerequisiteEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            created_at: Utc::now(),
            created_by: String::new(),
        }
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn is_self_reference(&self) -> bool {
        self.from == self.to
    }

    /// Whether this edge connects the ordered pair `(from, to)`.
    pub fn connects(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }
}

impl fmt::Display for PrerequisiteEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Errors raised by edge mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeError {
    #[error("item cannot require itself: {0}")]
    SelfReferenceRejected(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("prerequisite already exists: {from} -> {to}")]
    EdgeAlreadyExists { from: String, to: String },

    #[error("prerequisite not found: {from} -> {to}")]
    EdgeNotFound { from: String, to: String },

    #[error("prerequisite {from} -> {to} would create a cycle")]
    CycleRejected { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_accepts_authoring_field_aliases() {
        let raw = r#"{"item_id":"course-b","prerequisite_id":"course-a","created_by":"instructor-7"}"#;
        let edge: PrerequisiteEdge = serde_json::from_str(raw).expect("edge should parse");
        assert!(edge.connects("course-b", "course-a"));
        assert_eq!(edge.created_by, "instructor-7");
    }

    #[test]
    fn display_reads_as_requires_arrow() {
        let edge = PrerequisiteEdge::new("lesson-2", "lesson-1");
        assert_eq!(edge.to_string(), "lesson-2 -> lesson-1");
        assert!(!edge.is_self_reference());
        assert!(PrerequisiteEdge::new("x", "x").is_self_reference());
    }
}
