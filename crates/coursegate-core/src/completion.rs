//! Completion tracking: the external source of truth for "learner finished item".
//!
//! The evaluator only reads completions through `CompletionTracker`. The
//! bundled `CompletionLog` is an append-style JSONL adapter for hosts (and the
//! CLI) that do not run a separate progress service.

use crate::atomic_store::{FileLockGuard, LockError, lock_path_for};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Failure to reach or read the completion source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("completion tracker unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of learner progress.
pub trait CompletionTracker {
    fn is_completed(&self, learner_id: &str, item_id: &str) -> Result<bool, TrackerError>;
}

impl<T: CompletionTracker + ?Sized> CompletionTracker for &T {
    fn is_completed(&self, learner_id: &str, item_id: &str) -> Result<bool, TrackerError> {
        (**self).is_completed(learner_id, item_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub learner_id: String,
    pub item_id: String,
    #[serde(default = "default_timestamp")]
    pub completed_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl CompletionRecord {
    pub fn now(learner_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            item_id: item_id.into(),
            completed_at: Utc::now(),
        }
    }
}

/// Errors from completion-log persistence.
#[derive(Debug, thiserror::Error)]
pub enum CompletionLogError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// In-memory completion records keyed by learner.
///
/// The first completion of an item wins; repeated records keep the earliest
/// `completed_at`.
#[derive(Debug, Clone, Default)]
pub struct CompletionLog {
    by_learner: BTreeMap<String, BTreeMap<String, CompletionRecord>>,
}

impl CompletionLog {
    pub fn from_records(records: impl IntoIterator<Item = CompletionRecord>) -> Self {
        let mut log = Self::default();
        for record in records {
            log.record(record);
        }
        log
    }

    /// Load records from a JSONL file. A missing file is an empty log.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, CompletionLogError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = fs::File::open(path)
            .map_err(|e| CompletionLogError::Io(0, format!("{}: {e}", path.display())))?;
        Ok(Self::from_records(read_completions(BufReader::new(file))?))
    }

    /// Append one record to a JSONL file, creating it if needed.
    pub fn append_jsonl(
        path: impl AsRef<Path>,
        record: &CompletionRecord,
    ) -> Result<(), CompletionLogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| CompletionLogError::Io(0, format!("{}: {e}", parent.display())))?;
        }
        let line = serde_json::to_string(record)
            .map_err(|e| CompletionLogError::Serialize(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CompletionLogError::Io(0, format!("{}: {e}", path.display())))?;
        writeln!(file, "{line}")
            .map_err(|e| CompletionLogError::Io(0, format!("{}: {e}", path.display())))
    }

    /// Append `record` unless the learner already completed that item.
    ///
    /// Runs under `<path>.lock`, so concurrent writers cannot both append the
    /// same completion. Returns `true` if a line was written.
    pub fn record_jsonl(
        path: impl AsRef<Path>,
        record: &CompletionRecord,
    ) -> Result<bool, CompletionLogError> {
        let path = path.as_ref();
        let _guard = FileLockGuard::acquire(lock_path_for(path))?;

        let log = Self::load_jsonl(path)?;
        if log.completed_items(&record.learner_id).contains(record.item_id.as_str()) {
            return Ok(false);
        }
        Self::append_jsonl(path, record)?;
        Ok(true)
    }

    /// Record a completion. Returns `false` if the learner already had it.
    pub fn record(&mut self, record: CompletionRecord) -> bool {
        let items = self.by_learner.entry(record.learner_id.clone()).or_default();
        match items.get_mut(&record.item_id) {
            Some(existing) => {
                if record.completed_at < existing.completed_at {
                    existing.completed_at = record.completed_at;
                }
                false
            }
            None => {
                items.insert(record.item_id.clone(), record);
                true
            }
        }
    }

    /// Completed item IDs for one learner, ascending.
    pub fn completed_items(&self, learner_id: &str) -> BTreeSet<&str> {
        self.by_learner
            .get(learner_id)
            .map(|items| items.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All records for one learner, ordered by item ID.
    pub fn records_for(&self, learner_id: &str) -> Vec<&CompletionRecord> {
        self.by_learner
            .get(learner_id)
            .map(|items| items.values().collect())
            .unwrap_or_default()
    }
}

impl CompletionTracker for CompletionLog {
    fn is_completed(&self, learner_id: &str, item_id: &str) -> Result<bool, TrackerError> {
        Ok(self
            .by_learner
            .get(learner_id)
            .is_some_and(|items| items.contains_key(item_id)))
    }
}

pub fn read_completions(reader: impl BufRead) -> Result<Vec<CompletionRecord>, CompletionLogError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CompletionLogError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: CompletionRecord = serde_json::from_str(trimmed)
            .map_err(|e| CompletionLogError::Parse(line_no + 1, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}
