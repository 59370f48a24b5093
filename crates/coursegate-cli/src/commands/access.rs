use crate::cli::AccessCommands;
use crate::support::{EXIT_DENIED, EXIT_UNAVAILABLE, fail, load_catalog_or_exit, print_json};
use coursegate_core::{
    AccessEngine, AccessError, CompletionLog, CompletionTracker, TrackerError,
};
use serde_json::json;
use std::path::Path;
use tracing::warn;

/// Completion source backed by the JSONL log.
///
/// An unreadable log is not an immediate error: items without prerequisites
/// never consult the tracker, so they stay accessible.
enum CompletionSource {
    Loaded(CompletionLog),
    Unavailable(String),
}

impl CompletionSource {
    fn open(path: &Path) -> Self {
        match CompletionLog::load_jsonl(path) {
            Ok(log) => Self::Loaded(log),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "completion log unreadable");
                Self::Unavailable(format!("{}: {e}", path.display()))
            }
        }
    }
}

impl CompletionTracker for CompletionSource {
    fn is_completed(&self, learner_id: &str, item_id: &str) -> Result<bool, TrackerError> {
        match self {
            Self::Loaded(log) => log.is_completed(learner_id, item_id),
            Self::Unavailable(reason) => Err(TrackerError::Unavailable(reason.clone())),
        }
    }
}

pub fn run(command: AccessCommands, catalog_path: &Path, completions_path: &Path) {
    match command {
        AccessCommands::Check {
            learner_id,
            item_id,
            json,
        } => run_check(catalog_path, completions_path, learner_id, item_id, json),
    }
}

fn run_check(
    catalog_path: &Path,
    completions_path: &Path,
    learner_id: String,
    item_id: String,
    json_output: bool,
) {
    let catalog = load_catalog_or_exit(catalog_path);
    let engine = AccessEngine::new(catalog, CompletionSource::open(completions_path));

    let decision = match engine.check_access(&learner_id, &item_id) {
        Ok(decision) => decision,
        Err(err @ AccessError::DependencyUnavailable { .. }) => {
            eprintln!("error: {err}");
            std::process::exit(EXIT_UNAVAILABLE);
        }
        Err(err @ AccessError::ItemNotFound(_)) => fail(err),
    };

    if json_output {
        print_json(&json!({
            "action": "access.check",
            "learnerId": learner_id,
            "itemId": item_id,
            "hasAccess": decision.has_access,
            "missingPrerequisites": decision.missing_prerequisites,
        }));
    } else if decision.has_access {
        println!("coursegate access check\n  Granted: {learner_id} -> {item_id}");
    } else {
        println!("coursegate access check\n  Denied: {learner_id} -> {item_id}\n  Missing:");
        for missing in &decision.missing_prerequisites {
            match (&missing.title, missing.dangling) {
                (_, true) => println!("    {} (no longer in catalog)", missing.id),
                (Some(title), false) => println!("    {} {}", missing.id, title),
                (None, false) => println!("    {}", missing.id),
            }
        }
    }

    if !decision.has_access {
        std::process::exit(EXIT_DENIED);
    }
}
