use crate::cli::CompletionCommands;
use crate::support::{fail, load_catalog_or_exit, print_json};
use coursegate_core::{CompletionLog, CompletionRecord};
use serde_json::json;
use std::path::Path;

pub fn run(command: CompletionCommands, catalog_path: &Path, completions_path: &Path) {
    match command {
        CompletionCommands::Add {
            learner_id,
            item_id,
            json,
        } => run_add(catalog_path, completions_path, learner_id, item_id, json),
        CompletionCommands::List { learner_id, json } => {
            run_list(completions_path, learner_id, json)
        }
    }
}

fn run_add(
    catalog_path: &Path,
    completions_path: &Path,
    learner_id: String,
    item_id: String,
    json_output: bool,
) {
    if learner_id.trim().is_empty() {
        fail("learner id must not be empty");
    }
    let catalog = load_catalog_or_exit(catalog_path);
    if let Err(e) = catalog.get_item(&item_id) {
        fail(format!("failed to record completion: {e}"));
    }

    let record = CompletionRecord::now(learner_id, item_id);
    let recorded = CompletionLog::record_jsonl(completions_path, &record).unwrap_or_else(|e| {
        fail(format!(
            "failed to record completion in {}: {e}",
            completions_path.display()
        ))
    });

    if json_output {
        print_json(&json!({
            "action": "completion.add",
            "completionsPath": completions_path.display().to_string(),
            "recorded": recorded,
            "completion": record,
        }));
    } else if !recorded {
        println!(
            "coursegate completion add\n  Already completed: {} {}",
            record.learner_id, record.item_id
        );
    } else {
        println!(
            "coursegate completion add\n  Recorded: {} completed {}",
            record.learner_id, record.item_id
        );
    }
}

fn run_list(completions_path: &Path, learner_id: String, json_output: bool) {
    let log = load_log_or_exit(completions_path);
    let records = log.records_for(&learner_id);

    if json_output {
        print_json(&json!({
            "action": "completion.list",
            "learnerId": learner_id,
            "count": records.len(),
            "completions": records,
        }));
    } else {
        println!(
            "coursegate completion list {learner_id} ({} items)",
            records.len()
        );
        for record in records {
            println!("  {} at {}", record.item_id, record.completed_at.to_rfc3339());
        }
    }
}

fn load_log_or_exit(path: &Path) -> CompletionLog {
    CompletionLog::load_jsonl(path)
        .unwrap_or_else(|e| fail(format!("failed to load {}: {e}", path.display())))
}
