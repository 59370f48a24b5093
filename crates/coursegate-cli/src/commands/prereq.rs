use crate::cli::PrereqCommands;
use crate::support::{
    announce, fail, load_catalog_or_exit, mutate_or_exit, print_json, summary_line,
};
use coursegate_core::{EdgeError, PrerequisiteEdge};
use serde_json::json;
use std::path::Path;

pub fn run(command: PrereqCommands, catalog_path: &Path) {
    match command {
        PrereqCommands::Add {
            from,
            to,
            created_by,
            json,
        } => run_add(catalog_path, from, to, created_by, json),
        PrereqCommands::Remove { from, to, json } => run_remove(catalog_path, from, to, json),
        PrereqCommands::List { id, json } => run_list(catalog_path, id, json),
        PrereqCommands::Dependents {
            id,
            transitive,
            json,
        } => run_dependents(catalog_path, id, transitive, json),
    }
}

fn run_add(catalog_path: &Path, from: String, to: String, created_by: String, json_output: bool) {
    let edge = PrerequisiteEdge::new(from, to).with_created_by(created_by);
    let event = mutate_or_exit(catalog_path, "failed to add prerequisite", |catalog| {
        Ok::<_, EdgeError>((catalog.add_prerequisite(edge.clone())?, true))
    });
    announce(&event);

    if json_output {
        print_json(&json!({
            "action": "prereq.add",
            "catalogPath": catalog_path.display().to_string(),
            "prerequisite": edge,
            "invalidation": event,
        }));
    } else {
        println!(
            "coursegate prereq add\n  Added: {} requires {}\n  Invalidated: {}\n  Path: {}",
            edge.from,
            edge.to,
            event.affected.join(", "),
            catalog_path.display()
        );
    }
}

fn run_remove(catalog_path: &Path, from: String, to: String, json_output: bool) {
    let event = mutate_or_exit(catalog_path, "failed to remove prerequisite", |catalog| {
        Ok::<_, EdgeError>((catalog.remove_prerequisite(&from, &to)?, true))
    });
    announce(&event);

    if json_output {
        print_json(&json!({
            "action": "prereq.remove",
            "catalogPath": catalog_path.display().to_string(),
            "from": from,
            "to": to,
            "invalidation": event,
        }));
    } else {
        println!(
            "coursegate prereq remove\n  Removed: {} requires {}\n  Invalidated: {}",
            from,
            to,
            event.affected.join(", ")
        );
    }
}

fn run_list(catalog_path: &Path, id: String, json_output: bool) {
    let catalog = load_catalog_or_exit(catalog_path);
    let prerequisites = catalog
        .list_prerequisites(&id)
        .unwrap_or_else(|e| fail(format!("failed to list prerequisites: {e}")));

    if json_output {
        print_json(&json!({
            "action": "prereq.list",
            "itemId": id,
            "count": prerequisites.len(),
            "prerequisites": prerequisites,
        }));
    } else {
        println!("coursegate prereq list {id} ({} prerequisites)", prerequisites.len());
        for summary in &prerequisites {
            println!("  {}", summary_line(summary));
        }
    }
}

fn run_dependents(catalog_path: &Path, id: String, transitive: bool, json_output: bool) {
    let catalog = load_catalog_or_exit(catalog_path);
    let dependents = catalog
        .list_dependents(&id, transitive)
        .unwrap_or_else(|e| fail(format!("failed to list dependents: {e}")));

    if json_output {
        print_json(&json!({
            "action": "prereq.dependents",
            "itemId": id,
            "transitive": transitive,
            "count": dependents.len(),
            "dependents": dependents,
        }));
    } else {
        println!(
            "coursegate prereq dependents {id}{} ({} items)",
            if transitive { " --transitive" } else { "" },
            dependents.len()
        );
        for summary in &dependents {
            println!("  {}", summary_line(summary));
        }
    }
}
