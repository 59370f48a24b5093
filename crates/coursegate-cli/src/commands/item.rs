use crate::cli::{ItemCommands, ItemKindArg};
use crate::support::{
    announce, fail, load_catalog_or_exit, mutate_or_exit, print_json, summary_line,
};
use coursegate_core::{Item, ItemKind, ItemSummary, RegistryError};
use serde_json::json;
use std::path::Path;

pub fn run(command: ItemCommands, catalog_path: &Path) {
    match command {
        ItemCommands::Add {
            id,
            title,
            kind,
            json,
        } => run_add(catalog_path, id, title, map_kind(kind), json),
        ItemCommands::Rename { id, title, json } => run_rename(catalog_path, id, title, json),
        ItemCommands::Delete { id, json } => run_delete(catalog_path, id, json),
        ItemCommands::List { json } => run_list(catalog_path, json),
    }
}

fn run_add(catalog_path: &Path, id: String, title: String, kind: ItemKind, json_output: bool) {
    if id.trim().is_empty() {
        fail("item id must not be empty");
    }
    let (item, replaced) = mutate_or_exit(catalog_path, "failed to add item", |catalog| {
        let replaced = catalog.upsert_item(Item::new(id.as_str(), title, kind)).is_some();
        let stored = catalog.get_item(&id)?.clone();
        Ok::<_, RegistryError>(((stored, replaced), true))
    });

    if json_output {
        print_json(&json!({
            "action": if replaced { "item.replace" } else { "item.add" },
            "catalogPath": catalog_path.display().to_string(),
            "item": item,
        }));
    } else {
        println!(
            "coursegate item add\n  {}: {} [{}] {}\n  Path: {}",
            if replaced { "Replaced" } else { "Added" },
            item.id,
            item.kind,
            item.title,
            catalog_path.display()
        );
    }
}

fn run_rename(catalog_path: &Path, id: String, title: String, json_output: bool) {
    let item = mutate_or_exit(catalog_path, "failed to rename item", |catalog| {
        let item = catalog.rename_item(&id, &title)?.clone();
        Ok::<_, RegistryError>((item, true))
    });

    if json_output {
        print_json(&json!({
            "action": "item.rename",
            "catalogPath": catalog_path.display().to_string(),
            "item": item,
        }));
    } else {
        println!(
            "coursegate item rename\n  Renamed: {} -> {}",
            item.id, item.title
        );
    }
}

fn run_delete(catalog_path: &Path, id: String, json_output: bool) {
    let deletion = mutate_or_exit(catalog_path, "failed to delete item", |catalog| {
        Ok::<_, RegistryError>((catalog.delete_item(&id)?, true))
    });
    announce(&deletion.invalidation);

    if json_output {
        print_json(&json!({
            "action": "item.delete",
            "catalogPath": catalog_path.display().to_string(),
            "item": deletion.item,
            "removedPrerequisites": deletion.removed_edges,
            "invalidation": deletion.invalidation,
        }));
    } else {
        println!(
            "coursegate item delete\n  Deleted: {} ({} prerequisite edges removed)\n  Invalidated: {}",
            deletion.item.id,
            deletion.removed_edges.len(),
            deletion.invalidation.affected.join(", ")
        );
    }
}

fn run_list(catalog_path: &Path, json_output: bool) {
    let catalog = load_catalog_or_exit(catalog_path);

    if json_output {
        let items: Vec<&Item> = catalog.items().collect();
        print_json(&json!({
            "action": "item.list",
            "catalogPath": catalog_path.display().to_string(),
            "count": items.len(),
            "items": items,
        }));
    } else {
        println!("coursegate item list ({} items)", catalog.registry().len());
        for item in catalog.items() {
            println!("  {}", summary_line(&ItemSummary::from(item)));
        }
    }
}

fn map_kind(arg: ItemKindArg) -> ItemKind {
    match arg {
        ItemKindArg::Course => ItemKind::Course,
        ItemKindArg::Lesson => ItemKind::Lesson,
    }
}
