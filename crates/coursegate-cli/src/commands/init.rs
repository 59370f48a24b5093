use crate::support::{mutate_or_exit, print_json};
use serde_json::json;
use std::convert::Infallible;
use std::path::Path;

pub fn run(catalog_path: &Path, json_output: bool) {
    let existed = catalog_path.exists();
    let (items, edges) = mutate_or_exit(catalog_path, "init", |catalog| {
        let counts = (catalog.registry().len(), catalog.graph().edge_count());
        Ok::<_, Infallible>((counts, !existed))
    });

    if json_output {
        print_json(&json!({
            "action": "init",
            "catalogPath": catalog_path.display().to_string(),
            "created": !existed,
            "itemCount": items,
            "edgeCount": edges,
        }));
    } else if existed {
        println!(
            "coursegate init\n  Existing catalog: {} ({} items, {} prerequisites)",
            catalog_path.display(),
            items,
            edges
        );
    } else {
        println!(
            "coursegate init\n  Created: {}",
            catalog_path.display()
        );
    }
}
