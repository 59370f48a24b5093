use coursegate_core::{
    AtomicCatalogMutationError, Catalog, InvalidationEvent, InvalidationListener, ItemSummary,
    LoggingListener, mutate_catalog_jsonl,
};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

pub const EXIT_ERROR: i32 = 1;
pub const EXIT_DENIED: i32 = 2;
pub const EXIT_UNAVAILABLE: i32 = 3;

pub fn fail(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_ERROR);
}

/// Load an existing catalog. Read-only commands never create one.
pub fn load_catalog_or_exit(path: &Path) -> Catalog {
    if !path.exists() {
        fail(format!(
            "catalog not found: {} (run `coursegate init`)",
            path.display()
        ));
    }
    Catalog::load_jsonl(path)
        .unwrap_or_else(|e| fail(format!("failed to load {}: {e}", path.display())))
}

/// Run one lock-scoped mutation, exiting on any failure.
pub fn mutate_or_exit<T, E, F>(path: &Path, context: &str, mutator: F) -> T
where
    E: Display,
    F: FnOnce(&mut Catalog) -> Result<(T, bool), E>,
{
    mutate_catalog_jsonl(path, mutator).unwrap_or_else(|e| match e {
        AtomicCatalogMutationError::Mutation(err) => fail(format!("{context}: {err}")),
        other => fail(format!("{}: {other}", path.display())),
    })
}

/// Announce a committed mutation to the log.
pub fn announce(event: &InvalidationEvent) {
    LoggingListener.on_invalidate(event);
}

pub fn print_json<T: Serialize>(payload: &T) {
    let text = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|e| fail(format!("json serialization: {e}")));
    println!("{text}");
}

pub fn summary_line(summary: &ItemSummary) -> String {
    match (&summary.title, &summary.kind) {
        (Some(title), Some(kind)) => format!("{} [{}] {}", summary.id, kind, title),
        (Some(title), None) => format!("{} {}", summary.id, title),
        _ => format!("{} (unresolved)", summary.id),
    }
}
