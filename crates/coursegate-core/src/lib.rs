//! # coursegate-core
//!
//! Prerequisite-gated access control for courses and lessons.
//!
//! This crate provides:
//! - `Item` and `PrerequisiteEdge` types
//! - `PrerequisiteGraph` (edge store with forward and reverse indices)
//! - the mutation guard that keeps the graph acyclic
//! - `AccessEvaluator` (one-hop access decisions against a `CompletionTracker`)
//! - `AccessEngine` (lock discipline plus invalidation events)
//! - JSONL persistence with lock-scoped atomic mutation
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk: item and prerequisite records)
//!     <-> load / save
//! Catalog (registry + graph, deterministic)
//!     <-> RwLock
//! AccessEngine --check_access--> CompletionTracker (external)
//! ```

pub mod access;
pub mod atomic_store;
pub mod catalog;
pub mod completion;
pub mod edge;
pub mod engine;
pub mod events;
pub mod graph;
pub mod guard;
pub mod item;
pub mod jsonl;
pub mod registry;
pub mod validation;

pub use access::{AccessDecision, AccessError, AccessEvaluator, MissingPrerequisite};
pub use atomic_store::{
    AtomicCatalogMutationError, LockError, catalog_lock_path, mutate_catalog_jsonl,
};
pub use catalog::{Catalog, CatalogError, ItemDeletion};
pub use completion::{
    CompletionLog, CompletionLogError, CompletionRecord, CompletionTracker, TrackerError,
    read_completions,
};
pub use edge::{EdgeError, PrerequisiteEdge};
pub use engine::AccessEngine;
pub use events::{
    InvalidationBus, InvalidationCause, InvalidationEvent, InvalidationListener, Listeners,
    LoggingListener,
};
pub use graph::PrerequisiteGraph;
pub use guard::{EdgeSource, ensure_acyclic_insert, find_cycle, would_create_cycle};
pub use item::{Item, ItemKind, ItemSummary};
pub use jsonl::{CatalogRecord, JsonlError, read_catalog_from_path, write_catalog_to_path};
pub use registry::{ItemRegistry, MemoryRegistry, RegistryError};
pub use validation::{
    CATALOG_CHECK_KIND, CatalogCheckReport, CatalogFinding, CatalogSummary,
    FAILURE_CLASS_CYCLE, FAILURE_CLASS_DANGLING_EDGE, FAILURE_CLASS_DUPLICATE_EDGE,
    FAILURE_CLASS_SELF_REFERENCE, check_catalog,
};
