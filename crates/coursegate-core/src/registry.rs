//! Item registry: read-mostly reference data for courses and lessons.
//!
//! The authoring service owns item CRUD. The engine only needs lookups, so
//! the seam is the `ItemRegistry` trait; `MemoryRegistry` is the canonical
//! in-memory implementation used by the engine and the JSONL catalog.

use crate::item::Item;
use std::collections::BTreeMap;

/// Errors raised by registry lookups and mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("item not found: {0}")]
    ItemNotFound(String),
}

/// Lookup surface the graph store and evaluator consume.
pub trait ItemRegistry {
    fn get_item(&self, id: &str) -> Result<&Item, RegistryError>;

    fn item_exists(&self, id: &str) -> bool {
        self.get_item(id).is_ok()
    }
}

/// Deterministic in-memory registry keyed by item ID.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    items: BTreeMap<String, Item>,
}

impl MemoryRegistry {
    /// Build a registry from items.
    ///
    /// Duplicate IDs resolve with last-write-wins, matching append/overlay
    /// behavior of JSONL catalogs.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut index = BTreeMap::new();
        for item in items {
            index.insert(item.id.clone(), item);
        }
        Self { items: index }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert or replace an item by ID. Returns the previous value if present.
    pub fn upsert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.id.clone(), item)
    }

    /// Update the title of an existing item.
    pub fn rename(&mut self, id: &str, title: impl Into<String>) -> Result<&Item, RegistryError> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| RegistryError::ItemNotFound(id.to_string()))?;
        item.set_title(title);
        Ok(item)
    }

    /// Remove an item. Edge cascade is the graph store's job.
    pub fn remove(&mut self, id: &str) -> Result<Item, RegistryError> {
        self.items
            .remove(id)
            .ok_or_else(|| RegistryError::ItemNotFound(id.to_string()))
    }

    /// Iterate items in deterministic ID order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }
}

impl ItemRegistry for MemoryRegistry {
    fn get_item(&self, id: &str) -> Result<&Item, RegistryError> {
        self.items
            .get(id)
            .ok_or_else(|| RegistryError::ItemNotFound(id.to_string()))
    }

    fn item_exists(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }
}
