//! Generic thread-safe registry pattern, shared by the notifier registry and
//! the task-handler-factory registry.

use std::sync::Arc;

use dashmap::DashMap;

/// Trait for items that can be stored in a [`BaseRegistry`].
pub trait Registerable: Send + Sync {
    fn registry_id(&self) -> &str;
}

/// Generic registry for managing items by string ID.
pub struct BaseRegistry<T: ?Sized + Registerable> {
    items: DashMap<String, Arc<T>>,
}

impl<T: ?Sized + Registerable> BaseRegistry<T> {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    /// Register an item, overwriting any prior entry with the same ID.
    ///
    /// Unlike an extension registry that rejects duplicates,
    /// notifier and handler-factory registries are built once from config
    /// at startup where the config loader already rejects duplicate IDs
    /// so last-write-wins here simply keeps registration simple.
    pub fn register(&self, item: Arc<T>) {
        let id = item.registry_id().to_string();
        self.items.insert(id, item);
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).map(|item| item.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.registry_id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.items.iter().map(|entry| entry.value().clone())
    }
}

impl<T: ?Sized + Registerable> Default for BaseRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
