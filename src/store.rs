//! Shared, lock-guarded thingamabob collection.
//! Reads take the shared lock, mutations take the exclusive lock, and id
//! allocation happens inside the write critical section so concurrent creates
//! can never share an id. Ids are monotonic and never reused after deletion.
//! The lock is sync and held only for map operations, never across awaits.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thingamabob {
    pub id: u64,
    pub name: String,
}

#[derive(Debug)]
struct Inner {
    items: BTreeMap<u64, String>,
    next_id: u64,
}

/// Handle to the shared collection; cheap to clone into handlers.
#[derive(Debug, Clone)]
pub struct ThingamabobStore(Arc<RwLock<Inner>>);

impl ThingamabobStore {
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(Inner {
            items: BTreeMap::new(),
            next_id: 1,
        })))
    }

    /// All thingamabobs, ascending by id.
    pub fn list(&self) -> Vec<Thingamabob> {
        let guard = self.0.read();
        guard
            .items
            .iter()
            .map(|(&id, name)| Thingamabob {
                id,
                name: name.clone(),
            })
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<Thingamabob> {
        let guard = self.0.read();
        guard.items.get(&id).map(|name| Thingamabob {
            id,
            name: name.clone(),
        })
    }

    pub fn create(&self, name: impl Into<String>) -> Thingamabob {
        let name = name.into();
        let mut guard = self.0.write();
        let id = guard.next_id;
        guard.next_id += 1;
        guard.items.insert(id, name.clone());
        Thingamabob { id, name }
    }

    /// Replace the name in place; the id is immutable.
    pub fn update(&self, id: u64, name: impl Into<String>) -> Option<Thingamabob> {
        let name = name.into();
        let mut guard = self.0.write();
        let slot = guard.items.get_mut(&id)?;
        *slot = name.clone();
        Some(Thingamabob { id, name })
    }

    pub fn delete(&self, id: u64) -> bool {
        self.0.write().items.remove(&id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().items.is_empty()
    }
}

impl Default for ThingamabobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crud_roundtrip() {
        let store = ThingamabobStore::new();
        let created = store.create("Widget");
        assert_eq!(created.id, 1);
        assert_eq!(store.get(created.id), Some(created.clone()));

        let updated = store.update(created.id, "Gadget").unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(store.get(created.id).unwrap().name, "Gadget");

        assert!(store.delete(created.id));
        assert_eq!(store.get(created.id), None);
        assert!(!store.delete(created.id));
        assert!(store.update(created.id, "Ghost").is_none());
    }

    #[test]
    fn list_is_sorted_ascending_regardless_of_mutation_order() {
        let store = ThingamabobStore::new();
        for name in ["a", "b", "c", "d"] {
            store.create(name);
        }
        assert!(store.delete(2));
        store.create("e");

        let ids: Vec<u64> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 5]);
    }

    #[test]
    fn ids_are_never_reused_after_deletion() {
        let store = ThingamabobStore::new();
        let first = store.create("a");
        assert!(store.delete(first.id));
        let second = store.create("b");
        assert!(second.id > first.id);
    }

    #[test]
    fn concurrent_creates_allocate_distinct_ids() {
        let store = ThingamabobStore::new();
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.create(format!("bob-{i}")).id)
            })
            .collect();

        let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        // 100 distinct ids, no duplicates and no gaps.
        assert_eq!(ids, (1..=100).collect::<Vec<u64>>());
    }
}
