//! Typed in-memory entity store.
//!
//! One [`Store`] per entity kind (UE, cell, policy). Records carry their own
//! key; a record whose embedded key disagrees with the lookup key is an
//! integrity fault that fails the operation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tracing::error;

/// Kind of record held by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// UE record
    Ue,
    /// Cell record
    Cell,
    /// Policy record
    Policy,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Ue => write!(f, "UE"),
            EntityKind::Cell => write!(f, "cell"),
            EntityKind::Policy => write!(f, "policy"),
        }
    }
}

/// A record that knows its own key.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Record kind.
    const KIND: EntityKind;

    /// Key the record must be stored under.
    fn entity_key(&self) -> &str;
}

/// Data-integrity faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Empty key
    #[error("empty {kind} key")]
    EmptyKey {
        /// Record kind
        kind: EntityKind,
    },

    /// Record stored under a key other than its own
    #[error("{kind} record {found:?} does not match key {key:?}")]
    KeyMismatch {
        /// Record kind
        kind: EntityKind,
        /// Lookup key
        key: String,
        /// Key embedded in the record
        found: String,
    },
}

/// Stored record with its write revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    /// Key
    pub key: String,
    /// Record
    pub value: T,
    /// Number of writes to this key, starting at 1
    pub revision: u64,
}

/// Concurrency-safe store keyed by string, enumerated in key order.
pub struct Store<T> {
    entries: RwLock<BTreeMap<String, Entry<T>>>,
}

impl<T: Entity> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Store<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Looks up a record.
    pub fn get(&self, key: &str) -> Result<Option<Entry<T>>, StoreError> {
        check_key::<T>(key)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.value.entity_key() != key => {
                Err(fault(mismatch::<T>(key, entry.value.entity_key())))
            }
            Some(entry) => Ok(Some(entry.clone())),
            None => Ok(None),
        }
    }

    /// Looks up a record, dropping the revision.
    pub fn value(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.get(key)?.map(|entry| entry.value))
    }

    /// Writes a record and returns the previous one.
    pub fn put(&self, key: &str, value: T) -> Result<Option<T>, StoreError> {
        check_key::<T>(key)?;
        if value.entity_key() != key {
            return Err(fault(mismatch::<T>(key, value.entity_key())));
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let revision = entries.get(key).map_or(1, |entry| entry.revision + 1);
        let previous = entries.insert(
            key.to_string(),
            Entry {
                key: key.to_string(),
                value,
                revision,
            },
        );
        Ok(previous.map(|entry| entry.value))
    }

    /// Removes a record.
    pub fn delete(&self, key: &str) -> Option<T> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|entry| entry.value)
    }

    /// Snapshot of all entries in key order. Call again to restart.
    pub fn entries(&self) -> impl Iterator<Item = Entry<T>> {
        let snapshot: Vec<Entry<T>> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        snapshot.into_iter()
    }

    /// Snapshot of all keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Current revision of a key.
    pub fn revision(&self, key: &str) -> Option<u64> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|entry| entry.revision)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_key<T: Entity>(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(fault(StoreError::EmptyKey { kind: T::KIND }));
    }
    Ok(())
}

fn mismatch<T: Entity>(key: &str, found: &str) -> StoreError {
    StoreError::KeyMismatch {
        kind: T::KIND,
        key: key.to_string(),
        found: found.to_string(),
    }
}

fn fault(err: StoreError) -> StoreError {
    error!("Store integrity fault: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        value: u32,
    }

    impl Item {
        fn new(id: &str, value: u32) -> Self {
            Self {
                id: id.to_string(),
                value,
            }
        }
    }

    impl Entity for Item {
        const KIND: EntityKind = EntityKind::Cell;

        fn entity_key(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn test_put_get_delete() {
        let store = Store::new();
        assert_eq!(store.put("a", Item::new("a", 1)).unwrap(), None);
        assert_eq!(
            store.put("a", Item::new("a", 2)).unwrap(),
            Some(Item::new("a", 1))
        );

        let entry = store.get("a").unwrap().unwrap();
        assert_eq!(entry.value.value, 2);
        assert_eq!(entry.revision, 2);

        assert_eq!(store.delete("a"), Some(Item::new("a", 2)));
        assert_eq!(store.delete("a"), None);
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_empty_key_rejected() {
        let store: Store<Item> = Store::new();
        assert_eq!(
            store.get(""),
            Err(StoreError::EmptyKey {
                kind: EntityKind::Cell
            })
        );
        assert!(matches!(
            store.put("", Item::new("", 1)),
            Err(StoreError::EmptyKey { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_key_mismatch_rejected() {
        let store = Store::new();
        let err = store.put("a", Item::new("b", 1)).unwrap_err();
        assert!(matches!(err, StoreError::KeyMismatch { ref key, ref found, .. } if key == "a" && found == "b"));
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_entries_ordered_snapshot() {
        let store = Store::new();
        for id in ["c", "a", "b"] {
            store.put(id, Item::new(id, 0)).unwrap();
        }

        let snapshot = store.entries();
        store.put("d", Item::new("d", 0)).unwrap();
        let keys: Vec<_> = snapshot.map(|e| e.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        assert_eq!(store.entries().count(), 4);
        assert_eq!(store.keys(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_revision_counts_writes() {
        let store = Store::new();
        assert_eq!(store.revision("a"), None);
        store.put("a", Item::new("a", 0)).unwrap();
        store.put("a", Item::new("a", 0)).unwrap();
        store.put("a", Item::new("a", 0)).unwrap();
        assert_eq!(store.revision("a"), Some(3));
    }
}
