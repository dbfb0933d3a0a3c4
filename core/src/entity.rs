//! Normalized entity storage
//!
//! An [`EntityStore`] keeps records keyed by id together with the order in
//! which they were first inserted. Reducers use it the way a database table
//! is used: replace a record by id, replace the whole table after a full
//! reload, iterate in a stable order for display.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A record with a stable identity
pub trait Entity {
    /// Identifier type
    type Id: Clone + Eq + Hash + Ord + Debug;

    /// The record's identifier
    fn id(&self) -> Self::Id;
}

/// Id-keyed collection with stable iteration order
///
/// `ids` never contains duplicates and always matches the key set of
/// `entities`.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityStore<T: Entity> {
    ids: Vec<T::Id>,
    entities: HashMap<T::Id, T>,
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityStore<T> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
        }
    }

    /// Insert or replace a record
    ///
    /// A replaced record keeps its position; a new id is appended.
    pub fn upsert_one(&mut self, entity: T) {
        let id = entity.id();
        if self.entities.insert(id.clone(), entity).is_none() {
            self.ids.push(id);
        }
    }

    /// Insert or replace every record in order
    pub fn upsert_many(&mut self, entities: impl IntoIterator<Item = T>) {
        for entity in entities {
            self.upsert_one(entity);
        }
    }

    /// Remove every record
    pub fn remove_all(&mut self) {
        self.ids.clear();
        self.entities.clear();
    }

    /// Replace the whole collection
    ///
    /// Records missing from `entities` disappear.
    pub fn set_all(&mut self, entities: impl IntoIterator<Item = T>) {
        self.remove_all();
        self.upsert_many(entities);
    }

    /// Look up a record by id
    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.entities.get(id)
    }

    /// Whether a record with this id is stored
    #[must_use]
    pub fn contains(&self, id: &T::Id) -> bool {
        self.entities.contains_key(id)
    }

    /// Ids in iteration order
    #[must_use]
    pub fn ids(&self) -> &[T::Id] {
        &self.ids
    }

    /// Records in iteration order
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T: Entity> FromIterator<T> for EntityStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut store = Self::new();
        store.upsert_many(iter);
        store
    }
}

// Serialized as a plain list in iteration order
impl<T: Entity + Serialize> Serialize for EntityStore<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for entity in self.iter() {
            seq.serialize_element(entity)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u32,
        label: String,
    }

    impl Entity for Row {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn row(id: u32, label: &str) -> Row {
        Row {
            id,
            label: label.to_string(),
        }
    }

    #[test]
    fn upsert_keeps_position() {
        let mut store: EntityStore<Row> = [row(3, "a"), row(1, "b"), row(2, "c")].into_iter().collect();

        store.upsert_one(row(1, "updated"));

        assert_eq!(store.ids(), &[3, 1, 2]);
        assert_eq!(store.get(&1).map(|r| r.label.as_str()), Some("updated"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn upsert_appends_unknown_ids() {
        let mut store = EntityStore::new();
        store.upsert_one(row(5, "x"));
        store.upsert_one(row(0, "y"));

        let labels: Vec<_> = store.iter().map(|r| r.label.clone()).collect();
        assert_eq!(labels, vec!["x", "y"]);
        assert!(store.contains(&0));
        assert!(!store.contains(&1));
    }

    #[test]
    fn set_all_drops_missing_records() {
        let mut store: EntityStore<Row> = [row(1, "a"), row(2, "b")].into_iter().collect();

        store.set_all(vec![row(2, "b2"), row(4, "d")]);

        assert_eq!(store.ids(), &[2, 4]);
        assert!(store.get(&1).is_none());
    }

    #[test]
    fn remove_all_empties_store() {
        let mut store: EntityStore<Row> = [row(1, "a")].into_iter().collect();
        store.remove_all();
        assert!(store.is_empty());
        assert_eq!(store.iter().count(), 0);
    }

    proptest! {
        #[test]
        fn ids_match_key_set(ops in prop::collection::vec((0u32..20, any::<bool>()), 0..60)) {
            let mut store = EntityStore::new();
            for (id, reset) in ops {
                if reset && id % 7 == 0 {
                    store.set_all(vec![row(id, "reset")]);
                } else {
                    store.upsert_one(row(id, "v"));
                }
            }

            let unique: BTreeSet<u32> = store.ids().iter().copied().collect();
            prop_assert_eq!(unique.len(), store.ids().len());
            prop_assert_eq!(store.iter().count(), store.len());
            for id in store.ids() {
                prop_assert!(store.contains(id));
            }
        }
    }
}
