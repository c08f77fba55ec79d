//! Insertion-ordered record storage, one per entity kind.

use chakra_core::id::EntityId;
use chakra_core::model::Entity;
use std::collections::HashMap;

/// Records of one kind keyed by id. Iteration follows insertion order;
/// re-inserting an existing id replaces the record in place.
#[derive(Debug, Clone)]
pub struct Repository<T: Entity> {
    records: HashMap<EntityId, T>,
    order: Vec<EntityId>,
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous record for this id, if any.
    pub fn insert(&mut self, record: T) -> Option<T> {
        let id = record.id();
        let previous = self.records.insert(id, record);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let removed = self.records.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(removed)
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.records.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Ids of the records matching `pred`, in insertion order.
    pub fn ids_where(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<EntityId> {
        self.iter().filter(|r| pred(*r)).map(T::id).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }
}
