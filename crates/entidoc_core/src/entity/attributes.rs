//! The property map backing a dynamic entity.

use std::collections::BTreeMap;
use std::ptr;

use parking_lot::RwLock;

use super::value::FieldValue;

/// A snapshot of an entity's properties, sorted by name.
pub type Fields = BTreeMap<String, FieldValue>;

/// Thread-safe property map. An absent key means "unset".
#[derive(Debug, Default)]
pub struct AttributeStore {
    values: RwLock<Fields>,
}

impl AttributeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `fields`.
    pub fn from_fields(fields: Fields) -> Self {
        Self {
            values: RwLock::new(fields),
        }
    }

    /// Returns a copy of the value under `name`.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.values.read().get(name).cloned()
    }

    /// Stores `value` under `name`, or removes the key when `value` is `None`.
    pub fn set(&self, name: &str, value: Option<FieldValue>) -> Option<FieldValue> {
        let mut values = self.values.write();
        match value {
            Some(v) => values.insert(name.to_string(), v),
            None => values.remove(name),
        }
    }

    /// Stores `value` only if `name` is unset.
    pub fn insert_if_absent(&self, name: &str, value: FieldValue) {
        self.values
            .write()
            .entry(name.to_string())
            .or_insert(value);
    }

    /// Whether `name` is set.
    pub fn contains(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    /// Number of set properties.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Copy of all properties.
    pub fn snapshot(&self) -> Fields {
        self.values.read().clone()
    }
}

impl Clone for AttributeStore {
    fn clone(&self) -> Self {
        Self::from_fields(self.snapshot())
    }
}

impl PartialEq for AttributeStore {
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        *self.values.read() == *other.values.read()
    }
}
