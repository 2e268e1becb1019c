//! Append-only ordered map used for namespace and library grouping.

use std::fmt::Display;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::{Error, ErrorCode, Errorer};

/// Ordered mapping that refuses to silently overwrite a key.
///
/// `set` is for first insertion only; `update` is the sanctioned way to change
/// an existing value. Iteration follows insertion order.
#[derive(Clone, Debug)]
pub struct GracefulMap<K, V> {
    name: String,
    entries: IndexMap<K, V>,
}

impl<K, V> GracefulMap<K, V>
where
    K: Hash + Eq + Display,
{
    /// Create an empty map; `name` only appears in error context.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a new key, failing with `KeyExistsInMap` if it is already present.
    pub fn set(&mut self, key: K, value: V) -> Result<(), Error> {
        if self.entries.contains_key(&key) {
            return Errorer::select(ErrorCode::KeyExistsInMap)
                .with_context(format!(
                    "cannot set '{key}' because it already exists in '{}'",
                    self.name
                ))
                .fail();
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Replace the value under `key` with `updater(current)`, using `default`
    /// as the current value when the key is absent. Existing keys keep their
    /// position.
    pub fn update<F>(&mut self, key: K, updater: F, default: V)
    where
        F: FnOnce(V) -> V,
    {
        match self.entries.get_mut(&key) {
            Some(slot) => {
                let current = std::mem::replace(slot, default);
                *slot = updater(current);
            }
            None => {
                let value = updater(default);
                self.entries.insert(key, value);
            }
        }
    }

    /// Drop a key entirely, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
