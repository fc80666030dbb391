use std::hash::Hash;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A set of distinct values that remembers the order in which each value was
/// first seen. Iteration order is therefore stable for a given input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueValues<T: Hash + Eq>(IndexSet<T>);

impl<T: Hash + Eq> UniqueValues<T> {
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    /// Insert a value, returning false if it was already present.
    /// A repeated value keeps its original position.
    pub fn insert(&mut self, value: T) -> bool {
        self.0.insert(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl UniqueValues<&str> {
    /// Detach the set from the payload it borrows from.
    pub fn to_owned_values(&self) -> UniqueValues<String> {
        self.iter().map(|value| value.to_string()).collect()
    }
}

impl<T: Hash + Eq> Default for UniqueValues<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> FromIterator<T> for UniqueValues<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Hash + Eq> IntoIterator for UniqueValues<T> {
    type Item = T;
    type IntoIter = indexmap::set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
