use core::hash::{BuildHasher, Hash};

use crate::error::Result;
use crate::table::Table;

/// High level keyed store
///
/// Lookups that miss return [`Error::KeyNotFound`](crate::Error::KeyNotFound)
/// rather than a default value.
pub trait HashTable<K, V> {
    /// Returns `true` if `key` was not present before.
    fn put(&mut self, key: K, value: V) -> bool;
    fn get(&self, key: &K) -> Result<&V>;
    fn remove(&mut self, key: &K) -> Result<V>;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, S, const N: usize, const B: usize> HashTable<K, V> for Table<K, V, S, N, B>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn put(&mut self, key: K, value: V) -> bool {
        Table::put(self, key, value)
    }

    fn get(&self, key: &K) -> Result<&V> {
        Table::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Result<V> {
        Table::remove(self, key)
    }

    fn clear(&mut self) {
        Table::clear(self)
    }

    fn len(&self) -> usize {
        Table::len(self)
    }

    fn is_empty(&self) -> bool {
        Table::is_empty(self)
    }
}
