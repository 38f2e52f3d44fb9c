use alloc::{boxed::Box, vec::Vec};
use core::{
    fmt::{self, Debug, Formatter},
    hash::{BuildHasher, Hash},
    iter::FusedIterator,
    slice,
};

use crate::bucket::{self, Bucket};
use crate::error::Result;
use crate::hash::{digest, slot_index, FnvBuildHasher};

/// Default number of slots in a [`Table`].
pub const DEFAULT_SLOTS: usize = 16;
/// Default number of entries per bucket node in a [`Table`].
pub const DEFAULT_BUCKET_CAPACITY: usize = 8;

/// A fixed-size hash table of bucket chains.
///
/// The table owns `N` slots, each holding a root [`Bucket`] of capacity `B`.
/// A key's slot is `digest % N`. Slots never grow or rehash; a crowded slot
/// grows its overflow chain instead. `N` and `B` are independent:
/// `N` spreads keys across slots, `B` sets how many entries one node scans
/// before following its overflow link.
pub struct Table<
    K,
    V,
    S = FnvBuildHasher,
    const N: usize = DEFAULT_SLOTS,
    const B: usize = DEFAULT_BUCKET_CAPACITY,
> {
    slots: Box<[Bucket<K, V, B>]>,
    len: usize,
    hash_builder: S,
}

impl<K, V, S: Default, const N: usize, const B: usize> Table<K, V, S, N, B> {
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S, const N: usize, const B: usize> Default for Table<K, V, S, N, B>
where
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, const N: usize, const B: usize> Table<K, V, S, N, B> {
    /// Creates an empty table that hashes keys with `hash_builder`.
    ///
    /// All `N` slots are allocated here, once.
    pub fn with_hasher(hash_builder: S) -> Self {
        const {
            assert!(N > 0, "a table needs at least one slot");
            assert!(B > 0, "a bucket needs room for at least one entry");
        }
        Self {
            slots: (0..N).map(|_| Bucket::new()).collect(),
            len: 0,
            hash_builder,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    pub const fn slot_count(&self) -> usize {
        N
    }

    pub const fn bucket_capacity(&self) -> usize {
        B
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        let empty = self.slots.iter().all(Bucket::is_empty);
        debug_assert_eq!(empty, self.len == 0);
        empty
    }

    /// Root bucket of slot `index`, for inspecting its chain.
    pub fn slot(&self, index: usize) -> Option<&Bucket<K, V, B>> {
        self.slots.get(index)
    }

    /// Removes every entry and drops all overflow buckets.
    pub fn clear(&mut self) {
        log::debug!("clearing table: {} entries dropped", self.len);
        self.slots.iter_mut().for_each(Bucket::clear);
        self.len = 0;
    }

    /// Entries in slot order, then chain order within a slot.
    ///
    /// The order has nothing to do with insertion order.
    pub fn iter(&self) -> Iter<'_, K, V, B> {
        Iter {
            slots: self.slots.iter(),
            current: None,
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }
}

impl<K, V: Clone, S, const N: usize, const B: usize> Table<K, V, S, N, B> {
    /// Values in [`iter`](Self::iter) order.
    pub fn to_vec(&self) -> Vec<V> {
        let mut values = Vec::with_capacity(self.len);
        for bucket in self.slots.iter() {
            values.extend(bucket.iter().map(|(_, value)| value.clone()));
        }
        values
    }
}

impl<K, V, S, const N: usize, const B: usize> Table<K, V, S, N, B>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Slot that `key` routes to.
    pub fn slot_of(&self, key: &K) -> usize {
        slot_index(digest(&self.hash_builder, key), N)
    }

    fn locate(&self, key: &K) -> (usize, u64) {
        let hash = digest(&self.hash_builder, key);
        (slot_index(hash, N), hash)
    }

    /// Inserts `value` under `key`, replacing any previous value.
    ///
    /// Returns `true` if the key was not present before.
    pub fn put(&mut self, key: K, value: V) -> bool {
        let (index, hash) = self.locate(&key);
        let inserted = self.slots[index].put(hash, key, value);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn get(&self, key: &K) -> Result<&V> {
        let (index, hash) = self.locate(key);
        self.slots[index].get(hash, key)
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        let (index, hash) = self.locate(key);
        self.slots[index].get_mut(hash, key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_ok()
    }

    /// Removes `key` and returns its value, or [`Error::KeyNotFound`](crate::Error::KeyNotFound).
    pub fn remove(&mut self, key: &K) -> Result<V> {
        let (index, hash) = self.locate(key);
        let value = self.slots[index].remove(hash, key)?;
        self.len -= 1;
        Ok(value)
    }
}

impl<K: Debug, V: Debug, S, const N: usize, const B: usize> Debug for Table<K, V, S, N, B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, const N: usize, const B: usize> Extend<(K, V)> for Table<K, V, S, N, B>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K, V, S, const N: usize, const B: usize> FromIterator<(K, V)> for Table<K, V, S, N, B>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<'a, K, V, S, const N: usize, const B: usize> IntoIterator for &'a Table<K, V, S, N, B> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ------------------------------------------ ITER ---------------------------------------------

/// Borrowing iterator over a [`Table`], created by [`Table::iter`].
pub struct Iter<'a, K, V, const B: usize> {
    slots: slice::Iter<'a, Bucket<K, V, B>>,
    current: Option<bucket::Iter<'a, K, V, B>>,
    remaining: usize,
}

impl<'a, K, V, const B: usize> Iterator for Iter<'a, K, V, B> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some(entry);
            }
            // current chain exhausted, move to the next non-empty slot
            let bucket = self.slots.find(|bucket| !bucket.is_empty())?;
            self.current = Some(bucket.iter());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, const B: usize> ExactSizeIterator for Iter<'_, K, V, B> {}

impl<K, V, const B: usize> FusedIterator for Iter<'_, K, V, B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::hash_map::RandomState;
    use std::collections::{HashMap, HashSet};

    type SmallTable = Table<u64, u64, FnvBuildHasher, 8, 4>;

    /// `count` distinct keys that all route to `slot`.
    fn keys_in_slot(table: &SmallTable, slot: usize, count: usize) -> Vec<u64> {
        (0..)
            .filter(|k| table.slot_of(k) == slot)
            .take(count)
            .collect()
    }

    #[test]
    fn create_and_drop() {
        let t = SmallTable::new();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(t.slot_count(), 8);
        assert_eq!(t.bucket_capacity(), 4);
    }

    #[test]
    fn remove_nothing() {
        let mut t = SmallTable::new();
        assert_eq!(t.remove(&1), Err(Error::KeyNotFound));
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn insert_remove() {
        let mut t = SmallTable::new();
        assert!(t.put(1, 1));
        assert_eq!(t.remove(&1), Ok(1));
        assert_eq!(t.get(&1), Err(Error::KeyNotFound));
        assert!(t.is_empty());
    }

    #[test]
    fn overwrite_not_duplicate() {
        let mut t = SmallTable::new();
        assert!(t.put(5, 1));
        assert!(!t.put(5, 2));
        assert_eq!(t.get(&5), Ok(&2));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn ten_keys_small_table() {
        let mut t = SmallTable::new();
        for k in 0..10 {
            t.put(k, k * 2);
        }
        assert_eq!(t.len(), 10);
        for k in 0..10 {
            assert_eq!(t.get(&k), Ok(&(k * 2)));
        }
    }

    #[test]
    fn forced_overflow_in_one_slot() {
        let mut t = SmallTable::new();
        let keys = keys_in_slot(&t, 3, 9);
        for &k in &keys {
            assert!(t.put(k, k + 1));
        }
        let root = t.slot(3).unwrap();
        assert_eq!(root.local_len(), 4);
        assert_eq!(root.depth(), 3);
        assert_eq!(t.len(), 9);

        for &k in &keys {
            assert_eq!(t.get(&k), Ok(&(k + 1)));
        }
        for &k in &keys {
            assert_eq!(t.remove(&k), Ok(k + 1));
            assert!(!t.contains_key(&k));
        }
        assert!(t.is_empty());
    }

    #[test]
    fn compaction_keeps_slot_dense() {
        let mut t = SmallTable::new();
        let keys = keys_in_slot(&t, 0, 4);
        for &k in &keys[..3] {
            t.put(k, k);
        }
        t.remove(&keys[0]).unwrap();
        assert_eq!(t.slot(0).unwrap().local_keys(), &keys[1..3]);

        t.put(keys[3], keys[3]);
        assert_eq!(t.slot(0).unwrap().local_keys(), &keys[1..4]);
        for &k in &keys[1..] {
            assert_eq!(t.get(&k), Ok(&k));
        }
    }

    #[test]
    fn clear_resets_fully() {
        let mut t = SmallTable::new();
        let keys = keys_in_slot(&t, 1, 6);
        for &k in &keys {
            t.put(k, k);
        }
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(t.slot(1).unwrap().depth(), 1);
        assert!(t.put(keys[0], 7));
        assert_eq!(t.get(&keys[0]), Ok(&7));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn to_vec_holds_every_value() {
        let mut t = SmallTable::new();
        for k in 0..50 {
            t.put(k, k);
        }
        let mut values = t.to_vec();
        values.sort_unstable();
        assert_eq!(values, (0..50).collect::<Vec<_>>());
        assert_eq!(t.iter().len(), 50);
        assert_eq!(t.keys().count(), 50);
    }

    #[test]
    fn iter_follows_to_vec_order() {
        let t: SmallTable = (0..30).map(|k| (k, k * 3)).collect();
        let from_iter: Vec<u64> = t.values().copied().collect();
        assert_eq!(from_iter, t.to_vec());
    }

    #[test]
    fn get_mut_and_debug() {
        let mut t = SmallTable::new();
        t.put(1, 10);
        *t.get_mut(&1).unwrap() = 11;
        assert_eq!(t.get(&1), Ok(&11));
        assert_eq!(format!("{:?}", t), "{1: 11}");
    }

    #[test]
    fn string_keys_with_std_hasher() {
        let mut t: Table<String, usize, RandomState> = Table::new();
        for (i, word) in ["alpha", "beta", "gamma"].iter().enumerate() {
            t.put(word.to_string(), i);
        }
        assert_eq!(t.get(&"beta".to_string()), Ok(&1));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn single_slot_table() {
        let mut t: Table<u32, u32, FnvBuildHasher, 1, 2> = Table::new();
        for k in 0..20 {
            t.put(k, k);
        }
        assert_eq!(t.slot(0).unwrap().depth(), 10);
        assert_eq!(t.len(), 20);
    }

    #[test]
    fn insert_and_remove() {
        use rand::*;
        const CAPACITY: usize = 1000;

        let mut v: Vec<u64> = vec![0; CAPACITY];
        rngs::StdRng::seed_from_u64(7).fill(&mut v[0..CAPACITY]);
        v.sort();
        v.dedup();

        let mut a = Table::<u64, u64>::new();
        for i in v.iter() {
            a.put(*i, *i);
        }

        let mut r: Vec<u64> = Vec::with_capacity(CAPACITY);
        for i in v.iter() {
            r.push(*a.get(i).unwrap());
        }
        assert_eq!(r, v);

        for i in v.iter() {
            assert_eq!(a.remove(i), Ok(*i));
        }
        assert!(a.is_empty());
    }

    #[test]
    fn size_matches_reference_set() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut t = SmallTable::new();
        let mut reference = HashSet::new();
        let mut values = HashMap::new();
        for _ in 0..5_000 {
            let key = rng.gen_range(0..64u64);
            if rng.gen_bool(0.6) {
                let value = rng.gen();
                assert_eq!(t.put(key, value), reference.insert(key));
                values.insert(key, value);
            } else {
                let expected = values.remove(&key).ok_or(Error::KeyNotFound);
                reference.remove(&key);
                assert_eq!(t.remove(&key), expected);
            }
            assert_eq!(t.len(), reference.len());
        }
        for (k, v) in &values {
            assert_eq!(t.get(k), Ok(v));
        }
    }
}
