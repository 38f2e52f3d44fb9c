//! Fixed-capacity buckets with overflow chaining
//!
//! A [`Bucket`] stores up to `B` entries in three parallel arrays: cached
//! top hashes, keys, and values. Live entries always sit at `[0, local_len)`.
//! When a bucket is full the next new key spills into an overflow bucket of
//! the same shape, allocated on first use and owned by its parent. The chain
//! is walked with loops, never recursion.

use alloc::{boxed::Box, vec::Vec};
use core::fmt::{self, Debug, Formatter};
use core::iter;

use arrayvec::ArrayVec;

use crate::error::{Error, Result};
use crate::hash::{top_hash, TopHash};

/// One node of a slot's overflow chain.
///
/// Every method that looks up a key takes the key's full 64-bit digest as
/// `hash`. The bucket only keeps the [`TopHash`] fragment of it, and a match
/// always requires full key equality as well.
pub struct Bucket<K, V, const B: usize> {
    top_hashes: ArrayVec<TopHash, B>,
    keys: ArrayVec<K, B>,
    values: ArrayVec<V, B>,
    overflow: Option<Box<Bucket<K, V, B>>>,
}

impl<K, V, const B: usize> Bucket<K, V, B> {
    /// Maximum number of entries held by a single node.
    pub const CAPACITY: usize = B;

    /// Creates an empty node.
    ///
    /// # Panics
    ///
    /// Panics if `B` is zero.
    pub const fn new() -> Self {
        assert!(B > 0, "a bucket needs room for at least one entry");
        Self {
            top_hashes: ArrayVec::new_const(),
            keys: ArrayVec::new_const(),
            values: ArrayVec::new_const(),
            overflow: None,
        }
    }

    /// Number of live entries in this node, ignoring the overflow chain.
    #[inline]
    pub fn local_len(&self) -> usize {
        debug_assert_eq!(self.keys.len(), self.top_hashes.len());
        debug_assert_eq!(self.keys.len(), self.values.len());
        self.keys.len()
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.keys.is_full()
    }

    /// Number of live entries in the whole chain.
    pub fn len(&self) -> usize {
        self.chain().map(Self::local_len).sum()
    }

    /// True when no node of the chain holds an entry, even if overflow
    /// nodes are still allocated.
    pub fn is_empty(&self) -> bool {
        self.chain().all(|bucket| bucket.local_len() == 0)
    }

    /// Number of allocated nodes in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    pub fn overflow(&self) -> Option<&Bucket<K, V, B>> {
        self.overflow.as_deref()
    }

    /// Live keys of this node in index order.
    pub fn local_keys(&self) -> &[K] {
        &self.keys
    }

    /// Drops every entry and the overflow chain.
    pub fn clear(&mut self) {
        self.top_hashes.clear();
        self.keys.clear();
        self.values.clear();
        self.overflow = None;
    }

    /// Entries of the chain: this node's in index order, then the overflow's.
    pub fn iter(&self) -> Iter<'_, K, V, B> {
        Iter {
            bucket: Some(self),
            index: 0,
        }
    }

    fn chain(&self) -> impl Iterator<Item = &Bucket<K, V, B>> {
        iter::successors(Some(self), |bucket| bucket.overflow.as_deref())
    }

    fn push(&mut self, top: TopHash, key: K, value: V) {
        self.top_hashes.push(top);
        self.keys.push(key);
        self.values.push(value);
    }

    /// Removes the entry at `index` and shifts the ones after it left by one.
    fn remove_at(&mut self, index: usize) -> V {
        self.top_hashes.remove(index);
        self.keys.remove(index);
        self.values.remove(index)
    }

    /// Node at `depth` in the chain, appending empty nodes up to it.
    fn node_mut(&mut self, depth: usize) -> &mut Self {
        let mut bucket = self;
        for level in 0..depth {
            bucket = &mut **bucket.overflow.get_or_insert_with(|| {
                log::trace!("allocating overflow bucket at chain depth {}", level + 1);
                Box::new(Bucket::new())
            });
        }
        bucket
    }
}

/// Outcome of [`Bucket::placement`], as chain depth and node index.
enum Placement {
    Occupied(usize, usize),
    Vacant(usize),
}

impl<K, V: Clone, const B: usize> Bucket<K, V, B> {
    /// Values of the chain in [`iter`](Self::iter) order.
    pub fn to_vec(&self) -> Vec<V> {
        self.iter().map(|(_, value)| value.clone()).collect()
    }
}

impl<K: Eq, V, const B: usize> Bucket<K, V, B> {
    /// Inserts or overwrites `key`.
    ///
    /// Returns `true` if the key was new to the chain and `false` if an
    /// existing value was replaced. A new key goes to the first node with a
    /// free slot; if there is none, an overflow node is appended.
    pub fn put(&mut self, hash: u64, key: K, value: V) -> bool {
        let top = top_hash(hash);
        match self.placement(top, &key) {
            Placement::Occupied(depth, index) => {
                self.node_mut(depth).values[index] = value;
                false
            }
            Placement::Vacant(depth) => {
                self.node_mut(depth).push(top, key, value);
                true
            }
        }
    }

    pub fn get(&self, hash: u64, key: &K) -> Result<&V> {
        let top = top_hash(hash);
        let mut bucket = self;
        loop {
            if let Some(index) = bucket.position(top, key) {
                return Ok(&bucket.values[index]);
            }
            bucket = bucket.overflow.as_deref().ok_or(Error::KeyNotFound)?;
        }
    }

    pub fn get_mut(&mut self, hash: u64, key: &K) -> Result<&mut V> {
        self.find_mut(top_hash(hash), key).ok_or(Error::KeyNotFound)
    }

    /// Removes `key` from the chain and returns its value.
    ///
    /// The node the key was found in is compacted; overflow nodes stay
    /// allocated even when they become empty.
    pub fn remove(&mut self, hash: u64, key: &K) -> Result<V> {
        let top = top_hash(hash);
        let mut bucket = self;
        loop {
            if let Some(index) = bucket.position(top, key) {
                return Ok(bucket.remove_at(index));
            }
            bucket = bucket.overflow.as_deref_mut().ok_or(Error::KeyNotFound)?;
        }
    }

    // top hash first, the key comparison only runs on a fragment match
    #[inline]
    fn position(&self, top: TopHash, key: &K) -> Option<usize> {
        self.top_hashes
            .iter()
            .zip(self.keys.iter())
            .position(|(&t, k)| t == top && k == key)
    }

    /// Single read-only walk of the chain: where `key` already lives, or
    /// else the first node with a free slot. A depth equal to the chain
    /// length means a new tail node is needed.
    fn placement(&self, top: TopHash, key: &K) -> Placement {
        let mut vacant = None;
        let mut nodes = 0;
        for (depth, bucket) in self.chain().enumerate() {
            if let Some(index) = bucket.position(top, key) {
                return Placement::Occupied(depth, index);
            }
            if vacant.is_none() && !bucket.is_full() {
                vacant = Some(depth);
            }
            nodes = depth + 1;
        }
        Placement::Vacant(vacant.unwrap_or(nodes))
    }

    fn find_mut(&mut self, top: TopHash, key: &K) -> Option<&mut V> {
        let mut bucket = self;
        loop {
            if let Some(index) = bucket.position(top, key) {
                return Some(&mut bucket.values[index]);
            }
            bucket = bucket.overflow.as_deref_mut()?;
        }
    }
}

impl<K, V, const B: usize> Default for Bucket<K, V, B> {
    fn default() -> Self {
        Self::new()
    }
}

// unlink the chain node by node so dropping a long chain does not recurse
impl<K, V, const B: usize> Drop for Bucket<K, V, B> {
    fn drop(&mut self) {
        let mut next = self.overflow.take();
        while let Some(mut bucket) = next {
            next = bucket.overflow.take();
        }
    }
}

impl<K: Debug, V: Debug, const B: usize> Debug for Bucket<K, V, B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, const B: usize> IntoIterator for &'a Bucket<K, V, B> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a bucket chain, created by [`Bucket::iter`].
pub struct Iter<'a, K, V, const B: usize> {
    bucket: Option<&'a Bucket<K, V, B>>,
    index: usize,
}

impl<'a, K, V, const B: usize> Iterator for Iter<'a, K, V, B> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let bucket = self.bucket?;
            if self.index < bucket.local_len() {
                let index = self.index;
                self.index += 1;
                return Some((&bucket.keys[index], &bucket.values[index]));
            }
            self.bucket = bucket.overflow.as_deref();
            self.index = 0;
        }
    }
}

impl<K, V, const B: usize> Clone for Iter<'_, K, V, B> {
    fn clone(&self) -> Self {
        Self {
            bucket: self.bucket,
            index: self.index,
        }
    }
}
