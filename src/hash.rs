//! Key hashing
//!
//! Every key is reduced to one 64-bit digest. The table takes the slot index
//! from the digest's low end (`digest % N`) and each bucket caches the high
//! end as a [`TopHash`] so most mismatches are rejected without comparing keys.

use core::hash::{BuildHasher, Hash, Hasher};

/// Cached fragment of a key's digest.
pub type TopHash = u16;

/// Bits discarded from a digest to get its [`TopHash`].
pub const TOP_HASH_SHIFT: u32 = u64::BITS - TopHash::BITS;

/// Fowler–Noll–Vo (FNV-1a) 64-bit hasher
///
/// Deterministic across runs and processes: equal keys always give equal
/// digests on the same target.
#[derive(Debug, Copy, Clone)]
pub struct FnvHasher {
    hash: u64,
}

impl FnvHasher {
    const FNV_PRIME: u64 = 0x100000001B3;
    const FNV_OFFSET_BASIS: u64 = 0xCBF29CE484222325;

    /// Creates a new [`FnvHasher`], initialized with `FNV_OFFSET_BASIS`.
    pub const fn new() -> Self {
        Self {
            hash: Self::FNV_OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash ^= *byte as u64;
            self.hash = self.hash.wrapping_mul(Self::FNV_PRIME);
        }
    }
}

/// Builder for [`FnvHasher`], the default hasher of [`Table`](crate::Table).
#[derive(Debug, Default, Copy, Clone)]
pub struct FnvBuildHasher;

impl BuildHasher for FnvBuildHasher {
    type Hasher = FnvHasher;

    fn build_hasher(&self) -> Self::Hasher {
        FnvHasher::new()
    }
}

/// Full 64-bit digest of `key` under `hash_builder`.
#[inline]
pub fn digest<K: Hash + ?Sized, S: BuildHasher>(hash_builder: &S, key: &K) -> u64 {
    hash_builder.hash_one(key)
}

/// High-order fragment of a digest.
#[inline]
pub const fn top_hash(digest: u64) -> TopHash {
    (digest >> TOP_HASH_SHIFT) as TopHash
}

/// Slot index of a digest in a table of `slots` slots.
#[inline]
pub const fn slot_index(digest: u64, slots: usize) -> usize {
    (digest % slots as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_known_vectors() {
        // reference values for FNV-1a 64
        let mut h = FnvHasher::new();
        h.write(b"");
        assert_eq!(h.finish(), 0xcbf29ce484222325);

        let mut h = FnvHasher::new();
        h.write(b"a");
        assert_eq!(h.finish(), 0xaf63dc4c8601ec8c);

        let mut h = FnvHasher::new();
        h.write(b"foobar");
        assert_eq!(h.finish(), 0x85944171f73967e8);
    }

    #[test]
    fn equal_keys_equal_digests() {
        let s = FnvBuildHasher;
        assert_eq!(digest(&s, &42u64), digest(&s, &42u64));
        assert_eq!(digest(&s, "key"), digest(&s, &"key"));
        assert_ne!(digest(&s, &1u64), digest(&s, &2u64));
    }

    #[test]
    fn top_hash_is_high_bits() {
        assert_eq!(top_hash(0xABCD_0000_0000_0000), 0xABCD);
        assert_eq!(top_hash(0x0000_FFFF_FFFF_FFFF), 0);
        assert_eq!(top_hash(u64::MAX), u16::MAX);
    }

    #[test]
    fn slot_index_in_range() {
        for d in [0u64, 1, 7, 8, 9, u64::MAX] {
            assert!(slot_index(d, 8) < 8);
        }
        assert_eq!(slot_index(17, 8), 1);
        assert_eq!(slot_index(u64::MAX, 1), 0);
    }
}
