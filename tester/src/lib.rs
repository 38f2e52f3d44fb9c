//! Randomized differential testing for [`HashTable`] implementors.
//!
//! A seeded generator produces put/get/remove/clear operations and keeps a
//! `HashMap` in step with them. The target must return the same result as the
//! reference for every operation and report the same length afterwards.

use std::{
    collections::HashMap,
    fmt::{self, Debug, Display, Formatter},
    hash::Hash,
};

use bucketmap::{Error, FnvBuildHasher, HashTable};
use rand::{
    distributions::{Distribution, Standard},
    rngs::StdRng,
    Rng, SeedableRng,
};

mod traits;
pub use traits::*;

/// removes and hits on existing keys are only generated above this many keys
pub const MIN_KEYS: usize = 5;

/// how many operations before the failing one are kept for the report
const PLAYBACK: usize = 5;

pub type Seed = <StdRng as SeedableRng>::Seed;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashTableOperation<K, V> {
    Put(K, V),
    Get(K),
    Remove(K),
    Clear,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<V> {
    Put(bool),
    Get(Result<V, Error>),
    Remove(Result<V, Error>),
    Clear,
}

impl<T, K, V> Operation<T> for HashTableOperation<K, V>
where
    T: HashTable<K, V>,
    K: Copy,
    V: Copy,
{
    type Result = Outcome<V>;

    fn apply(&self, table: &mut T) -> Self::Result {
        match *self {
            Self::Put(key, value) => Outcome::Put(table.put(key, value)),
            Self::Get(key) => Outcome::Get(table.get(&key).copied()),
            Self::Remove(key) => Outcome::Remove(table.remove(&key)),
            Self::Clear => {
                table.clear();
                Outcome::Clear
            }
        }
    }
}

pub type ReferenceImpl<K, V> = HashMap<K, V, FnvBuildHasher>;

/// Seeded operation stream with a `HashMap` reference model.
///
/// The reference uses a fixed hasher so picking an "existing" key is
/// reproducible from the seed alone.
pub struct HashTableOperationGenerator<K, V, R = StdRng> {
    rng: R,
    data: ReferenceImpl<K, V>,
}

impl<K, V> HashTableOperationGenerator<K, V, StdRng>
where
    K: Copy + Hash + Eq,
    V: Copy,
    Standard: Distribution<K> + Distribution<V>,
{
    pub fn seeded(seed: Seed) -> Self {
        <Self as OperationGenerator<StdRng>>::from_seed(seed)
    }
}

impl<K, V, R> HashTableOperationGenerator<K, V, R>
where
    K: Copy + Hash + Eq,
    R: Rng,
    Standard: Distribution<K>,
{
    fn pick_key(&mut self, existing: f64) -> K {
        if !self.data.is_empty() && self.rng.gen_bool(existing) {
            let ind = self.rng.gen_range(0..self.data.len());
            if let Some(key) = self.data.keys().nth(ind) {
                return *key;
            }
        }
        self.rng.gen()
    }
}

impl<K, V, R> OperationGenerator<R> for HashTableOperationGenerator<K, V, R>
where
    R: Rng + SeedableRng,
    K: Copy + Hash + Eq,
    V: Copy,
    Standard: Distribution<K> + Distribution<V>,
{
    type Operation = HashTableOperation<K, V>;
    type Expected = Outcome<V>;
    type ReferenceImpl = ReferenceImpl<K, V>;

    fn from_seed(seed: R::Seed) -> Self {
        Self {
            rng: R::from_seed(seed),
            data: HashMap::default(),
        }
    }

    fn reference(&self) -> &Self::ReferenceImpl {
        &self.data
    }
}

impl<K, V, R> Iterator for HashTableOperationGenerator<K, V, R>
where
    K: Copy + Hash + Eq,
    V: Copy,
    R: Rng,
    Standard: Distribution<K> + Distribution<V>,
{
    type Item = (HashTableOperation<K, V>, Outcome<V>);

    fn next(&mut self) -> Option<Self::Item> {
        //  only inserts until there are enough keys to hit
        let roll = if self.data.len() > MIN_KEYS {
            self.rng.gen_range(0..100)
        } else {
            0
        };

        let item = match roll {
            0..=44 => {
                let key = self.pick_key(0.25);
                let value: V = self.rng.gen();
                let inserted = self.data.insert(key, value).is_none();
                (HashTableOperation::Put(key, value), Outcome::Put(inserted))
            }
            45..=74 => {
                let key = self.pick_key(0.75);
                let res = self.data.get(&key).copied().ok_or(Error::KeyNotFound);
                (HashTableOperation::Get(key), Outcome::Get(res))
            }
            75..=98 => {
                let key = self.pick_key(0.75);
                let res = self.data.remove(&key).ok_or(Error::KeyNotFound);
                (HashTableOperation::Remove(key), Outcome::Remove(res))
            }
            _ => {
                self.data.clear();
                (HashTableOperation::Clear, Outcome::Clear)
            }
        };
        Some(item)
    }
}

/// Runs `ops` generated operations against a fresh `T`.
///
/// With `seed` unset a random one is drawn; it is reported on failure so
/// the run can be repeated.
pub fn test_hashtable<T, K, V>(
    seed: Option<Seed>,
    ops: usize,
) -> Result<(), OperationFailure<K, V>>
where
    T: HashTable<K, V> + Default,
    K: Hash + Eq + Copy + Debug,
    V: Copy + Eq + Debug,
    Standard: Distribution<K> + Distribution<V>,
{
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut target = T::default();
    let mut generator = HashTableOperationGenerator::<K, V>::seeded(seed);

    for op_num in 0..ops {
        let Some((op, expected)) = generator.next() else {
            break;
        };
        let actual = op.apply(&mut target);
        let expected_len = generator.reference().len();
        let len_matches =
            target.len() == expected_len && target.is_empty() == (expected_len == 0);
        if actual != expected || !len_matches {
            return Err(OperationFailure::new(
                seed,
                op_num,
                expected,
                actual,
                expected_len,
                target.len(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct OperationFailure<K, V> {
    pub seed: Seed,
    pub op_num: usize,
    pub expected: Outcome<V>,
    pub actual: Outcome<V>,
    pub expected_len: usize,
    pub actual_len: usize,
    /// the failing operation and up to `PLAYBACK` operations before it
    pub operations: Vec<(HashTableOperation<K, V>, Outcome<V>)>,
}

impl<K, V> OperationFailure<K, V>
where
    K: Copy + Hash + Eq,
    V: Copy,
    Standard: Distribution<K> + Distribution<V>,
{
    fn new(
        seed: Seed,
        op_num: usize,
        expected: Outcome<V>,
        actual: Outcome<V>,
        expected_len: usize,
        actual_len: usize,
    ) -> Self {
        let operations = HashTableOperationGenerator::<K, V>::seeded(seed)
            .take(op_num + 1)
            .skip(op_num.saturating_sub(PLAYBACK))
            .collect();
        Self {
            seed,
            op_num,
            expected,
            actual,
            expected_len,
            actual_len,
            operations,
        }
    }
}

impl<K: Debug, V: Debug> Display for OperationFailure<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "operation {} failed (seed {:?})", self.op_num, self.seed)?;
        let first = self.op_num + 1 - self.operations.len();
        for (ind, (op, res)) in self.operations.iter().enumerate() {
            writeln!(f, "--------- operation {} ----------", first + ind)?;
            writeln!(f, "operation: {:?}", op)?;
            writeln!(f, "expected: {:?}", res)?;
        }
        writeln!(f, "expected / actual : {:?}, {:?}", self.expected, self.actual)?;
        write!(f, "expected / actual len : {}, {}", self.expected_len, self.actual_len)
    }
}
