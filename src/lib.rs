//! Fixed-slot hash table built from bucket chains.
//!
//! A [`Table`] has `N` slots chosen at compile time. Each slot holds a
//! [`Bucket`] of up to `B` entries, and a bucket that fills up links to an
//! overflow bucket of the same shape. The table never rehashes.
//!
//! ```
//! use bucketmap::{Error, Table};
//!
//! let mut table: Table<&str, u32> = Table::new();
//! assert!(table.put("one", 1));
//! assert!(!table.put("one", 11));
//! assert_eq!(table.get(&"one"), Ok(&11));
//! assert_eq!(table.remove(&"two"), Err(Error::KeyNotFound));
//! assert_eq!(table.len(), 1);
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bucket;
pub mod error;
pub mod hash;
pub mod table;
pub mod traits;

pub use bucket::Bucket;
pub use error::{Error, Result};
pub use hash::{FnvBuildHasher, FnvHasher};
pub use table::Table;
pub use traits::HashTable;
