//! Error types for the `bucketmap` crate

/// Errors returned by lookups on a [`Table`](crate::Table) or [`Bucket`](crate::Bucket)
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The key is not present anywhere in the slot's bucket chain.
    #[error("key not found")]
    KeyNotFound,
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
