//! Error types for the object store.
//!
//! Speculative read misses are not errors: lookups that may legitimately
//! find nothing return `Ok(None)` instead of a dedicated variant.

use tokenstore_db::DbError;

use crate::types::Handle;

/// Errors surfaced by object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A Private-category operation was attempted before an encryption key
    /// was installed.
    #[error("the store encryption key has not been set")]
    KeyNotSet,
    /// The supplied encryption key is not exactly 32 bytes.
    #[error("invalid encryption key length {0}, expected 32 bytes")]
    InvalidKeyLength(usize),
    /// A persisted record failed its integrity check: truncated record,
    /// MAC mismatch, or undecryptable ciphertext.
    #[error("blob integrity check failed")]
    Integrity,
    /// A persisted record carries a format version this build does not
    /// support.
    #[error("unsupported blob format version {0}")]
    UnsupportedVersion(u8),
    /// The handle counter reached the maximum representable value.
    #[error("object handle space exhausted")]
    HandleSpaceExhausted,
    /// The handle has no recorded category; it was never inserted, was
    /// deleted, or its index entry has not been rebuilt by a load.
    #[error("unknown object handle {0}")]
    UnknownHandle(Handle),
    /// The blob's privacy level disagrees with the category fixed when the
    /// handle was inserted.
    #[error("privacy level mismatch for handle {0}")]
    PrivacyMismatch(Handle),
    /// A persisted meta value could not be parsed.
    #[error("malformed persisted value under {key}")]
    Parse {
        /// The engine key whose value failed to parse.
        key: String,
    },
    /// One or more deletions in a sweep failed; the sweep still attempted
    /// every remaining deletion.
    #[error("failed to delete {failed} object blobs")]
    DeleteIncomplete {
        /// Number of deletions that failed.
        failed: usize,
    },
    /// The storage engine reported an error.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;
