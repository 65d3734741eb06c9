//! Encrypted, integrity-checked, crash-recoverable object store for
//! cryptographic token objects (keys, certificates, secrets).
//!
//! The store persists opaque blobs in an ordered key-value database managed
//! by [`tokenstore-db`](tokenstore_db) and guards them with a versioned
//! encrypt-then-authenticate record format. Three invariants shape the API:
//!
//! * **Fail-closed privacy.** Every Private-category operation requires the
//!   caller-supplied 32-byte encryption key; before a key is installed those
//!   operations fail, they are never silently downgraded to "no encryption".
//!   Public objects are encrypted under a fixed, non-secret obfuscation key
//!   that provides opacity, not confidentiality.
//! * **Immutable categories.** A handle's category (Public or Private) is
//!   fixed when the object is inserted and can never change; updates that
//!   disagree are rejected.
//! * **Monotonic handles.** Handles come from a persisted counter that only
//!   moves forward. Handles are never reused; failures between allocation
//!   and the first write leave harmless, permanent gaps.
//!
//! Access is single-owner: one [`ObjectStore`] per directory, no internal
//! locking, every call blocks until its durable write lands or fails.
//!
//! # Example
//!
//! ```
//! use tokenstore_core::{ObjectBlob, ObjectStore, MEMORY_SENTINEL};
//!
//! # fn main() -> Result<(), tokenstore_core::StoreError> {
//! let mut store = ObjectStore::open(MEMORY_SENTINEL)?;
//! store.set_encryption_key(&[0x42; 32])?;
//! let handle = store.insert(&ObjectBlob::private(b"key material".to_vec()))?;
//! let loaded = store.load_private()?;
//! assert_eq!(loaded[&handle].blob, b"key material");
//! # Ok(())
//! # }
//! ```

mod allocator;
mod crypto;
mod error;
mod keyspace;
mod store;
mod types;

pub use crypto::{StoreKey, BLOB_VERSION, ENCRYPTION_KEY_SIZE, MAC_SIZE};
pub use error::{StoreError, StoreResult};
pub use keyspace::{decode_key, encode_key, BlobCategory, KeyDecodeError};
pub use store::ObjectStore;
pub use types::{Handle, ObjectBlob};

pub use tokenstore_db::{
    EventSink, NullEventSink, Recovery, TracingEventSink, MEMORY_SENTINEL,
};
