//! Value types crossing the store boundary.

/// Allocator-issued identifier for a stored object.
///
/// Unique for the lifetime of one store directory, strictly increasing,
/// never reused. Internal bookkeeping entries use caller-chosen ids of the
/// same type but outside the allocator's sequence.
pub type Handle = u64;

/// Opaque payload passed across the store boundary.
///
/// On the caller side `blob` holds plaintext; on the persisted side it is
/// the versioned ciphertext record. The store never interprets the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBlob {
    /// Whether the payload requires the caller-supplied secret key.
    pub is_private: bool,
    /// The payload bytes.
    pub blob: Vec<u8>,
}

impl ObjectBlob {
    /// Creates a public blob (obfuscated on disk, not confidential).
    #[must_use]
    pub const fn public(blob: Vec<u8>) -> Self {
        Self {
            is_private: false,
            blob,
        }
    }

    /// Creates a private blob protected by the store encryption key.
    #[must_use]
    pub const fn private(blob: Vec<u8>) -> Self {
        Self {
            is_private: true,
            blob,
        }
    }
}
