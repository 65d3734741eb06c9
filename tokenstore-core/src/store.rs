//! Object store orchestration.
//!
//! [`ObjectStore`] is the only surface callers touch. It enforces the
//! fail-closed privacy gates, owns the in-memory handle→category index,
//! and drives the crypto layer, key codec, and storage engine. Access is
//! single-owner: the store performs no internal locking and assumes one
//! logical owner per directory at a time.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use tokenstore_db::{EventSink, Recovery, StorageEngine, TracingEventSink};

use crate::allocator;
use crate::crypto::{self, StoreKey, ENCRYPTION_KEY_SIZE, OBFUSCATION_KEY};
use crate::error::{StoreError, StoreResult};
use crate::keyspace::{decode_key, encode_key, BlobCategory, KeyDecodeError};
use crate::types::{Handle, ObjectBlob};

/// Encrypted object store bound to one directory.
pub struct ObjectStore {
    engine: StorageEngine,
    key: Option<StoreKey>,
    categories: HashMap<Handle, BlobCategory>,
}

impl ObjectStore {
    /// Opens the store rooted at `root`, recovering or recreating the
    /// underlying database as needed. Recovery events go to the default
    /// `tracing` sink; use [`ObjectStore::open_with_sink`] to capture them.
    ///
    /// # Errors
    /// Fails only when every recovery rung fails or the first-open
    /// bootstrap cannot be persisted.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_sink(root, &TracingEventSink)
    }

    /// Like [`ObjectStore::open`], with a caller-supplied event sink.
    ///
    /// # Errors
    /// Same as [`ObjectStore::open`].
    pub fn open_with_sink(root: impl AsRef<Path>, sink: &dyn EventSink) -> StoreResult<Self> {
        let engine = StorageEngine::open(root.as_ref(), sink)?;
        Ok(Self {
            engine,
            key: None,
            categories: HashMap::new(),
        })
    }

    /// How the underlying database came up during open.
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        self.engine.recovery()
    }

    /// Installs or replaces the store encryption key.
    ///
    /// The previous key, if any, is dropped and zeroized. Existing Private
    /// entries are not re-encrypted; rotating keys requires an explicit
    /// caller-driven migration.
    ///
    /// # Errors
    /// Fails unless `key` is exactly [`ENCRYPTION_KEY_SIZE`] bytes.
    pub fn set_encryption_key(&mut self, key: &[u8]) -> StoreResult<()> {
        self.key = Some(StoreKey::from_bytes(key)?);
        Ok(())
    }

    /// Encrypts and durably stores a new object, returning its handle.
    ///
    /// The object's category is fixed here by `blob.is_private` and can
    /// never change. A failure after handle allocation abandons the handle;
    /// handles are never reused, so the gap is permanent and harmless.
    ///
    /// # Errors
    /// [`StoreError::KeyNotSet`] for a private blob before a key is
    /// installed; allocator, crypto, and engine failures propagate.
    pub fn insert(&mut self, blob: &ObjectBlob) -> StoreResult<Handle> {
        if blob.is_private && self.key.is_none() {
            return Err(StoreError::KeyNotSet);
        }
        let handle = allocator::next_handle(&self.engine)?;
        let category = if blob.is_private {
            BlobCategory::Private
        } else {
            BlobCategory::Public
        };
        self.categories.insert(handle, category);
        self.write_object(handle, category, blob)?;
        Ok(handle)
    }

    /// Re-encrypts and durably overwrites an existing object.
    ///
    /// # Errors
    /// [`StoreError::UnknownHandle`] if the handle has no recorded
    /// category, [`StoreError::PrivacyMismatch`] if `blob.is_private`
    /// disagrees with the category fixed at insert; a write failure is
    /// surfaced to the caller.
    pub fn update(&mut self, handle: Handle, blob: &ObjectBlob) -> StoreResult<()> {
        let category = self.category_of(handle)?;
        if blob.is_private != (category == BlobCategory::Private) {
            return Err(StoreError::PrivacyMismatch(handle));
        }
        self.write_object(handle, category, blob)
    }

    /// Durably deletes an object.
    ///
    /// # Errors
    /// [`StoreError::UnknownHandle`] if the handle has no recorded
    /// category; engine failures propagate.
    pub fn delete(&mut self, handle: Handle) -> StoreResult<()> {
        let category = self.category_of(handle)?;
        self.engine.delete(&encode_key(category, handle))?;
        self.categories.remove(&handle);
        Ok(())
    }

    /// Deletes every Public and Private object, leaving Internal entries
    /// and meta keys untouched.
    ///
    /// Every deletion is attempted even after an individual failure; the
    /// sweep is not atomic, and a crash mid-sweep leaves a valid but
    /// partial result.
    ///
    /// # Errors
    /// [`StoreError::DeleteIncomplete`] if any deletion failed.
    pub fn delete_all(&mut self) -> StoreResult<()> {
        let mut doomed = Vec::new();
        for (key, _) in self.engine.scan()? {
            if let Ok((category, handle)) = decode_key(&key) {
                if category != BlobCategory::Internal {
                    doomed.push((key, handle));
                }
            }
        }
        let mut failed = 0;
        for (key, handle) in &doomed {
            match self.engine.delete(key) {
                Ok(()) => {
                    self.categories.remove(handle);
                }
                Err(err) => {
                    warn!(%err, key, "failed to delete object blob");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(StoreError::DeleteIncomplete { failed });
        }
        Ok(())
    }

    /// Loads every Public object as `handle → plaintext blob`.
    ///
    /// Entries that fail to decrypt are logged and skipped rather than
    /// failing the whole load; every decoded entry still backfills the
    /// handle→category index, decryptable or not.
    ///
    /// # Errors
    /// Engine failures propagate.
    pub fn load_public(&mut self) -> StoreResult<HashMap<Handle, ObjectBlob>> {
        self.load_category(BlobCategory::Public)
    }

    /// Loads every Private object as `handle → plaintext blob`.
    ///
    /// Same skip-and-continue policy as [`ObjectStore::load_public`].
    ///
    /// # Errors
    /// [`StoreError::KeyNotSet`] before a key is installed, checked before
    /// any scanning happens; engine failures propagate.
    pub fn load_private(&mut self) -> StoreResult<HashMap<Handle, ObjectBlob>> {
        if self.key.is_none() {
            return Err(StoreError::KeyNotSet);
        }
        self.load_category(BlobCategory::Private)
    }

    /// Reads an implementation-bookkeeping blob stored under a
    /// caller-chosen id.
    ///
    /// Returns `Ok(None)` when the blob has never been set; that is an
    /// expected outcome for speculative lookups, not an error.
    ///
    /// # Errors
    /// Engine failures propagate.
    pub fn internal_blob(&self, id: Handle) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.engine.get(&encode_key(BlobCategory::Internal, id))?)
    }

    /// Durably writes an implementation-bookkeeping blob verbatim, without
    /// encryption, under a caller-chosen id independent of the handle
    /// allocator.
    ///
    /// # Errors
    /// Engine failures propagate.
    pub fn set_internal_blob(&mut self, id: Handle, blob: &[u8]) -> StoreResult<()> {
        self.engine
            .put(&encode_key(BlobCategory::Internal, id), blob)?;
        Ok(())
    }

    fn load_category(&mut self, wanted: BlobCategory) -> StoreResult<HashMap<Handle, ObjectBlob>> {
        let is_private = wanted == BlobCategory::Private;
        let mut blobs = HashMap::new();
        for (key, record) in self.engine.scan()? {
            let (category, handle) = match decode_key(&key) {
                Ok(decoded) => decoded,
                // Meta keys are not object entries.
                Err(KeyDecodeError::MissingSeparator) => continue,
                Err(err) => {
                    warn!(%err, key, "skipping malformed object key");
                    continue;
                }
            };
            if category != wanted {
                continue;
            }
            // The index is rebuilt from every decoded entry, even when the
            // record below turns out to be undecryptable.
            self.categories.insert(handle, category);
            match crypto::open(self.select_key(is_private)?, &record) {
                Ok(plaintext) => {
                    blobs.insert(
                        handle,
                        ObjectBlob {
                            is_private,
                            blob: plaintext,
                        },
                    );
                }
                Err(err) => warn!(%err, handle, "failed to decrypt object blob, skipping"),
            }
        }
        Ok(blobs)
    }

    fn write_object(
        &self,
        handle: Handle,
        category: BlobCategory,
        blob: &ObjectBlob,
    ) -> StoreResult<()> {
        let record = crypto::seal(self.select_key(blob.is_private)?, &blob.blob);
        self.engine.put(&encode_key(category, handle), &record)?;
        Ok(())
    }

    fn select_key(&self, is_private: bool) -> StoreResult<&[u8; ENCRYPTION_KEY_SIZE]> {
        if is_private {
            self.key
                .as_ref()
                .map(StoreKey::as_bytes)
                .ok_or(StoreError::KeyNotSet)
        } else {
            Ok(&OBFUSCATION_KEY)
        }
    }

    fn category_of(&self, handle: Handle) -> StoreResult<BlobCategory> {
        self.categories
            .get(&handle)
            .copied()
            .ok_or(StoreError::UnknownHandle(handle))
    }
}
