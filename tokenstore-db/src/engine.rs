//! Storage engine adapter over `redb`.
//!
//! One engine instance owns one database file under a store root directory.
//! Opening runs the recovery ladder; every mutation commits with
//! [`Durability::Immediate`].

use std::fs;
use std::io;
use std::path::Path;

use redb::{Database, Durability, ReadableTable, TableDefinition};
use tracing::{error, info, warn};

use crate::error::DbResult;
use crate::events::{
    EventSink, EVENT_DATABASE_CORRUPTED, EVENT_DATABASE_CREATE_FAILURE,
    EVENT_DATABASE_REPAIR_FAILURE,
};

/// Path sentinel selecting a non-persistent in-memory backend.
pub const MEMORY_SENTINEL: &str = ":memory:";
/// File name of the live database under the store root.
pub const DATABASE_FILE: &str = "database";
/// Single-slot quarantine archive for a database that could not be
/// recovered. Replaced on every recreation event.
pub const QUARANTINE_FILE: &str = "database_corrupt";
/// Meta key holding the schema version as decimal text.
pub const DATABASE_VERSION_KEY: &str = "DBVersion";
/// Meta key holding the next unallocated handle as decimal text.
pub const NEXT_ID_KEY: &str = "NextBlobID";

const DATABASE_VERSION: &[u8] = b"1";
const FIRST_ID: &[u8] = b"1";

const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// How the database was brought up during [`StorageEngine::open`].
///
/// Together with the fatal `Err` return this makes all four terminal
/// outcomes of the recovery ladder independently observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The database opened cleanly on the first attempt.
    Clean,
    /// The database opened after an in-place repair.
    Repaired,
    /// The database was quarantined and recreated from scratch.
    Recreated,
}

/// One ordered key-value database rooted at a directory.
pub struct StorageEngine {
    db: Database,
    recovery: Recovery,
}

impl StorageEngine {
    /// Opens (creating if absent) the database under `root`, applying the
    /// recovery ladder when the existing database cannot be opened cleanly.
    /// After any successful open, seeds the meta keys on a database that has
    /// no [`DATABASE_VERSION_KEY`] yet.
    ///
    /// Passing [`MEMORY_SENTINEL`] as `root` selects a non-persistent
    /// in-memory backend instead of touching the filesystem.
    ///
    /// # Errors
    /// Fails when every rung of the ladder fails, when the meta-key
    /// bootstrap cannot be persisted, or when the in-memory sentinel is
    /// used without the `in-memory` feature.
    pub fn open(root: &Path, sink: &dyn EventSink) -> DbResult<Self> {
        if root == Path::new(MEMORY_SENTINEL) {
            return Self::open_in_memory();
        }
        fs::create_dir_all(root)?;
        let db_path = root.join(DATABASE_FILE);
        info!(path = %db_path.display(), "opening object database");
        let (db, recovery) = Self::open_with_recovery(root, &db_path, sink)?;
        let engine = Self { db, recovery };
        engine.ensure_table()?;
        engine.bootstrap()?;
        Ok(engine)
    }

    /// The recovery-ladder outcome of the open that produced this engine.
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        self.recovery
    }

    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    /// Propagates engine failures; a missing key is `Ok(None)`.
    pub fn get(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BLOBS)?;
        Ok(table.get(key)?.map(|value| value.value().to_vec()))
    }

    /// Durably writes `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    /// Propagates engine failures; the write either fully lands before this
    /// returns or the error is authoritative.
    pub fn put(&self, key: &str, value: &[u8]) -> DbResult<()> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Immediate);
        {
            let mut table = txn.open_table(BLOBS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Durably removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    /// Propagates engine failures.
    pub fn delete(&self, key: &str) -> DbResult<()> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Immediate);
        {
            let mut table = txn.open_table(BLOBS)?;
            table.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Key-ordered snapshot of every `(key, value)` entry.
    ///
    /// The snapshot is taken under a single read transaction; it is finite
    /// and a later call starts over from a fresh snapshot.
    ///
    /// # Errors
    /// Propagates engine failures.
    pub fn scan(&self) -> DbResult<Vec<(String, Vec<u8>)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BLOBS)?;
        let mut entries = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            entries.push((entry.0.value().to_string(), entry.1.value().to_vec()));
        }
        Ok(entries)
    }

    fn open_with_recovery(
        root: &Path,
        db_path: &Path,
        sink: &dyn EventSink,
    ) -> DbResult<(Database, Recovery)> {
        match Self::open_checked(db_path) {
            Ok((db, true)) => Ok((db, Recovery::Clean)),
            Ok((db, false)) => {
                warn!("database required an in-place repair");
                sink.emit(EVENT_DATABASE_CORRUPTED);
                Ok((db, Recovery::Repaired))
            }
            Err(err) => {
                error!(%err, "failed to open database");
                sink.emit(EVENT_DATABASE_CORRUPTED);
                warn!("attempting to repair database");
                match Self::open_checked(db_path) {
                    Ok((db, _)) => Ok((db, Recovery::Repaired)),
                    Err(err) => {
                        error!(%err, "failed to repair database");
                        sink.emit(EVENT_DATABASE_REPAIR_FAILURE);
                        Self::recreate(root, db_path, sink)
                    }
                }
            }
        }
    }

    fn recreate(
        root: &Path,
        db_path: &Path,
        sink: &dyn EventSink,
    ) -> DbResult<(Database, Recovery)> {
        let quarantine = root.join(QUARANTINE_FILE);
        warn!(
            quarantine = %quarantine.display(),
            "recreating database from scratch, quarantining current file"
        );
        if let Err(err) = replace_quarantine(db_path, &quarantine) {
            error!(%err, "failed to quarantine corrupt database");
            sink.emit(EVENT_DATABASE_CREATE_FAILURE);
            return Err(err.into());
        }
        match Self::open_checked(db_path) {
            Ok((db, _)) => Ok((db, Recovery::Recreated)),
            Err(err) => {
                error!(%err, "failed to create new database");
                sink.emit(EVENT_DATABASE_CREATE_FAILURE);
                Err(err)
            }
        }
    }

    /// Opens the database file, creating it if missing, and runs a full
    /// integrity pass. The boolean is `true` when the pass found the
    /// database already consistent; `false` means a repair was performed.
    fn open_checked(db_path: &Path) -> DbResult<(Database, bool)> {
        let mut db = Database::builder().create(db_path)?;
        let clean = db.check_integrity()?;
        Ok((db, clean))
    }

    #[cfg(feature = "in-memory")]
    fn open_in_memory() -> DbResult<Self> {
        info!("using in-memory storage backend");
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let engine = Self {
            db,
            recovery: Recovery::Clean,
        };
        engine.ensure_table()?;
        engine.bootstrap()?;
        Ok(engine)
    }

    #[cfg(not(feature = "in-memory"))]
    fn open_in_memory() -> DbResult<Self> {
        error!("compiled without in-memory backend support");
        Err(crate::error::DbError::MemoryBackendUnavailable)
    }

    // Later read transactions must not observe a missing table.
    fn ensure_table(&self) -> DbResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _table = txn.open_table(BLOBS)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn bootstrap(&self) -> DbResult<()> {
        if self.get(DATABASE_VERSION_KEY)?.is_none() {
            self.put(NEXT_ID_KEY, FIRST_ID)?;
            self.put(DATABASE_VERSION_KEY, DATABASE_VERSION)?;
        }
        Ok(())
    }
}

/// Moves `db_path` into the single quarantine slot, replacing any prior
/// archive. A missing source or prior archive is not an error.
fn replace_quarantine(db_path: &Path, quarantine: &Path) -> io::Result<()> {
    match fs::remove_file(quarantine) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    match fs::rename(db_path, quarantine) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
