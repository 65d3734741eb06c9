//! Error types for the storage engine adapter.

/// Error returned by storage engine operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The database could not be opened or created.
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),
    /// A low-level storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),
    /// The blob table could not be opened.
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),
    /// A transaction could not be started.
    #[error("transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    /// A transaction failed to commit.
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
    /// A filesystem operation outside the engine failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The `:memory:` sentinel was used but in-memory support is not
    /// compiled in.
    #[error("in-memory backend support is not compiled in")]
    MemoryBackendUnavailable,
}

impl From<redb::TransactionError> for DbError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(err))
    }
}

/// Result type for storage engine operations.
pub type DbResult<T> = Result<T, DbError>;
