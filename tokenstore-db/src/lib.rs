//! Recoverable ordered key-value storage for the token object store.
//!
//! This crate owns the lifetime of one [`redb`] database bound to a store
//! directory and exposes the durable primitives the object store is built
//! on: `get`/`put`/`delete` plus a key-ordered `scan`. Opening goes through
//! an explicit recovery ladder (open, repair in place, quarantine and
//! recreate) so that a corrupted database never silently serves data and
//! never permanently bricks the store.
//!
//! Consumers observe the ladder through two side channels:
//!
//! * [`Recovery`], the outcome recorded on the engine after a successful
//!   open, and
//! * [`EventSink`], a fire-and-forget receiver for the named corruption
//!   events emitted while the ladder runs.
//!
//! All mutations commit with immediate durability: this store favors
//! crash-survivability over write latency.

mod engine;
mod error;
mod events;

pub use engine::{
    Recovery, StorageEngine, DATABASE_FILE, DATABASE_VERSION_KEY, MEMORY_SENTINEL, NEXT_ID_KEY,
    QUARANTINE_FILE,
};
pub use error::{DbError, DbResult};
pub use events::{
    EventSink, NullEventSink, TracingEventSink, EVENT_DATABASE_CORRUPTED,
    EVENT_DATABASE_CREATE_FAILURE, EVENT_DATABASE_REPAIR_FAILURE,
};
