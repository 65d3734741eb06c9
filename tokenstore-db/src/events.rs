//! Fire-and-forget telemetry events.
//!
//! The recovery ladder emits a small set of named events so an operator can
//! count corruption incidents. Emission is best-effort: a sink that drops
//! events or fails internally never affects the outcome of the operation
//! that produced them.

use tracing::info;

/// The database failed its first open or needed an integrity repair.
pub const EVENT_DATABASE_CORRUPTED: &str = "tokenstore.database_corrupted";
/// The repair attempt did not produce an openable database.
pub const EVENT_DATABASE_REPAIR_FAILURE: &str = "tokenstore.database_repair_failure";
/// Recreating a fresh database after quarantine failed.
pub const EVENT_DATABASE_CREATE_FAILURE: &str = "tokenstore.database_create_failure";

/// Receiver for named store events.
///
/// Implementations must not panic; there is no way to report an emission
/// failure back to the store.
pub trait EventSink: Send + Sync {
    /// Records a single named event.
    fn emit(&self, event: &str);
}

/// Sink that forwards every event to the active `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &str) {
        info!(target: "tokenstore::events", event, "store event");
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &str) {}
}
