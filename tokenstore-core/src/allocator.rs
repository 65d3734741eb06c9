//! Persisted monotonic handle allocator.
//!
//! The counter under [`NEXT_ID_KEY`] only moves forward and is never
//! rewound. Allocation is not transactional with the object write that
//! follows it: a failure in between leaves a gap in the handle sequence,
//! which is acceptable because handles are never reused and gaps carry no
//! cost.

use tokenstore_db::{StorageEngine, NEXT_ID_KEY};

use crate::error::{StoreError, StoreResult};
use crate::types::Handle;

/// Allocates the next handle, durably advancing the persisted counter.
///
/// # Errors
/// Fails with [`StoreError::HandleSpaceExhausted`] instead of wrapping when
/// the counter reaches the maximum representable handle; engine and parse
/// failures propagate.
pub(crate) fn next_handle(engine: &StorageEngine) -> StoreResult<Handle> {
    let next = read_counter(engine)?;
    if next == Handle::MAX {
        return Err(StoreError::HandleSpaceExhausted);
    }
    write_counter(engine, next + 1)?;
    Ok(next)
}

fn read_counter(engine: &StorageEngine) -> StoreResult<Handle> {
    let raw = engine.get(NEXT_ID_KEY)?.ok_or_else(parse_error)?;
    std::str::from_utf8(&raw)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(parse_error)
}

fn write_counter(engine: &StorageEngine, value: Handle) -> StoreResult<()> {
    engine.put(NEXT_ID_KEY, value.to_string().as_bytes())?;
    Ok(())
}

fn parse_error() -> StoreError {
    StoreError::Parse {
        key: NEXT_ID_KEY.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tokenstore_db::{NullEventSink, MEMORY_SENTINEL};

    use super::*;

    fn memory_engine() -> StorageEngine {
        StorageEngine::open(Path::new(MEMORY_SENTINEL), &NullEventSink).unwrap()
    }

    #[test]
    fn handles_start_at_one_and_increase() {
        let engine = memory_engine();
        assert_eq!(next_handle(&engine).unwrap(), 1);
        assert_eq!(next_handle(&engine).unwrap(), 2);
        assert_eq!(next_handle(&engine).unwrap(), 3);
    }

    #[test]
    fn exhaustion_fails_instead_of_wrapping() {
        let engine = memory_engine();
        write_counter(&engine, Handle::MAX).unwrap();
        assert!(matches!(
            next_handle(&engine),
            Err(StoreError::HandleSpaceExhausted)
        ));
        // The counter is left untouched by the failed allocation.
        assert_eq!(read_counter(&engine).unwrap(), Handle::MAX);
    }

    #[test]
    fn corrupt_counter_is_a_parse_error() {
        let engine = memory_engine();
        engine.put(NEXT_ID_KEY, b"not a number").unwrap();
        assert!(matches!(
            next_handle(&engine),
            Err(StoreError::Parse { .. })
        ));
    }
}
