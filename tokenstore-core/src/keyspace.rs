//! Flat key-space codec for persisted blobs.
//!
//! Object entries are addressed by `"<prefix>&<decimal handle>"` where the
//! prefix names the category. Meta keys (`DBVersion`, `NextBlobID`) carry
//! no separator, so the codec itself excludes them from scans.

use crate::types::Handle;

const SEPARATOR: char = '&';
const INTERNAL_PREFIX: &str = "InternalBlob";
const PUBLIC_PREFIX: &str = "PublicBlob";
const PRIVATE_PREFIX: &str = "PrivateBlob";

/// Classification of a stored blob, fixed per handle at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobCategory {
    /// Implementation bookkeeping; caller-addressed small ids, stored
    /// verbatim without encryption.
    Internal,
    /// Token objects readable without the secret key (obfuscated only).
    Public,
    /// Token objects protected by the caller-supplied secret key.
    Private,
}

impl BlobCategory {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Internal => INTERNAL_PREFIX,
            Self::Public => PUBLIC_PREFIX,
            Self::Private => PRIVATE_PREFIX,
        }
    }
}

/// Reason a stored key failed to decode as an object entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyDecodeError {
    /// The key has no separator: it is a meta entry, not an object blob.
    #[error("key has no category separator")]
    MissingSeparator,
    /// The leading segment is not one of the known category prefixes.
    #[error("unrecognized category prefix")]
    UnknownPrefix,
    /// The trailing segment is not a non-negative decimal handle.
    #[error("handle segment is not a decimal integer")]
    BadHandle,
}

/// Builds the flat engine key for `(category, handle)`.
#[must_use]
pub fn encode_key(category: BlobCategory, handle: Handle) -> String {
    format!("{}{SEPARATOR}{handle}", category.prefix())
}

/// Splits a flat engine key back into `(category, handle)`.
///
/// The split is anchored on the *last* separator occurrence; prefixes never
/// contain the separator, so the mapping is unambiguous.
///
/// # Errors
/// Fails for meta keys (no separator), unknown prefixes, and handle
/// segments that are not plain decimal integers.
pub fn decode_key(key: &str) -> Result<(BlobCategory, Handle), KeyDecodeError> {
    let (prefix, id) = key
        .rsplit_once(SEPARATOR)
        .ok_or(KeyDecodeError::MissingSeparator)?;
    let category = match prefix {
        INTERNAL_PREFIX => BlobCategory::Internal,
        PUBLIC_PREFIX => BlobCategory::Public,
        PRIVATE_PREFIX => BlobCategory::Private,
        _ => return Err(KeyDecodeError::UnknownPrefix),
    };
    if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(KeyDecodeError::BadHandle);
    }
    let handle = id.parse().map_err(|_| KeyDecodeError::BadHandle)?;
    Ok((category, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_is_bijective() {
        let categories = [
            BlobCategory::Internal,
            BlobCategory::Public,
            BlobCategory::Private,
        ];
        let handles = [0, 1, 42, 1_000_000, Handle::MAX];
        for category in categories {
            for handle in handles {
                let key = encode_key(category, handle);
                assert_eq!(decode_key(&key), Ok((category, handle)), "key {key}");
            }
        }
    }

    #[test]
    fn encode_uses_fixed_prefixes() {
        assert_eq!(encode_key(BlobCategory::Internal, 7), "InternalBlob&7");
        assert_eq!(encode_key(BlobCategory::Public, 7), "PublicBlob&7");
        assert_eq!(encode_key(BlobCategory::Private, 7), "PrivateBlob&7");
    }

    #[test]
    fn meta_keys_are_not_object_entries() {
        assert_eq!(decode_key("DBVersion"), Err(KeyDecodeError::MissingSeparator));
        assert_eq!(decode_key("NextBlobID"), Err(KeyDecodeError::MissingSeparator));
        assert_eq!(decode_key(""), Err(KeyDecodeError::MissingSeparator));
    }

    #[test]
    fn unknown_prefix_is_rejected() {
        assert_eq!(decode_key("FooBlob&3"), Err(KeyDecodeError::UnknownPrefix));
        assert_eq!(decode_key("&3"), Err(KeyDecodeError::UnknownPrefix));
        // An embedded separator shifts the prefix and makes it unknown.
        assert_eq!(decode_key("PublicBlob&1&2"), Err(KeyDecodeError::UnknownPrefix));
    }

    #[test]
    fn malformed_handles_are_rejected() {
        assert_eq!(decode_key("PublicBlob&"), Err(KeyDecodeError::BadHandle));
        assert_eq!(decode_key("PublicBlob&abc"), Err(KeyDecodeError::BadHandle));
        assert_eq!(decode_key("PublicBlob&-1"), Err(KeyDecodeError::BadHandle));
        assert_eq!(decode_key("PublicBlob&+1"), Err(KeyDecodeError::BadHandle));
        assert_eq!(decode_key("PublicBlob&1 "), Err(KeyDecodeError::BadHandle));
        // One past Handle::MAX overflows.
        assert_eq!(
            decode_key("PublicBlob&18446744073709551616"),
            Err(KeyDecodeError::BadHandle)
        );
    }
}
