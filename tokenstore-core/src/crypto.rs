//! Versioned encrypt-then-authenticate transform for persisted blobs.
//!
//! Record layout: `version(1) || ciphertext || mac(64)`. The cipher is
//! AES-256-CBC with PKCS#7 padding; the MAC is HMAC-SHA-512 computed over
//! `version || ciphertext` with the same key that encrypted the payload.
//! Private blobs use the caller-supplied [`StoreKey`]; public blobs use a
//! fixed, compiled-in obfuscation key that makes raw engine bytes opaque
//! without providing confidentiality.
//!
//! The IV is fixed at all-zero, a deliberate format simplification carried
//! by version 1: with one key shared across many records it leaks equal
//! plaintext prefixes. Changing it means a new version byte and a decode
//! branch, not a silent fix.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{StoreError, StoreResult};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha512 = Hmac<Sha512>;

/// Required length of the store encryption key in bytes.
pub const ENCRYPTION_KEY_SIZE: usize = 32;
/// Length of the authentication tag appended to every record.
pub const MAC_SIZE: usize = 64;
/// Format version written into (and required of) every record.
pub const BLOB_VERSION: u8 = 1;

const IV: [u8; 16] = [0; 16];

/// Fixed non-secret key for Public-category blobs.
pub(crate) const OBFUSCATION_KEY: [u8; ENCRYPTION_KEY_SIZE] = [
    0x6f, 0xaa, 0x0a, 0xb6, 0x10, 0xc0, 0xa6, 0xe4, 0x07, 0x8b, 0x05, 0x1c, 0xd2, 0x8b, 0xac,
    0x2d, 0xba, 0x5e, 0x14, 0x9c, 0xae, 0x57, 0xfb, 0x04, 0x13, 0x92, 0xc0, 0x84, 0x2a, 0xea,
    0xf6, 0xfb,
];

/// Store encryption key for Private-category blobs.
///
/// Zeroized on drop; replacing the store's key drops, and therefore
/// scrubs, the previous key material.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StoreKey([u8; ENCRYPTION_KEY_SIZE]);

impl StoreKey {
    /// Wraps exactly [`ENCRYPTION_KEY_SIZE`] bytes of key material.
    ///
    /// # Errors
    /// Fails with [`StoreError::InvalidKeyLength`] for any other length.
    pub fn from_bytes(bytes: &[u8]) -> StoreResult<Self> {
        let key: [u8; ENCRYPTION_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| StoreError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    pub(crate) const fn as_bytes(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreKey").field("key", &"[REDACTED]").finish()
    }
}

/// Encrypts and authenticates `plaintext` into a persisted record.
pub(crate) fn seal(key: &[u8; ENCRYPTION_KEY_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let ciphertext =
        Aes256CbcEnc::new(key.into(), &IV.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut record = Vec::with_capacity(1 + ciphertext.len() + MAC_SIZE);
    record.push(BLOB_VERSION);
    record.extend_from_slice(&ciphertext);
    let tag = compute_mac(key, &record);
    record.extend_from_slice(&tag);
    record
}

/// Verifies and decrypts a persisted record back into plaintext.
///
/// Verification order: length gate, constant-time MAC comparison, version
/// gate, cipher. The MAC covers the version byte, so a flipped version is
/// already caught by the MAC check; the version gate rejects well-formed
/// records produced by a different format revision.
///
/// # Errors
/// [`StoreError::Integrity`] on truncation, MAC mismatch, or ciphertext
/// that fails to decrypt; [`StoreError::UnsupportedVersion`] on an
/// authenticated but unknown version byte.
pub(crate) fn open(key: &[u8; ENCRYPTION_KEY_SIZE], record: &[u8]) -> StoreResult<Vec<u8>> {
    if record.len() < MAC_SIZE {
        return Err(StoreError::Integrity);
    }
    let (body, claimed) = record.split_at(record.len() - MAC_SIZE);
    let computed = compute_mac(key, body);
    if !bool::from(claimed.ct_eq(&computed[..])) {
        return Err(StoreError::Integrity);
    }
    let Some((&version, ciphertext)) = body.split_first() else {
        return Err(StoreError::Integrity);
    };
    if version != BLOB_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    Aes256CbcDec::new(key.into(), &IV.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| StoreError::Integrity)
}

fn compute_mac(key: &[u8; ENCRYPTION_KEY_SIZE], data: &[u8]) -> [u8; MAC_SIZE] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC-SHA512 accepts a 32-byte key");
    mac.update(data);
    let mut tag = [0u8; MAC_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; ENCRYPTION_KEY_SIZE] = [0x42; ENCRYPTION_KEY_SIZE];

    #[test]
    fn seal_open_roundtrip() {
        let plaintext = b"certificate bytes";
        let record = seal(&KEY, plaintext);
        assert_eq!(record[0], BLOB_VERSION);
        assert!(record.len() >= 1 + plaintext.len() + MAC_SIZE);
        assert_eq!(open(&KEY, &record).unwrap(), plaintext);
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let record = seal(&KEY, b"");
        assert_eq!(open(&KEY, &record).unwrap(), b"");
    }

    #[test]
    fn obfuscation_key_roundtrips() {
        let record = seal(&OBFUSCATION_KEY, b"public object");
        assert_eq!(open(&OBFUSCATION_KEY, &record).unwrap(), b"public object");
    }

    #[test]
    fn any_single_bit_flip_is_detected() {
        let record = seal(&KEY, b"tamper target");
        for index in 0..record.len() {
            for bit in 0..8 {
                let mut tampered = record.clone();
                tampered[index] ^= 1 << bit;
                assert!(
                    matches!(open(&KEY, &tampered), Err(StoreError::Integrity)),
                    "flip at byte {index} bit {bit} was not caught"
                );
            }
        }
    }

    #[test]
    fn wrong_key_is_rejected() {
        let record = seal(&KEY, b"secret");
        let other = [0x43; ENCRYPTION_KEY_SIZE];
        assert!(matches!(open(&other, &record), Err(StoreError::Integrity)));
    }

    #[test]
    fn truncated_records_are_rejected() {
        let record = seal(&KEY, b"short");
        assert!(matches!(open(&KEY, &record[..MAC_SIZE - 1]), Err(StoreError::Integrity)));
        assert!(matches!(open(&KEY, &[]), Err(StoreError::Integrity)));
        // Exactly one MAC worth of bytes has no version byte to check.
        assert!(matches!(
            open(&KEY, &record[record.len() - MAC_SIZE..]),
            Err(StoreError::Integrity)
        ));
    }

    #[test]
    fn authenticated_unknown_version_is_rejected() {
        // Forge a record whose version byte is wrong but whose MAC is
        // valid, proving the version gate triggers after the MAC check.
        let record = seal(&KEY, b"future format");
        let mut body = record[..record.len() - MAC_SIZE].to_vec();
        body[0] = 2;
        let tag = compute_mac(&KEY, &body);
        body.extend_from_slice(&tag);
        assert!(matches!(
            open(&KEY, &body),
            Err(StoreError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn store_key_requires_exactly_32_bytes() {
        assert!(StoreKey::from_bytes(&[0; 32]).is_ok());
        assert!(matches!(
            StoreKey::from_bytes(&[0; 16]),
            Err(StoreError::InvalidKeyLength(16))
        ));
        assert!(matches!(
            StoreKey::from_bytes(&[]),
            Err(StoreError::InvalidKeyLength(0))
        ));
        assert!(matches!(
            StoreKey::from_bytes(&[0; 33]),
            Err(StoreError::InvalidKeyLength(33))
        ));
    }

    #[test]
    fn store_key_debug_is_redacted() {
        let key = StoreKey::from_bytes(&[0x11; 32]).unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("11"));
    }
}
