//! Encrypted insert/lookup wrappers (AES-128-ECB).
//!
//! These exist for wire compatibility with existing consumers. The stored
//! layout is `u32 original_len | ciphertext`, written through the untyped
//! insert path, with the ciphertext zero-padded to the AES block size.
//!
//! **Deprecated: cryptographically weak.** ECB mode leaks equal-block
//! structure and authenticates nothing; it is acceptable only for single
//! fixed-size blocks. New callers should encrypt with an AEAD before
//! inserting plain bytes instead.

use crate::error::{ShmError, ShmResult};
use crate::layout::align_up;
use crate::segment::Segment;
use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use shmdb_codec::ValueType;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-128 key size in bytes.
pub const AES_KEY_SIZE: usize = 16;

/// AES block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// A 16-byte AES key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; AES_KEY_SIZE],
}

impl SecretKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns invalid-parameter unless `bytes` is exactly 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> ShmResult<Self> {
        let bytes: [u8; AES_KEY_SIZE] = bytes.try_into().map_err(|_| {
            ShmError::invalid_parameter(format!("AES key must be {AES_KEY_SIZE} bytes"))
        })?;
        Ok(Self { bytes })
    }

    fn cipher(&self) -> Aes128 {
        Aes128::new(GenericArray::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

fn ecb_encrypt(cipher: &Aes128, plaintext: &[u8]) -> Vec<u8> {
    let mut out = plaintext.to_vec();
    out.resize(align_up(plaintext.len() as u64, AES_BLOCK_SIZE as u64) as usize, 0);
    for block in out.chunks_exact_mut(AES_BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    out
}

fn ecb_decrypt(cipher: &Aes128, ciphertext: &[u8]) -> ShmResult<Vec<u8>> {
    if ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(ShmError::invalid_parameter(
            "ciphertext length is not a multiple of the AES block size",
        ));
    }
    let mut out = ciphertext.to_vec();
    for block in out.chunks_exact_mut(AES_BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(out)
}

impl Segment {
    /// Encrypts `value` with `key` and stores it under the untyped tag as
    /// `u32 original_len | ciphertext`. Owner only.
    pub fn insert_encrypted(
        &self,
        key: &[u8],
        value: &[u8],
        aes_key: &SecretKey,
    ) -> ShmResult<()> {
        if !self.check_owner() {
            return Err(ShmError::PermissionDenied);
        }
        let original_len = u32::try_from(value.len())
            .map_err(|_| ShmError::invalid_parameter("value too long to encrypt"))?;

        let ciphertext = ecb_encrypt(&aes_key.cipher(), value);
        let mut payload = Vec::with_capacity(4 + ciphertext.len());
        payload.extend_from_slice(&original_len.to_le_bytes());
        payload.extend_from_slice(&ciphertext);
        self.insert_tagged(key, ValueType::Unknown, &payload)
    }

    /// Looks up and decrypts a value stored by
    /// [`insert_encrypted`](Self::insert_encrypted), truncating the
    /// plaintext to the recorded original length. Authorized processes
    /// only.
    pub fn lookup_decrypted(&self, key: &[u8], aes_key: &SecretKey) -> ShmResult<Vec<u8>> {
        if !self.check_authorized() {
            return Err(ShmError::PermissionDenied);
        }
        let value = self.lookup(key)?;
        let bytes = value.as_bytes();
        if bytes.len() < 4 {
            return Err(ShmError::invalid_parameter("encrypted payload too short"));
        }
        let original_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let mut plaintext = ecb_decrypt(&aes_key.cipher(), &bytes[4..])?;
        if original_len > plaintext.len() {
            return Err(ShmError::invalid_parameter(
                "recorded length exceeds decrypted payload",
            ));
        }
        plaintext.truncate(original_len);
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SegmentConfig;
    use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};

    static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn create(tag: &str) -> (Segment, String) {
        let name = format!(
            "/shmdb-crypto-{tag}-{}-{}",
            std::process::id(),
            NAME_COUNTER.fetch_add(1, SeqCst)
        );
        let segment = Segment::create(
            &name,
            &SegmentConfig::new().n_buckets(8).n_nodes(8).payload_bytes(16 * 1024),
        )
        .unwrap();
        (segment, name)
    }

    #[test]
    fn key_size_is_enforced() {
        assert!(SecretKey::from_bytes(&[0; 16]).is_ok());
        assert!(SecretKey::from_bytes(&[0; 15]).is_err());
        assert!(SecretKey::from_bytes(&[0; 32]).is_err());
    }

    #[test]
    fn debug_redacts_key_material() {
        let key = SecretKey::from_bytes(&[7; 16]).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('7'));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let (segment, name) = create("roundtrip");
        let key = SecretKey::from_bytes(b"0123456789abcdef").unwrap();

        segment
            .insert_encrypted(b"secret", b"attack at dawn", &key)
            .unwrap();
        assert_eq!(
            segment.lookup_decrypted(b"secret", &key).unwrap(),
            b"attack at dawn"
        );

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn stored_layout_is_len_prefixed_padded_ciphertext() {
        let (segment, name) = create("layout");
        let key = SecretKey::from_bytes(&[1; 16]).unwrap();
        let plaintext = b"seventeen bytes!!"; // 17 bytes -> 2 blocks

        segment.insert_encrypted(b"k", plaintext, &key).unwrap();
        let raw = segment.lookup(b"k").unwrap();
        assert_eq!(raw.tag(), ValueType::Unknown);
        let bytes = raw.as_bytes();
        assert_eq!(
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            17
        );
        assert_eq!(bytes.len(), 4 + 32);
        // Ciphertext, not plaintext, is stored.
        assert_ne!(&bytes[4..21], plaintext.as_slice());

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn block_aligned_plaintext_keeps_exact_length() {
        let (segment, name) = create("aligned");
        let key = SecretKey::from_bytes(&[2; 16]).unwrap();
        let plaintext = [0xAB; 32];

        segment.insert_encrypted(b"k", &plaintext, &key).unwrap();
        let raw = segment.lookup(b"k").unwrap();
        assert_eq!(raw.len(), 4 + 32);
        assert_eq!(segment.lookup_decrypted(b"k", &key).unwrap(), plaintext);

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn wrong_key_yields_different_plaintext() {
        let (segment, name) = create("wrongkey");
        let key = SecretKey::from_bytes(&[3; 16]).unwrap();
        let other = SecretKey::from_bytes(&[4; 16]).unwrap();

        segment.insert_encrypted(b"k", b"sixteen bytes ok", &key).unwrap();
        let decrypted = segment.lookup_decrypted(b"k", &other).unwrap();
        assert_ne!(decrypted, b"sixteen bytes ok");

        drop(segment);
        Segment::destroy(&name).unwrap();
    }

    #[test]
    fn empty_value_roundtrip() {
        let (segment, name) = create("empty");
        let key = SecretKey::from_bytes(&[5; 16]).unwrap();
        segment.insert_encrypted(b"k", b"", &key).unwrap();
        assert_eq!(segment.lookup_decrypted(b"k", &key).unwrap(), b"");

        drop(segment);
        Segment::destroy(&name).unwrap();
    }
}
