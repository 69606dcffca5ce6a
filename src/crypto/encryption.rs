//! AES-256-GCM authenticated encryption.
//!
//! Every call to `seal` generates a fresh random 12-byte nonce and hands
//! it back next to the ciphertext, so the vault file can store the two as
//! separate fields. No associated data is used.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{BdevError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Output of `seal`: the nonce used and the ciphertext with its 16-byte tag.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a 32-byte `key` with a fresh random nonce.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| BdevError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| BdevError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&nonce);

    Ok(Sealed {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt and authenticate `ciphertext` produced by `seal`.
///
/// Every failure (bad nonce length, bad key, tag mismatch) collapses into
/// `DecryptionFailed`.
pub fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(BdevError::DecryptionFailed);
    }
    let nonce = Nonce::from_slice(nonce);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| BdevError::DecryptionFailed)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| BdevError::DecryptionFailed)
}
