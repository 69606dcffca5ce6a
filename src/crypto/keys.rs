//! In-memory key holder.

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::{self, KEY_LEN};
use crate::errors::Result;

/// A 32-byte vault key that zeroes its memory when dropped.
///
/// The vault keeps one of these only while it is unlocked.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Run Argon2id over `password` and `salt` and wrap the result.
    ///
    /// The intermediate stack copy is wiped before returning.
    pub fn derive(password: &[u8], salt: &[u8]) -> Result<Self> {
        let mut raw = kdf::derive_key(password, salt)?;
        let key = Self::new(raw);
        raw.zeroize();
        Ok(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}
