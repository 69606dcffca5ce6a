//! The password-protected secret store.
//!
//! `Vault` keeps the decrypted secret map and the derived key in memory
//! while unlocked and rewrites the whole encrypted file after every
//! mutation. All methods take `&self`; the state sits behind a
//! reader/writer lock so one vault can be shared (`Arc<Vault>`) between
//! the CLI and any number of concurrent readers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use zeroize::Zeroize;

use crate::crypto::encryption::{open, seal};
use crate::crypto::kdf::generate_salt;
use crate::crypto::keys::VaultKey;
use crate::errors::{BdevError, Result};

use super::format::{self, VaultFile};
use super::SecretSource;

/// Everything that only exists while the vault is unlocked.
#[derive(Default)]
struct VaultState {
    key: Option<VaultKey>,
    salt: Vec<u8>,
    secrets: HashMap<String, String>,
    unlocked: bool,
}

impl VaultState {
    /// Zero and drop the key and every secret value.
    fn wipe(&mut self) {
        self.key = None;
        for value in self.secrets.values_mut() {
            value.zeroize();
        }
        self.secrets.clear();
        self.salt.clear();
        self.unlocked = false;
    }

    fn require_unlocked(&self) -> Result<()> {
        if self.unlocked {
            Ok(())
        } else {
            Err(BdevError::VaultLocked)
        }
    }

    /// Serialize, encrypt with a fresh nonce and write the whole map.
    fn persist(&self, path: &Path) -> Result<()> {
        let key = self.key.as_ref().ok_or(BdevError::VaultLocked)?;

        let mut plaintext = serde_json::to_vec(&self.secrets)
            .map_err(|e| BdevError::SerializationError(format!("secrets: {e}")))?;
        let sealed = seal(key.as_bytes(), &plaintext);
        plaintext.zeroize();
        let sealed = sealed?;

        let record = VaultFile {
            salt: self.salt.clone(),
            nonce: sealed.nonce.to_vec(),
            ciphertext: sealed.ciphertext,
        };
        format::write_vault(path, &record)
    }
}

impl Drop for VaultState {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// An encrypted string-to-string secret map backed by one file.
pub struct Vault {
    path: PathBuf,
    state: RwLock<VaultState>,
}

impl Vault {
    /// A locked handle for the vault file at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(VaultState::default()),
        }
    }

    /// Path to the vault file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` if the vault file is present. Does not require unlocking.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initialize a new, empty vault protected by `password`.
    ///
    /// Does not check whether a file already exists; callers should ask
    /// `exists()` first. The vault is left unlocked. If the initial write
    /// fails the vault still counts as unlocked in memory and the I/O
    /// error is returned.
    pub fn create(&self, password: &str) -> Result<()> {
        let mut state = self.write();

        let salt = generate_salt();
        let key = VaultKey::derive(password.as_bytes(), &salt)?;

        state.wipe();
        state.key = Some(key);
        state.salt = salt.to_vec();
        state.unlocked = true;

        tracing::debug!(path = %self.path.display(), "creating vault");
        state.persist(&self.path)
    }

    /// Open the existing vault file with `password`.
    ///
    /// A wrong password and a tampered file produce the same
    /// `DecryptionFailed` error. On any failure the vault is locked.
    pub fn unlock(&self, password: &str) -> Result<()> {
        let mut state = self.write();
        state.wipe();

        let record = format::read_vault(&self.path)?;
        let key = VaultKey::derive(password.as_bytes(), &record.salt)?;

        let mut plaintext = open(key.as_bytes(), &record.nonce, &record.ciphertext)?;
        let parsed: std::result::Result<HashMap<String, String>, _> =
            serde_json::from_slice(&plaintext);
        plaintext.zeroize();
        let secrets = parsed.map_err(|_| BdevError::DecryptionFailed)?;

        state.key = Some(key);
        state.salt = record.salt;
        state.secrets = secrets;
        state.unlocked = true;

        tracing::debug!(path = %self.path.display(), "vault unlocked");
        Ok(())
    }

    /// Forget the key and every decrypted secret. Safe to call repeatedly.
    pub fn lock(&self) {
        self.write().wipe();
    }

    pub fn is_unlocked(&self) -> bool {
        self.read().unlocked
    }

    /// Re-key the vault under `new_password` with a fresh salt.
    pub fn change_password(&self, new_password: &str) -> Result<()> {
        let mut state = self.write();
        state.require_unlocked()?;

        let salt = generate_salt();
        let key = VaultKey::derive(new_password.as_bytes(), &salt)?;
        state.key = Some(key);
        state.salt = salt.to_vec();

        tracing::debug!(path = %self.path.display(), "vault password changed");
        state.persist(&self.path)
    }

    // ------------------------------------------------------------------
    // Secret operations
    // ------------------------------------------------------------------

    /// Insert or overwrite a secret, then rewrite the file.
    ///
    /// Does not return until the write has completed. A failed write
    /// keeps the new value in memory and returns the I/O error.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.write();
        state.require_unlocked()?;

        if let Some(mut old) = state.secrets.insert(key.to_string(), value.to_string()) {
            old.zeroize();
        }
        state.persist(&self.path)
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let state = self.read();
        state.require_unlocked()?;

        state
            .secrets
            .get(key)
            .cloned()
            .ok_or_else(|| BdevError::SecretNotFound(key.to_string()))
    }

    /// Remove a secret, then rewrite the file.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.write();
        state.require_unlocked()?;

        match state.secrets.remove(key) {
            Some(mut old) => old.zeroize(),
            None => return Err(BdevError::SecretNotFound(key.to_string())),
        }
        state.persist(&self.path)
    }

    /// Secret names in no particular order.
    pub fn list(&self) -> Result<Vec<String>> {
        let state = self.read();
        state.require_unlocked()?;
        Ok(state.secrets.keys().cloned().collect())
    }

    /// A copy of the whole secret map.
    pub fn export(&self) -> Result<HashMap<String, String>> {
        let state = self.read();
        state.require_unlocked()?;
        Ok(state.secrets.clone())
    }

    /// Merge `secrets` into the vault (incoming values win) and write once.
    pub fn import(&self, secrets: HashMap<String, String>) -> Result<()> {
        let mut state = self.write();
        state.require_unlocked()?;

        for (key, value) in secrets {
            if let Some(mut old) = state.secrets.insert(key, value) {
                old.zeroize();
            }
        }
        state.persist(&self.path)
    }

    /// Number of secrets held in memory (0 while locked).
    pub fn count(&self) -> usize {
        self.read().secrets.len()
    }

    // ------------------------------------------------------------------
    // Locking helpers
    // ------------------------------------------------------------------

    // A panic while holding the lock cannot leave a half-written map
    // behind (every mutation is a single insert/remove), so poisoning is
    // ignored.
    fn read(&self) -> RwLockReadGuard<'_, VaultState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VaultState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SecretSource for Vault {
    fn get(&self, key: &str) -> Result<String> {
        Vault::get(self, key)
    }

    fn is_unlocked(&self) -> bool {
        Vault::is_unlocked(self)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("path", &self.path)
            .field("unlocked", &self.is_unlocked())
            .finish_non_exhaustive()
    }
}
