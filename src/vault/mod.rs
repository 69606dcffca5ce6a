//! Vault module: encrypted secret storage.
//!
//! This module provides:
//! - The JSON vault record and atomic file writes (`format`)
//! - The lockable, thread-safe `Vault` (`store`)
//! - `SecretSource`, the read-only view the workflow engine depends on

pub mod format;
pub mod store;

use std::collections::HashMap;

use crate::errors::{BdevError, Result};

// Re-export the most commonly used items.
pub use format::VaultFile;
pub use store::Vault;

/// Read-only secret lookup.
///
/// The workflow engine only ever needs these two calls, so it depends on
/// this trait rather than on `Vault` itself.
pub trait SecretSource: Send + Sync {
    /// Look up one secret by name.
    fn get(&self, key: &str) -> Result<String>;

    /// Whether lookups can currently succeed.
    fn is_unlocked(&self) -> bool;
}

/// A plain map is an always-unlocked secret source.
impl SecretSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Result<String> {
        HashMap::get(self, key)
            .cloned()
            .ok_or_else(|| BdevError::SecretNotFound(key.to_string()))
    }

    fn is_unlocked(&self) -> bool {
        true
    }
}
