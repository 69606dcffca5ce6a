//! Cryptographic primitives for the bdev vault.
//!
//! This module provides:
//! - AES-256-GCM sealing and opening with a per-write nonce (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - A zeroize-on-drop key holder (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use encryption::{open, seal, Sealed, NONCE_LEN};
pub use kdf::{derive_key, generate_salt, KEY_LEN, SALT_LEN};
pub use keys::VaultKey;
