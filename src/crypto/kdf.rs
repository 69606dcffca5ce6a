//! Password-based key derivation using Argon2id.
//!
//! The vault file does not record KDF parameters, so they are fixed:
//! 1 pass, 64 MiB, 4 lanes, 32-byte output. Changing them makes every
//! existing vault unreadable.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::errors::{BdevError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Memory cost in KiB (64 MiB).
const MEMORY_KIB: u32 = 64 * 1024;

/// Number of passes over memory.
const ITERATIONS: u32 = 1;

/// Parallelism lanes.
const PARALLELISM: u32 = 4;

/// Derive a 32-byte key from a password and salt using Argon2id.
///
/// The same password + salt always produce the same key.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(KEY_LEN))
        .map_err(|e| BdevError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| BdevError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
