//! On-disk vault record and atomic persistence.
//!
//! A vault file is a single JSON object:
//!
//! ```text
//! { "salt": "<base64>", "nonce": "<base64>", "data": "<base64>" }
//! ```
//!
//! - **salt**: 32 random bytes fed to Argon2id, fixed for the vault's life.
//! - **nonce**: 12-byte AES-GCM nonce, regenerated on every write.
//! - **data**: AES-256-GCM ciphertext (with tag) of the JSON secret map.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{BdevError, Result};

/// The three-field record stored in the vault file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultFile {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub nonce: Vec<u8>,

    /// Ciphertext of the secret map.
    #[serde(
        rename = "data",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub ciphertext: Vec<u8>,
}

/// Read and parse a vault file.
///
/// A missing file is `VaultNotFound`; anything that is not the
/// three-field record is `InvalidVaultFormat`.
pub fn read_vault(path: &Path) -> Result<VaultFile> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BdevError::VaultNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&data).map_err(|e| BdevError::InvalidVaultFormat(e.to_string()))
}

/// Write a vault file to disk **atomically** with owner-only permissions.
///
/// 1. Create the parent directory (0700 on Unix) if needed.
/// 2. Write the JSON to a temp file next to the target.
/// 3. Restrict the temp file to 0600.
/// 4. Rename it over the target path.
pub fn write_vault(path: &Path, record: &VaultFile) -> Result<()> {
    let buf = serde_json::to_vec(record)
        .map_err(|e| BdevError::SerializationError(format!("vault record: {e}")))?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    create_private_dir(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, &buf)?;
    restrict_permissions(&tmp_path)?;
    fs::rename(&tmp_path, path)?;

    Ok(())
}

fn create_private_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)?;
    }

    #[cfg(not(unix))]
    fs::create_dir_all(dir)?;

    Ok(())
}

fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
