use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors that can occur in bdev.
#[derive(Debug, Error)]
pub enum BdevError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Deliberately generic: a wrong password and a tampered file look the same.
    #[error("wrong password or corrupted vault")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("vault is locked")]
    VaultLocked,

    #[error("Vault not found at {0} (run `bdev secrets init`)")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    // --- Workflow errors ---
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("shell not found: {0}")]
    ShellNotFound(String),

    #[error("Workflow '{0}' failed")]
    WorkflowFailed(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Why a single workflow step did not succeed.
///
/// Step failures are data, not control flow: they are stored on the
/// step's result and never returned from `Engine::execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("exit status {0}")]
    Exit(i32),

    #[error("terminated by signal")]
    Signal,

    #[error("failed to start: {0}")]
    Spawn(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("invalid timeout '{0}'")]
    InvalidTimeout(String),
}

/// Convenience type alias for bdev results.
pub type Result<T> = std::result::Result<T, BdevError>;
