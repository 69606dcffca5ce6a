use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{BdevError, Result};
use crate::workflow::SecretMode;

/// User-level configuration, loaded from `<bdev home>/config.toml`.
///
/// Every field has a default so bdev works without any config file.
/// Relative paths are resolved against the bdev home directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Encrypted vault file (default: `<home>/vault.enc`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_file: Option<PathBuf>,

    /// Directory holding `*.yaml` workflows (default: `<home>/workflows`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_dir: Option<PathBuf>,

    /// Hand secrets to steps through environment variables instead of
    /// splicing them into the command line.
    #[serde(default)]
    pub secrets_via_env: bool,

    /// Shell used for workflow steps (default: `sh`, or `powershell` on Windows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Environment shared by every workflow run.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(skip)]
    home: PathBuf,
}

impl Settings {
    /// Name of the config file inside the bdev home.
    pub const FILE_NAME: &'static str = "config.toml";

    /// The bdev home: `$BDEV_HOME`, else `~/Dev/.bdev`.
    pub fn default_home() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os("BDEV_HOME").filter(|h| !h.is_empty()) {
            return Ok(PathBuf::from(home));
        }
        dirs::home_dir()
            .map(|h| h.join("Dev").join(".bdev"))
            .ok_or_else(|| BdevError::ConfigError("cannot determine home directory".into()))
    }

    /// Load settings from `config` if given, else from the default home.
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let home = Self::default_home()?;
        let path = config.map_or_else(|| home.join(Self::FILE_NAME), Path::to_path_buf);
        Self::load_from(&path, &home)
    }

    /// Load settings from `path`, resolving relative paths against `home`.
    ///
    /// A missing file yields defaults; a file that cannot be parsed is an error.
    pub fn load_from(path: &Path, home: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<Settings>(&contents).map_err(|e| {
                BdevError::ConfigError(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Settings::default()
        };
        settings.home = home.to_path_buf();
        Ok(settings)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn vault_path(&self) -> PathBuf {
        self.resolve(self.vault_file.as_deref(), "vault.enc")
    }

    pub fn workflow_path(&self) -> PathBuf {
        self.resolve(self.workflow_dir.as_deref(), "workflows")
    }

    pub fn secret_mode(&self) -> SecretMode {
        if self.secrets_via_env {
            SecretMode::Environment
        } else {
            SecretMode::Inline
        }
    }

    fn resolve(&self, configured: Option<&Path>, default: &str) -> PathBuf {
        match configured {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.home.join(p),
            None => self.home.join(default),
        }
    }
}
