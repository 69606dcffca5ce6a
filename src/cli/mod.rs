//! CLI module: Clap argument parser, output helpers and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{BdevError, Result};
use crate::vault::Vault;
use crate::workflow::WorkflowStore;

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable that supplies the vault password non-interactively.
pub const PASSWORD_ENV: &str = "BDEV_PASSWORD";

/// bdev: encrypted secrets and YAML workflows for your workstation.
#[derive(Parser)]
#[command(
    name = "bdev",
    about = "Developer toolkit: encrypted secrets vault and workflow runner",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <bdev home>/config.toml)
    #[arg(long, global = true, env = "BDEV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vault file (overrides the config file)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Workflow directory (overrides the config file)
    #[arg(long, global = true)]
    pub workflow_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Manage encrypted secrets
    #[command(alias = "s")]
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },

    /// Run automation workflows
    #[command(alias = "wf")]
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Secrets subcommands.
#[derive(clap::Subcommand)]
pub enum SecretsAction {
    /// Create a new encrypted vault
    Init,

    /// Store a secret (add or update)
    Set {
        /// Secret name (e.g. GITHUB_TOKEN)
        key: String,
        /// Secret value (omit for interactive prompt)
        value: Option<String>,
    },

    /// Retrieve a secret
    Get {
        /// Secret name
        key: String,
        /// Print the value instead of hiding it
        #[arg(long)]
        show: bool,
    },

    /// List all stored secrets
    List,

    /// Delete a secret
    Delete {
        /// Secret name
        key: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Export secrets as JSON
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import secrets from a JSON file
    Import {
        /// Path to a JSON object of KEY: value pairs
        file: PathBuf,
    },

    /// Wipe decrypted secrets held by this process
    ///
    /// Every bdev command unlocks the vault for its own run only, so there
    /// is no long-lived unlocked session for this to end.
    Lock,

    /// Change the vault's master password
    Passwd,
}

/// Workflow subcommands.
#[derive(clap::Subcommand)]
pub enum WorkflowAction {
    /// List available workflows
    List,

    /// Show workflow details
    Show {
        /// Workflow name
        name: String,
    },

    /// Execute a workflow
    Run {
        /// Workflow name
        name: String,
        /// Show step output
        #[arg(short, long)]
        verbose: bool,
        /// Unlock the vault even if no step references a secret
        #[arg(long)]
        secrets: bool,
    },

    /// Create a starter workflow file
    New {
        /// Workflow name (file name without extension)
        name: String,
        /// One-line description
        #[arg(short, long)]
        description: Option<String>,
        /// Overwrite an existing workflow
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a workflow file
    Delete {
        /// Workflow name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load settings from `--config` or the bdev home.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::load(cli.config.as_deref())
}

/// Vault file from `--vault`, else from the settings.
pub fn vault_path(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.vault.clone().unwrap_or_else(|| settings.vault_path())
}

/// Workflow store from `--workflow-dir`, else from the settings.
pub fn workflow_store(cli: &Cli, settings: &Settings) -> WorkflowStore {
    WorkflowStore::new(
        cli.workflow_dir
            .clone()
            .unwrap_or_else(|| settings.workflow_path()),
    )
}

/// Open the configured vault and unlock it, prompting for the password.
pub fn open_vault(cli: &Cli) -> Result<Vault> {
    let settings = load_settings(cli)?;
    let vault = Vault::new(vault_path(cli, &settings));
    if !vault.exists() {
        return Err(BdevError::VaultNotFound(vault.path().to_path_buf()));
    }
    unlock(&vault)?;
    Ok(vault)
}

/// Unlock `vault` with a password from `BDEV_PASSWORD` or the terminal.
pub fn unlock(vault: &Vault) -> Result<()> {
    let password = prompt_password()?;
    vault.unlock(&password)
}

/// Get the vault password, trying in order:
/// 1. `BDEV_PASSWORD` env var (scripts, CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter master password")
        .interact()
        .map_err(|e| BdevError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used by `init` and `passwd`).
///
/// Also respects `BDEV_PASSWORD` for scripted usage.
/// Enforces a minimum password length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        check_password_len(&pw)?;
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose master password")
            .with_confirmation("Confirm master password", "Passwords do not match, try again")
            .interact()
            .map_err(|e| BdevError::CommandFailed(format!("password prompt: {e}")))?;

        if check_password_len(&password).is_err() {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Yes/no confirmation; `force` answers yes without asking.
pub fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| BdevError::CommandFailed(format!("confirm prompt: {e}")))
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

fn check_password_len(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BdevError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
