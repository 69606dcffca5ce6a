//! `bdev secrets lock`: drop the key and every decrypted secret.
//!
//! Each bdev invocation unlocks for its own lifetime only, so this never
//! needs a password.

use crate::cli::output;
use crate::cli::{load_settings, vault_path, Cli};
use crate::errors::Result;
use crate::vault::Vault;

/// Execute the `secrets lock` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let vault = Vault::new(vault_path(cli, &settings));
    vault.lock();

    output::success("Vault locked");
    output::tip("bdev never keeps the vault unlocked between commands");
    Ok(())
}
