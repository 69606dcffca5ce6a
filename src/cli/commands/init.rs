//! `bdev secrets init`: create a new encrypted vault.

use crate::cli::output;
use crate::cli::{load_settings, prompt_new_password, vault_path, Cli};
use crate::errors::{BdevError, Result};
use crate::vault::Vault;

/// Execute the `secrets init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let vault = Vault::new(vault_path(cli, &settings));

    if vault.exists() {
        output::tip("Use `bdev secrets set` to add secrets to the existing vault.");
        return Err(BdevError::VaultAlreadyExists(vault.path().to_path_buf()));
    }

    let password = prompt_new_password()?;
    vault.create(&password)?;
    vault.lock();

    output::success(&format!("Vault created at {}", vault.path().display()));
    output::tip("Store your master password safely. It cannot be recovered!");
    output::tip("Run `bdev secrets set <KEY>` to add a secret.");

    Ok(())
}
