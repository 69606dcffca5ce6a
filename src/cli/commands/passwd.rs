//! `bdev secrets passwd`: change the vault master password.
//!
//! The vault is unlocked with the current password, a new salt is drawn,
//! the key is re-derived from the new password and the file is rewritten
//! atomically.

use crate::cli::output;
use crate::cli::{open_vault, prompt_new_password, Cli};
use crate::errors::Result;

/// Execute the `secrets passwd` command.
pub fn execute(cli: &Cli) -> Result<()> {
    output::info("Enter your current master password.");
    let vault = open_vault(cli)?;

    output::info("Choose your new master password.");
    let new_password = prompt_new_password()?;
    vault.change_password(&new_password)?;

    let count = vault.count();
    vault.lock();

    output::success(&format!(
        "Master password changed ({count} secrets re-encrypted)"
    ));
    Ok(())
}
