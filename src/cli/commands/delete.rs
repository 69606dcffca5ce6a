//! `bdev secrets delete`: remove a secret from the vault.

use crate::cli::output;
use crate::cli::{confirm, open_vault, Cli};
use crate::errors::Result;

/// Execute the `secrets delete` command.
pub fn execute(cli: &Cli, key: &str, force: bool) -> Result<()> {
    if !confirm(&format!("Delete secret '{key}'?"), force)? {
        output::info("Cancelled.");
        return Ok(());
    }

    let vault = open_vault(cli)?;
    vault.delete(key)?;

    output::success(&format!("Secret deleted: {key}"));
    Ok(())
}
