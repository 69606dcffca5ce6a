//! `bdev secrets list`: show secret names.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `secrets list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;

    let mut names = vault.list()?;
    names.sort();

    if !names.is_empty() {
        output::heading(&format!("Secrets ({})", names.len()));
    }
    output::print_secrets_table(&names);

    Ok(())
}
