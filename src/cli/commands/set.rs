//! `bdev secrets set`: add or update a secret in the vault.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{BdevError, Result};

/// Execute the `secrets set` command.
pub fn execute(cli: &Cli, key: &str, value: Option<&str>) -> Result<()> {
    if key.trim().is_empty() {
        return Err(BdevError::CommandFailed("secret name cannot be empty".into()));
    }

    let vault = open_vault(cli)?;

    // Inline argument, then piped stdin, then a hidden prompt.
    let secret_value = if let Some(v) = value {
        output::warning("Value provided on command line. It may appear in shell history.");
        Zeroizing::new(v.to_string())
    } else if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        Zeroizing::new(buf.trim_end().to_string())
    } else {
        let v = dialoguer::Password::new()
            .with_prompt(format!("Enter value for {key}"))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| BdevError::CommandFailed(format!("input prompt: {e}")))?;
        Zeroizing::new(v)
    };

    let existed = vault.get(key).is_ok();
    vault.set(key, &secret_value)?;

    let verb = if existed { "updated" } else { "stored" };
    output::success(&format!(
        "Secret '{key}' {verb} ({} total)",
        vault.count()
    ));

    Ok(())
}
