//! `bdev secrets get`: retrieve a single secret.

use console::style;
use zeroize::Zeroizing;

use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `secrets get` command.
///
/// The value is hidden unless `--show` is passed.
pub fn execute(cli: &Cli, key: &str, show: bool) -> Result<()> {
    let vault = open_vault(cli)?;
    let value = Zeroizing::new(vault.get(key)?);

    if show {
        println!("{}", value.as_str());
    } else {
        println!(
            "{} {}",
            style(format!("{key}:")).cyan(),
            style("[hidden, use --show to reveal]").dim()
        );
    }

    Ok(())
}
