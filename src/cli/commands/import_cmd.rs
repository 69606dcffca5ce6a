//! `bdev secrets import`: merge a JSON object of secrets into the vault.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{BdevError, Result};

/// Execute the `secrets import` command.
pub fn execute(cli: &Cli, source: &Path) -> Result<()> {
    if !source.exists() {
        return Err(BdevError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    let secrets = parse_json_file(source)?;
    if secrets.is_empty() {
        output::warning("No secrets found in the import file.");
        return Ok(());
    }

    let vault = open_vault(cli)?;

    let mut names: Vec<&String> = secrets.keys().collect();
    names.sort();
    for name in names {
        output::info(&format!("  + {name}"));
    }

    let count = secrets.len();
    vault.import(secrets)?;

    output::success(&format!(
        "Imported {count} secrets from {}",
        source.display()
    ));
    Ok(())
}

/// Parse a JSON object into a key-value map.
///
/// Strings are taken as-is; numbers and booleans are stringified.
fn parse_json_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| BdevError::CommandFailed(format!("failed to read file: {e}")))?;

    let map: HashMap<String, serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| BdevError::CommandFailed(format!("invalid JSON: {e}")))?;

    map.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(BdevError::CommandFailed(format!(
                        "value for '{key}' must be a string, got {other}"
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}
