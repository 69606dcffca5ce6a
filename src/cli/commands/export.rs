//! `bdev secrets export`: dump every secret as a JSON object.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use zeroize::Zeroize;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{BdevError, Result};

/// Execute the `secrets export` command.
pub fn execute(cli: &Cli, output_path: Option<&Path>) -> Result<()> {
    let vault = open_vault(cli)?;

    // Sorted for deterministic output.
    let sorted: BTreeMap<String, String> = vault.export()?.into_iter().collect();
    let count = sorted.len();
    let mut content = format_as_json(&sorted)?;
    drop_values(sorted);

    match output_path {
        Some(dest) => {
            // Refuse to clobber the vault itself.
            if dest == vault.path() {
                content.zeroize();
                return Err(BdevError::CommandFailed(
                    "refusing to export over the vault file".into(),
                ));
            }

            let written = write_private(dest, &content);
            content.zeroize();
            written?;

            output::success(&format!("Exported {count} secrets to {}", dest.display()));
            output::warning("The export file is plaintext. Delete it when done.");
        }
        None => {
            println!("{content}");
            content.zeroize();
        }
    }

    Ok(())
}

fn format_as_json(secrets: &BTreeMap<String, String>) -> Result<String> {
    serde_json::to_string_pretty(secrets)
        .map_err(|e| BdevError::SerializationError(format!("JSON export: {e}")))
}

fn drop_values(secrets: BTreeMap<String, String>) {
    for (_, mut value) in secrets {
        value.zeroize();
    }
}

/// Write `content` readable by the owner only.
fn write_private(dest: &Path, content: &str) -> Result<()> {
    fs::write(dest, content)
        .map_err(|e| BdevError::CommandFailed(format!("failed to write export file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_sorted_and_parseable() {
        let mut secrets = BTreeMap::new();
        secrets.insert("ZED".to_string(), "last".to_string());
        secrets.insert("ALPHA".to_string(), "first".to_string());

        let out = format_as_json(&secrets).unwrap();
        assert!(out.find("ALPHA").unwrap() < out.find("ZED").unwrap());

        let parsed: BTreeMap<String, String> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, secrets);
    }
}
