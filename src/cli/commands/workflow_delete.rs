//! `bdev workflow delete`: remove a workflow file.

use crate::cli::output;
use crate::cli::{confirm, load_settings, workflow_store, Cli};
use crate::errors::Result;

/// Execute the `workflow delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let store = workflow_store(cli, &settings);

    // Fail on unknown names before asking anything.
    store.load(name)?;

    if !confirm(&format!("Delete workflow '{name}'?"), force)? {
        output::info("Cancelled.");
        return Ok(());
    }

    store.delete(name)?;
    output::success(&format!("Workflow deleted: {name}"));
    Ok(())
}
