//! `bdev workflow list`: show the workflows in the workflow directory.

use crate::cli::output;
use crate::cli::{load_settings, workflow_store, Cli};
use crate::errors::Result;

/// Execute the `workflow list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let store = workflow_store(cli, &settings);

    let names = store.list()?;
    if names.is_empty() {
        output::info("No workflows found.");
        output::tip(&format!("Create workflows in: {}", store.dir().display()));
        return Ok(());
    }

    // A broken file is listed as invalid rather than failing the listing.
    let rows: Vec<(String, Option<String>)> = names
        .into_iter()
        .map(|name| {
            let description = store.load(&name).ok().map(|wf| {
                if wf.description.is_empty() {
                    format!("{} steps", wf.steps.len())
                } else {
                    wf.description
                }
            });
            (name, description)
        })
        .collect();

    output::heading(&format!("Workflows ({})", rows.len()));
    output::print_workflows_table(&rows);
    Ok(())
}
