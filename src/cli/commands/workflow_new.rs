//! `bdev workflow new`: write a starter workflow file.

use crate::cli::output;
use crate::cli::{load_settings, workflow_store, Cli};
use crate::errors::{BdevError, Result};
use crate::workflow::{Step, Workflow};

/// Execute the `workflow new` command.
pub fn execute(cli: &Cli, name: &str, description: Option<&str>, force: bool) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(BdevError::InvalidWorkflow(format!(
            "'{name}' is not a valid workflow name"
        )));
    }

    let settings = load_settings(cli)?;
    let store = workflow_store(cli, &settings);

    if !force && store.list()?.iter().any(|existing| existing == name) {
        return Err(BdevError::InvalidWorkflow(format!(
            "workflow '{name}' already exists (use --force to overwrite)"
        )));
    }

    store.save(&starter(name, description))?;

    output::success(&format!(
        "Created {}",
        store.dir().join(format!("{name}.yaml")).display()
    ));
    output::tip(&format!("Run it with `bdev workflow run {name}`."));
    Ok(())
}

fn starter(name: &str, description: Option<&str>) -> Workflow {
    Workflow {
        name: name.to_string(),
        description: description.unwrap_or_default().to_string(),
        steps: vec![Step::new("Hello", "echo \"hello from $USER\"")],
        ..Workflow::default()
    }
}
