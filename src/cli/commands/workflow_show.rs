//! `bdev workflow show`: print a workflow's steps and hooks.

use console::style;

use crate::cli::output;
use crate::cli::{load_settings, workflow_store, Cli};
use crate::errors::Result;
use crate::workflow::Step;

/// Execute the `workflow show` command.
///
/// Commands are printed unexpanded, so no secret is ever shown.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let settings = load_settings(cli)?;
    let workflow = workflow_store(cli, &settings).load(name)?;

    output::heading(&workflow.name);
    if !workflow.description.is_empty() {
        println!("{}", style(&workflow.description).dim());
    }

    if !workflow.env.is_empty() {
        println!();
        output::heading("Env:");
        for (key, value) in &workflow.env {
            println!("  {key}={}", style(value).dim());
        }
    }

    println!();
    output::heading("Steps:");
    for (i, step) in workflow.steps.iter().enumerate() {
        println!("  {}. {}{}", i + 1, style(&step.name).cyan(), annotations(step));
        println!("     {}", style(&step.run).dim());
    }

    for (title, hooks) in [
        ("On Success:", &workflow.on_success),
        ("On Failure:", &workflow.on_failure),
    ] {
        if hooks.is_empty() {
            continue;
        }
        println!();
        output::heading(title);
        for step in hooks {
            println!("  - {}{}", step.name, annotations(step));
        }
    }

    Ok(())
}

fn annotations(step: &Step) -> String {
    let mut notes = Vec::new();
    if let Some(condition) = &step.condition {
        notes.push(format!("if {condition}"));
    }
    if let Some(timeout) = &step.timeout {
        notes.push(format!("timeout {timeout}"));
    }
    if step.continue_on_error {
        notes.push("continue on error".to_string());
    }

    if notes.is_empty() {
        String::new()
    } else {
        format!(" {}", style(format!("[{}]", notes.join(", "))).dim())
    }
}
