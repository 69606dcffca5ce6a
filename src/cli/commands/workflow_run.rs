//! `bdev workflow run`: execute a workflow with live step reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use console::style;

use crate::cli::output;
use crate::cli::{load_settings, unlock, vault_path, workflow_store, Cli};
use crate::config::Settings;
use crate::errors::{BdevError, Result};
use crate::vault::Vault;
use crate::workflow::{Engine, ShellExecutor, Workflow};

/// Execute the `workflow run` command.
///
/// The vault is only unlocked when the workflow references a secret or
/// `--secrets` is passed. A missing vault is a warning, not an error:
/// secret placeholders are then left untouched.
pub fn execute(cli: &Cli, name: &str, verbose: bool, with_secrets: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let workflow = workflow_store(cli, &settings).load(name)?;

    let shell = match &settings.shell {
        Some(program) => ShellExecutor::with_shell(program),
        None => ShellExecutor::new(),
    }
    .resolve()?;

    let mut engine = Engine::new(Arc::new(shell))
        .with_env(settings.env.clone())
        .with_secret_mode(settings.secret_mode());

    if with_secrets || workflow.references_secrets() {
        if let Some(vault) = unlocked_vault(cli, &settings)? {
            engine = engine.with_vault(Arc::new(vault));
        }
    }

    print_banner(&workflow);

    let counter = AtomicUsize::new(0);
    let engine = engine.on_step(move |step, result| {
        let number = counter.fetch_add(1, Ordering::Relaxed) + 1;
        output::print_step(number, step, result, verbose);
    });

    let result = engine.execute(&workflow);
    output::print_workflow_summary(&result);

    if result.success {
        Ok(())
    } else {
        Err(BdevError::WorkflowFailed(workflow.name))
    }
}

fn unlocked_vault(cli: &Cli, settings: &Settings) -> Result<Option<Vault>> {
    let vault = Vault::new(vault_path(cli, settings));
    if !vault.exists() {
        output::warning("Vault not initialized. Secrets will not be expanded.");
        return Ok(None);
    }

    unlock(&vault)?;
    output::success("Vault unlocked");
    println!();
    Ok(Some(vault))
}

fn print_banner(workflow: &Workflow) {
    output::heading(&format!("Running: {}", workflow.name));
    if !workflow.description.is_empty() {
        println!("{}", style(&workflow.description).dim());
    }
    println!();
}
