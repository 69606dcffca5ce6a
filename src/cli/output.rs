//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use std::time::Duration;

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::workflow::{Step, StepResult, WorkflowResult};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a bold heading.
pub fn heading(msg: &str) {
    println!("{}", style(msg).bold());
}

/// Print secret names, one per row. Values are never shown here.
pub fn print_secrets_table(names: &[String]) {
    if names.is_empty() {
        info("No secrets stored.");
        tip("Run `bdev secrets set <KEY>` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name"]);
    for name in names {
        table.add_row(vec![name.as_str()]);
    }

    println!("{table}");
}

/// Print workflows as a Name / Description table.
///
/// `rows` carries `None` for workflows whose file failed to parse.
pub fn print_workflows_table(rows: &[(String, Option<String>)]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Description"]);
    for (name, description) in rows {
        let description = match description {
            Some(d) => d.clone(),
            None => style("(invalid)").red().to_string(),
        };
        table.add_row(vec![name.clone(), description]);
    }

    println!("{table}");
}

/// One progress line for a finished step: status glyph, number, name, duration.
pub fn print_step(number: usize, step: &Step, result: &StepResult, verbose: bool) {
    let status = if result.skipped {
        style("-").dim()
    } else if result.success {
        style("\u{2713}").green().bold()
    } else {
        style("\u{2717}").red().bold()
    };

    let detail = match (&result.error, result.skipped) {
        (_, true) => "skipped".to_string(),
        (Some(err), _) => format!("{}, {err}", round(result.duration)),
        (None, _) => round(result.duration),
    };

    println!(
        "{status} {number}. {} {}",
        step.name,
        style(format!("({detail})")).dim()
    );

    if verbose && !result.output.is_empty() {
        println!("{}", style(result.output.trim_end()).dim());
    }
}

/// Closing lines of a run.
pub fn print_workflow_summary(result: &WorkflowResult) {
    println!();
    if result.success {
        success("Workflow completed successfully");
    } else {
        error("Workflow failed");
    }
    println!("Total time: {}", style(round(result.duration)).dim());
}

fn round(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}
