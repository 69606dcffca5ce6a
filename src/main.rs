use clap::Parser;
use tracing_subscriber::EnvFilter;

use bdev::cli::commands;
use bdev::cli::{Cli, Commands, SecretsAction, WorkflowAction};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match cli.command {
        Commands::Secrets { ref action } => match action {
            SecretsAction::Init => commands::init::execute(&cli),
            SecretsAction::Set { key, value } => commands::set::execute(&cli, key, value.as_deref()),
            SecretsAction::Get { key, show } => commands::get::execute(&cli, key, *show),
            SecretsAction::List => commands::list::execute(&cli),
            SecretsAction::Delete { key, force } => commands::delete::execute(&cli, key, *force),
            SecretsAction::Export { output } => commands::export::execute(&cli, output.as_deref()),
            SecretsAction::Import { file } => commands::import_cmd::execute(&cli, file),
            SecretsAction::Lock => commands::lock::execute(&cli),
            SecretsAction::Passwd => commands::passwd::execute(&cli),
        },
        Commands::Workflow { ref action } => match action {
            WorkflowAction::List => commands::workflow_list::execute(&cli),
            WorkflowAction::Show { name } => commands::workflow_show::execute(&cli, name),
            WorkflowAction::Run {
                name,
                verbose,
                secrets,
            } => commands::workflow_run::execute(&cli, name, *verbose, *secrets),
            WorkflowAction::New {
                name,
                description,
                force,
            } => commands::workflow_new::execute(&cli, name, description.as_deref(), *force),
            WorkflowAction::Delete { name, force } => {
                commands::workflow_delete::execute(&cli, name, *force)
            }
        },
        Commands::Completions { shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        bdev::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Logs go to stderr so they never mix with command output.
/// `RUST_LOG` wins; otherwise `--debug` selects debug, else warn.
fn init_logging(debug: bool) {
    let default = if debug { "bdev=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
