// Entrypoint for the CLI application.
// - Keeps `main` small: validate options, build the API client and hand
//   both to the registrar.
// - Every fatal condition ends with exit code 1.

use bulk_register::{registrar, ApiClient, Cli, Console, RunStatus};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Diagnostics only; controlled by RUST_LOG, quiet by default.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let config = match cli.validate() {
        Ok(config) => config,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}", error);
            }
            eprintln!("{}", Cli::command().render_help());
            return ExitCode::FAILURE;
        }
    };

    let api = match ApiClient::from_config(&config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut console = Console::stdio();
    match registrar::run(&config, &api, &mut console) {
        Ok(report) if report.status == RunStatus::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
