//! freetime CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use freetime_core::{TracingConfig, init_tracing};

use freetime_client::cli::{Cli, Command};
use freetime_client::commands;
use freetime_client::config::AppConfig;
use freetime_client::error::{ClientError, ClientResult};
use freetime_client::paths::AppPaths;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    }
    .with_format(cli.log_format.into());
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_retryable() {
                eprintln!("This failure may be temporary, try again later.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let paths = AppPaths::new(cli.home.as_deref());

    match cli.command {
        Some(Command::Auth(args)) => {
            let config = AppConfig::load(&paths)?.with_overrides(&args.overrides());
            commands::auth::run(&paths, &config, &args).await
        }
        Some(Command::Analyze(args)) => {
            let config = AppConfig::load(&paths)?.with_overrides(&args.overrides());
            commands::analyze::run(&paths, &config, &args).await
        }
        Some(Command::Config(args)) => commands::config::run(&paths, &args),
        None => Err(ClientError::Config(
            "no command specified. Use 'auth', 'analyze', or 'config'. \
             Run with --help for more information."
                .to_string(),
        )),
    }
}
