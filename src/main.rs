mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

use tool_extractor::ExtractorError;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_extractor=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            repo,
            out,
            config,
            inference,
            progress,
        } => cli::extract(&repo, &out, config.as_deref(), inference, progress),
        Commands::List {
            repo,
            module,
            config,
            format,
        } => cli::list(&repo, module.as_deref(), config.as_deref(), format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<ExtractorError>()
                .map(ExtractorError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
