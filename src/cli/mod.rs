mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use tool_extractor::InferencePolicy;

pub use commands::{extract, list};

#[derive(Parser)]
#[command(name = "tool-extractor")]
#[command(about = "Extract publicly reachable Python functions as tool records")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Extract tools into artifacts/tools.json
    tool-extractor extract --repo ./my-package

    # Write elsewhere, only inferring exports for packages with __all__
    tool-extractor extract --repo . --out build/tools.json --inference declared

    # Print records under one package without writing files
    tool-extractor list --repo . --module mypkg.io --format json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a repository and write tools.json plus a summary
    Extract {
        /// Repository root to scan
        #[arg(long)]
        repo: PathBuf,

        /// Output file for the JSON records
        #[arg(long, default_value = "artifacts/tools.json")]
        out: PathBuf,

        /// YAML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Which packages get inferred exports (overrides the settings file)
        #[arg(long, value_enum)]
        inference: Option<InferencePolicy>,

        /// Show a progress bar on stderr
        #[arg(long)]
        progress: bool,
    },

    /// Scan a repository and print records without writing artifacts
    List {
        /// Repository root to scan
        #[arg(long)]
        repo: PathBuf,

        /// Only records whose module equals or lies under this prefix
        #[arg(long)]
        module: Option<String>,

        /// YAML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
