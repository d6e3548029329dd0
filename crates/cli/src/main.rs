// swissaddr CLI - registry vs. OpenStreetMap address comparison

mod compare;
mod exit_codes;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "swissaddr")]
#[command(about = "Compare official building registry addresses with OpenStreetMap")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a comparison from a TOML config file
    #[command(after_help = "\
Examples:
  swissaddr run compare.toml
  swissaddr run compare.toml --json
  swissaddr run compare.toml --output result.json
  swissaddr run compare.toml --municipality 261")]
    Run {
        /// Path to the comparison config file
        config: PathBuf,

        /// Output JSON to stdout instead of just the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override the official-flag trust threshold (0..1]
        #[arg(long)]
        limit: Option<f32>,

        /// Only process one municipality, by BFS number or name
        #[arg(long)]
        municipality: Option<String>,
    },

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  swissaddr validate compare.toml")]
    Validate {
        /// Path to the comparison config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            limit,
            municipality,
        } => compare::cmd_run(config, json, output, limit, municipality),
        Commands::Validate { config } => compare::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
