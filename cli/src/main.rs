//! Tillbed command-line driver.
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

mod commands;
mod timeprinter;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use engine::EngineError;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

/// Subglacial till advection and bedform model
#[derive(Parser)]
#[command(name = "tillbed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Subglacial till advection and bedform model", long_about = None)]
struct Cli {
    /// Print per-grid summaries and simfile values
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation described by a simfile
    Run(commands::run::RunArgs),
    /// Check a simfile without running it
    Validate(commands::validate::ValidateArgs),
    /// Summarise an ASCII grid
    Summary(commands::summary::SummaryArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Summary(args) => commands::summary::execute(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            let code = e.downcast_ref::<EngineError>().map_or(1, EngineError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
