//! Argument parsing and dispatch.
//!
//! `duality [FILE]` runs a program (stdin when FILE is omitted) and
//! prints the `Core:`, `Checked Core:` and `Result:` sections;
//! `duality --server` speaks the Language Server Protocol on stdio.

use std::error::Error;
use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use crate::run::run_source;

/// Command-line interface for the duality driver.
#[derive(Parser)]
#[command(name = "duality")]
#[command(about = "The duality language driver", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Source file to run; reads stdin when omitted.
    pub file: Option<PathBuf>,

    /// Speak the Language Server Protocol on stdio instead of running a
    /// program.
    #[arg(long)]
    pub server: bool,
}

/// Parses arguments and runs the requested mode.
pub fn run_cli() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.server {
        log::info!("starting LSP server on stdio");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(duality_lsp::run_stdio());
        return Ok(());
    }

    let source = match &cli.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    run_source(&source)
}
