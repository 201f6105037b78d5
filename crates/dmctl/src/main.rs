use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dmctl::cmd_load::{self, Output};
use dmctl::cmd_schema;
use dmctl::common::DEFAULT_ROWS;

#[derive(Parser, Debug)]
#[command(name = "dmctl", version, about = "VSCP decision matrix CLI")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long)]
    json: bool,
    /// Dump loaded rows in register layout
    #[arg(long)]
    hex: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Load a standard decision matrix document
    Std {
        file: PathBuf,
        /// Table capacity in rows
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,
    },
    /// Load an extended decision matrix document
    Ext {
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,
    },
    /// Print the standard dialect schema
    Schema,
}

fn main() -> Result<()> {
    let Cli {
        verbose,
        json,
        hex,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = Output { json, hex };
    match cmd {
        Cmd::Std { file, rows } => cmd_load::run_std(&file, rows, output)?,
        Cmd::Ext { file, rows } => cmd_load::run_ext(&file, rows, output)?,
        Cmd::Schema => cmd_schema::run(json)?,
    };

    Ok(())
}
