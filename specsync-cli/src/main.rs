//! specsync: keep a Postman collection in step with an OpenAPI document.
//!
//! # Usage
//!
//! ```text
//! specsync config [--source-url <url>] [--api-key <key>] [--collection <id>] [--interval <secs>]
//! specsync sync   [setup flags] (--converter-cmd <prog> | --converter-url <url>)
//! specsync watch  [setup flags] (--converter-cmd <prog> | --converter-url <url>)
//! specsync status [--json]
//! ```
//!
//! Global: `--dir <path>` (state directory), `--store-url <url>`, `--log-json`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigArgs,
    run::{RunArgs, RunKind},
    status::StatusArgs,
    GlobalArgs,
};
use specsync_daemon::{init_tracing, LogFormat};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "specsync",
    version,
    about = "Publish an OpenAPI document as a Postman collection and keep it current",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or update the saved configuration.
    Config(ConfigArgs),

    /// Run a single sync pass.
    Sync(RunArgs),

    /// Sync now, then poll at the configured interval until ctrl-c.
    Watch(RunArgs),

    /// Show the saved configuration and the last published fingerprint.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.global.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    match cli.command {
        Commands::Config(args) => args.run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global, RunKind::Once),
        Commands::Watch(args) => args.run(&cli.global, RunKind::Watch),
        Commands::Status(args) => args.run(&cli.global),
    }
}
