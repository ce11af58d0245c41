//! `specsync sync` and `specsync watch`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use specsync_daemon::{start_blocking, RunMode, RunSummary, WatchReport};
use specsync_sync::{
    CommandConverter, Converter, DocumentSource, HttpConverter, PassOutcome, SyncContext,
};

use super::provider::{provide, SetupArgs};
use super::GlobalArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Once,
    Watch,
}

/// Arguments for `specsync sync` / `specsync watch`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub setup: SetupArgs,

    #[command(flatten)]
    pub converter: ConverterArgs,
}

/// Where the OpenAPI → collection conversion runs.
#[derive(Args, Debug, Clone)]
pub struct ConverterArgs {
    /// Program that reads a conversion request on stdin and writes the
    /// result to stdout.
    #[arg(long, env = "SPECSYNC_CONVERTER_CMD", conflicts_with = "converter_url")]
    pub converter_cmd: Option<String>,

    /// Extra argument for `--converter-cmd` (repeatable).
    #[arg(long = "converter-arg", allow_hyphen_values = true)]
    pub converter_args: Vec<String>,

    /// HTTP endpoint accepting conversion requests.
    #[arg(long, env = "SPECSYNC_CONVERTER_URL")]
    pub converter_url: Option<String>,
}

impl ConverterArgs {
    pub fn build(&self) -> Result<Box<dyn Converter>> {
        match (&self.converter_cmd, &self.converter_url) {
            (Some(program), None) => Ok(Box::new(CommandConverter::new(
                program,
                self.converter_args.clone(),
            ))),
            (None, Some(url)) => Ok(Box::new(HttpConverter::new(url.clone()))),
            (Some(_), Some(_)) => bail!("use either --converter-cmd or --converter-url, not both"),
            (None, None) => bail!(
                "no conversion service configured; pass --converter-cmd or --converter-url"
            ),
        }
    }
}

impl RunArgs {
    pub fn run(self, global: &GlobalArgs, kind: RunKind) -> Result<()> {
        let state_dir = global.state_dir()?;
        let converter = self.converter.build()?;
        let (config, store) = provide(&self.setup, global, &state_dir)?;

        let mode = match kind {
            RunKind::Once => RunMode::Once,
            RunKind::Watch => {
                println!(
                    "Watching {} every {}s (ctrl-c to stop)",
                    config.source_url.bold(),
                    config.poll_interval_seconds
                );
                RunMode::Watch {
                    period: Duration::from_secs(config.poll_interval_seconds),
                }
            }
        };

        let source = DocumentSource::http(config.source_url.clone());
        let context = SyncContext::new(config, &state_dir, source, store, converter);
        match start_blocking(context, mode).context("sync failed")? {
            RunSummary::Once(outcome) => print_outcome(&outcome),
            RunSummary::Watch(report) => print_report(&report),
        }
        Ok(())
    }
}

fn print_outcome(outcome: &PassOutcome) {
    match outcome {
        PassOutcome::Unchanged { .. } => {
            println!("{} no changes detected ({outcome})", "✓".green());
        }
        PassOutcome::Created { .. } => println!("{} {outcome}", "✓".green()),
        PassOutcome::Updated { delta, .. } => {
            println!("{} {outcome}", "✓".green());
            if let Some(delta) = delta {
                for line in delta.lines() {
                    println!("  {line}");
                }
            }
        }
    }
}

fn print_report(report: &WatchReport) {
    let failures = if report.failures > 0 {
        report.failures.to_string().red().to_string()
    } else {
        report.failures.to_string()
    };
    println!(
        "Stopped after {} passes ({} published, {} failed)",
        report.passes, report.published, failures
    );
}
