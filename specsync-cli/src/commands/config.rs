//! `specsync config`: run setup and save, without syncing.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use specsync_core::persistence;

use super::provider::{provide, SetupArgs};
use super::GlobalArgs;

/// Arguments for `specsync config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub setup: SetupArgs,
}

impl ConfigArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let state_dir = global.state_dir()?;
        let (config, _store) = provide(&self.setup, global, &state_dir)?;

        println!(
            "{} configuration saved to {}",
            "✓".green(),
            persistence::config_path_at(&state_dir).display()
        );
        println!("  source:     {}", config.source_url);
        match &config.remote_artifact_id {
            Some(id) => println!("  collection: {id}"),
            None => println!("  collection: (created on first sync)"),
        }
        println!("  interval:   {}s", config.poll_interval_seconds);
        Ok(())
    }
}
