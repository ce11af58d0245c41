pub mod config;
pub mod provider;
pub mod run;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use specsync_core::{persistence, StoreCredential};
use specsync_sync::{store::DEFAULT_STORE_URL, ArtifactStore, PostmanClient};

/// Flags shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding `.specsync.json` and `.specsync-state.json`
    /// [default: current directory].
    #[arg(long, global = true, env = "SPECSYNC_DIR")]
    pub dir: Option<PathBuf>,

    /// Base URL of the Postman API.
    #[arg(long, global = true, env = "SPECSYNC_STORE_URL", default_value = DEFAULT_STORE_URL)]
    pub store_url: String,

    /// Emit diagnostics as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl GlobalArgs {
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => persistence::working_dir().context("could not determine working directory"),
        }
    }

    pub fn connect(&self, credential: &StoreCredential) -> Box<dyn ArtifactStore> {
        Box::new(PostmanClient::with_base_url(
            self.store_url.clone(),
            credential.clone(),
        ))
    }
}
