//! Configuration providers: command-line flags or interactive prompts.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::{Confirm, Input, Password, Select};

use specsync_core::{
    config::{validate_poll_interval, validate_source_url},
    ArtifactId, ConfigAnswers, StoreCredential, SyncConfig, DEFAULT_POLL_INTERVAL_SECS,
};
use specsync_sync::{list_collections, provide_config, ArtifactStore, ConfigProvider};

use super::GlobalArgs;

/// Setup flags accepted by `config`, `sync` and `watch`.
#[derive(Args, Debug, Clone, Default)]
pub struct SetupArgs {
    /// URL of the OpenAPI/Swagger JSON document.
    #[arg(long, env = "SPECSYNC_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Postman API key.
    #[arg(long, env = "POSTMAN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Collection id to update; an empty value creates a new collection.
    #[arg(long)]
    pub collection: Option<String>,

    /// Polling period in seconds (minimum 10).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Never prompt; use flags and the saved configuration only.
    #[arg(long)]
    pub no_input: bool,
}

impl SetupArgs {
    fn answers(&self) -> ConfigAnswers {
        ConfigAnswers {
            source_url: self.source_url.clone(),
            store_credential: self.api_key.clone(),
            remote_artifact_id: self.collection.clone(),
            poll_interval_seconds: self.interval,
        }
    }

    fn interactive(&self) -> bool {
        !self.no_input
            && self.answers() == ConfigAnswers::default()
            && std::io::stdin().is_terminal()
            && std::io::stdout().is_terminal()
    }
}

/// Run the setup sequence with the provider the flags call for.
pub fn provide(
    args: &SetupArgs,
    global: &GlobalArgs,
    state_dir: &Path,
) -> Result<(SyncConfig, Box<dyn ArtifactStore>)> {
    let connect = |credential: &StoreCredential| global.connect(credential);
    let provided = if args.interactive() {
        provide_config(&mut Interactive, state_dir, connect)
    } else {
        provide_config(&mut Flags(args.answers()), state_dir, connect)
    };
    provided.context("setup failed")
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Reuses the saved config when no setup flag was given.
struct Flags(ConfigAnswers);

impl ConfigProvider for Flags {
    type Error = anyhow::Error;

    fn reuse_existing(&mut self, _existing: &SyncConfig) -> Result<bool> {
        Ok(self.0 == ConfigAnswers::default())
    }

    fn answers(&mut self, _existing: Option<&SyncConfig>) -> Result<ConfigAnswers> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

struct Interactive;

impl ConfigProvider for Interactive {
    type Error = anyhow::Error;

    fn reuse_existing(&mut self, existing: &SyncConfig) -> Result<bool> {
        println!("{}", "Saved configuration".bold());
        println!("  source:     {}", existing.source_url);
        println!("  api key:    {}", existing.store_credential.masked());
        println!(
            "  collection: {}",
            existing
                .remote_artifact_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "(new)".to_string())
        );
        println!("  interval:   {}s", existing.poll_interval_seconds);
        Ok(Confirm::new()
            .with_prompt("Use this configuration?")
            .default(true)
            .interact()?)
    }

    fn answers(&mut self, existing: Option<&SyncConfig>) -> Result<ConfigAnswers> {
        let mut url = Input::<String>::new()
            .with_prompt("OpenAPI document URL")
            .validate_with(|input: &String| validate_source_url(input).map_err(|e| e.to_string()));
        if let Some(existing) = existing {
            url = url.default(existing.source_url.clone());
        }
        let source_url = url.interact_text()?;

        let key_prompt = if existing.is_some() {
            "Postman API key (empty keeps the saved key)"
        } else {
            "Postman API key"
        };
        let api_key = Password::new()
            .with_prompt(key_prompt)
            .allow_empty_password(existing.is_some())
            .interact()?;

        let interval = Input::<u64>::new()
            .with_prompt("Polling interval in seconds")
            .default(existing.map_or(DEFAULT_POLL_INTERVAL_SECS, |c| c.poll_interval_seconds))
            .validate_with(|secs: &u64| validate_poll_interval(*secs).map_err(|e| e.to_string()))
            .interact_text()?;

        Ok(ConfigAnswers {
            source_url: Some(source_url),
            store_credential: (!api_key.trim().is_empty()).then_some(api_key),
            remote_artifact_id: None,
            poll_interval_seconds: Some(interval),
        })
    }

    fn choose_collection(
        &mut self,
        store: &dyn ArtifactStore,
        current: Option<&ArtifactId>,
    ) -> Result<Option<ArtifactId>> {
        let Some(collections) = list_collections(store) else {
            return Ok(current.cloned());
        };

        let mut items = vec!["Create a new collection".to_string()];
        items.extend(collections.iter().map(|c| format!("{} ({})", c.name, c.id)));
        let default = current
            .and_then(|id| collections.iter().position(|c| &c.id == id))
            .map_or(0, |i| i + 1);

        let picked = Select::new()
            .with_prompt("Collection to keep in sync")
            .items(items.as_slice())
            .default(default)
            .interact()?;
        Ok(picked
            .checked_sub(1)
            .and_then(|i| collections.get(i))
            .map(|c| c.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_answers() {
        let args = SetupArgs {
            source_url: Some("https://api.example.com/openapi.json".to_string()),
            api_key: Some("PMAK-1".to_string()),
            collection: Some(String::new()),
            interval: Some(30),
            no_input: true,
        };
        let answers = args.answers();
        assert_eq!(answers.poll_interval_seconds, Some(30));
        assert_eq!(answers.remote_artifact_id.as_deref(), Some(""));
        assert!(!args.interactive());
    }

    #[test]
    fn flag_provider_reuses_only_without_flags() {
        let saved = SyncConfig::new(
            "https://api.example.com/openapi.json",
            StoreCredential::new("PMAK-1"),
            None,
            60,
        )
        .expect("config");
        assert!(Flags(ConfigAnswers::default())
            .reuse_existing(&saved)
            .expect("reuse"));
        let with_interval = ConfigAnswers {
            poll_interval_seconds: Some(20),
            ..ConfigAnswers::default()
        };
        assert!(!Flags(with_interval).reuse_existing(&saved).expect("reuse"));
    }
}
