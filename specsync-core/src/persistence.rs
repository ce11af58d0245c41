//! Local durable records.
//!
//! # Storage layout
//!
//! ```text
//! <state dir>/            (defaults to the process working directory)
//!   .specsync.json        SyncConfig (mode 0600, holds the store credential)
//!   .specsync-state.json  SyncState (last published fingerprint)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(dir: &Path, …)` — explicit directory; used in tests with `TempDir`
//! - `fn(…)` — uses the current working directory, delegates to `_at`
//!
//! Each record is a whole-file overwrite. A missing file is `Ok(None)`; so is
//! a file that no longer parses, since there is no schema versioning.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{io_err, StateError};
use crate::types::{SyncConfig, SyncState};

pub const CONFIG_FILE: &str = ".specsync.json";
pub const STATE_FILE: &str = ".specsync-state.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<dir>/.specsync.json` — pure, no I/O.
pub fn config_path_at(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// `<dir>/.specsync-state.json` — pure, no I/O.
pub fn state_path_at(dir: &Path) -> PathBuf {
    dir.join(STATE_FILE)
}

// ---------------------------------------------------------------------------
// 2. SyncConfig
// ---------------------------------------------------------------------------

/// Load the sync config. Records that fail validation load as absent too.
pub fn load_config_at(dir: &Path) -> Result<Option<SyncConfig>, StateError> {
    let path = config_path_at(dir);
    let Some(config) = read_record::<SyncConfig>(&path)? else {
        return Ok(None);
    };
    if let Err(err) = config.validate() {
        tracing::warn!("ignoring config at {}: {err}", path.display());
        return Ok(None);
    }
    Ok(Some(config))
}

/// `load_config_at` convenience wrapper.
pub fn load_config() -> Result<Option<SyncConfig>, StateError> {
    load_config_at(&working_dir()?)
}

/// Atomically save the sync config (`.tmp` + `chmod 0600` + rename).
pub fn save_config_at(dir: &Path, config: &SyncConfig) -> Result<(), StateError> {
    write_record(&config_path_at(dir), config)
}

/// `save_config_at` convenience wrapper.
pub fn save_config(config: &SyncConfig) -> Result<(), StateError> {
    save_config_at(&working_dir()?, config)
}

// ---------------------------------------------------------------------------
// 3. SyncState
// ---------------------------------------------------------------------------

pub fn load_state_at(dir: &Path) -> Result<Option<SyncState>, StateError> {
    read_record(&state_path_at(dir))
}

/// `load_state_at` convenience wrapper.
pub fn load_state() -> Result<Option<SyncState>, StateError> {
    load_state_at(&working_dir()?)
}

pub fn save_state_at(dir: &Path, state: &SyncState) -> Result<(), StateError> {
    write_record(&state_path_at(dir), state)
}

/// `save_state_at` convenience wrapper.
pub fn save_state(state: &SyncState) -> Result<(), StateError> {
    save_state_at(&working_dir()?, state)
}

/// Default state directory: the process working directory.
pub fn working_dir() -> Result<PathBuf, StateError> {
    std::env::current_dir().map_err(StateError::WorkingDirNotFound)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StateError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    match serde_json::from_str(&contents) {
        Ok(record) => Ok(Some(record)),
        Err(err) => {
            tracing::warn!("treating unreadable record {} as absent: {err}", path.display());
            Ok(None)
        }
    }
}

/// Write flow: serialize → `<file>.tmp` sibling → `chmod 0600` → `rename`.
fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<(), StateError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let json = serde_json::to_string_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, err));
    }
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StateError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
