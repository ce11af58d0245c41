//! Change detection against the last published fingerprint.

use specsync_core::{Fingerprint, SyncState};

/// `true` when there is no persisted state (first run always syncs) or the
/// persisted fingerprint differs from `current` by string equality.
pub fn has_changed(current: &Fingerprint, persisted: Option<&SyncState>) -> bool {
    match persisted {
        None => true,
        Some(state) => state.fingerprint != *current,
    }
}
