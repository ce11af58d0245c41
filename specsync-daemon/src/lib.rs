//! Scheduler: a single pass or an interruptible watch loop around
//! [`specsync_sync::SyncContext`].

mod error;
mod runtime;
pub mod stop;

pub use error::DaemonError;
pub use runtime::{
    init_tracing, run, run_once, run_watch, spawn_ctrl_c, start_blocking, LogFormat, PassRunner,
    RunMode, RunSummary, WatchReport,
};
pub use stop::{stop_pair, StopHandle, StopSignal};
