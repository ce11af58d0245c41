use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use specsync_sync::{PassOutcome, SyncContext, SyncError};

use crate::error::{io_err, DaemonError};
use crate::stop::{stop_pair, StopHandle, StopSignal};

/// One blocking reconciliation pass. Moved onto a blocking thread for each
/// pass and handed back afterwards.
pub trait PassRunner: Send + 'static {
    fn run_pass(&mut self) -> Result<PassOutcome, SyncError>;
}

impl PassRunner for SyncContext {
    fn run_pass(&mut self) -> Result<PassOutcome, SyncError> {
        SyncContext::run_pass(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Watch { period: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    Once(PassOutcome),
    Watch(WatchReport),
}

/// Totals for a watch loop, including the initial pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchReport {
    pub passes: usize,
    pub published: usize,
    pub failures: usize,
}

impl WatchReport {
    fn record(&mut self, result: &Result<PassOutcome, SyncError>) {
        self.passes += 1;
        match result {
            Ok(outcome) => {
                if outcome.published() {
                    self.published += 1;
                }
                tracing::info!(pass = self.passes, %outcome, "pass finished");
            }
            Err(err) => {
                self.failures += 1;
                tracing::error!(pass = self.passes, error = %err, "pass failed, retrying next tick");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Build a runtime, run `mode` to completion, and block until it exits.
pub fn start_blocking<R: PassRunner>(runner: R, mode: RunMode) -> Result<RunSummary, DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(runner, mode))
}

/// Run `mode`. Watch mode stops on ctrl-c.
pub async fn run<R: PassRunner>(runner: R, mode: RunMode) -> Result<RunSummary, DaemonError> {
    match mode {
        RunMode::Once => run_once(runner).await.map(RunSummary::Once),
        RunMode::Watch { period } => {
            let (handle, signal) = stop_pair();
            let ctrl_c = spawn_ctrl_c(handle);
            let result = run_watch(runner, period, signal).await;
            ctrl_c.abort();
            result.map(RunSummary::Watch)
        }
    }
}

/// Single pass; any failure is terminal.
pub async fn run_once<R: PassRunner>(runner: R) -> Result<PassOutcome, DaemonError> {
    let (_, result) = run_pass_blocking(runner).await?;
    Ok(result?)
}

/// Initial pass, then one pass per `period` until `stop` fires.
///
/// A failed initial pass is returned as an error. Later failures are
/// logged and counted. The stop signal is checked only between passes; a
/// pass in flight always runs to completion.
pub async fn run_watch<R: PassRunner>(
    runner: R,
    period: Duration,
    mut stop: StopSignal,
) -> Result<WatchReport, DaemonError> {
    let mut report = WatchReport::default();

    let (mut runner, first) = run_pass_blocking(runner).await?;
    if let Err(err) = first {
        tracing::error!(error = %err, "initial pass failed");
        return Err(err.into());
    }
    report.record(&first);

    tracing::info!(period_secs = period.as_secs(), "watching for changes");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // first tick is immediate

    loop {
        if stop.is_stopped() {
            break;
        }
        tokio::select! {
            biased;
            _ = stop.stopped() => break,
            _ = interval.tick() => {}
        }

        let (returned, result) = run_pass_blocking(runner).await?;
        runner = returned;
        report.record(&result);
    }

    tracing::info!(
        passes = report.passes,
        published = report.published,
        failures = report.failures,
        "watch loop stopped"
    );
    Ok(report)
}

async fn run_pass_blocking<R: PassRunner>(
    mut runner: R,
) -> Result<(R, Result<PassOutcome, SyncError>), DaemonError> {
    tokio::task::spawn_blocking(move || {
        let result = runner.run_pass();
        (runner, result)
    })
    .await
    .map_err(|err| DaemonError::Join(err.to_string()))
}

/// Stop `handle` on the first ctrl-c.
pub fn spawn_ctrl_c(handle: StopHandle) -> JoinHandle<Result<(), DaemonError>> {
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .map_err(|err| DaemonError::Signal(err.to_string()))?;
        tracing::info!("received ctrl-c, stopping after the current pass");
        handle.stop();
        Ok(())
    })
}

/// Install the global subscriber. `RUST_LOG` wins over the `info` default;
/// repeated calls are no-ops.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
