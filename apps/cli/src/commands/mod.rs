//! CLI command implementations.

pub mod render;
pub mod resume;
pub mod run;
pub mod strategies;
pub mod validate;

use anyhow::Context;
use colored::Colorize;
use ensemble_orchestrator::{
    EngineSettings, Orchestrator, PromptedReasoner, RunControl, RunEvent, RunOutcome, RunState, RunStatus,
    read_snapshot_file, write_snapshot_file,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use crate::echo::EchoModel;

/// Orchestrator over the offline echo model, with its event stream.
pub(crate) fn build_orchestrator(settings: EngineSettings) -> (Orchestrator, broadcast::Receiver<RunEvent>) {
    let (tx, rx) = broadcast::channel(256);
    let reasoner = PromptedReasoner::new(Arc::new(EchoModel));
    let orchestrator = Orchestrator::new(Arc::new(reasoner)).with_settings(settings).with_events(tx);
    (orchestrator, rx)
}

/// Cancel the run behind `control` when Ctrl-C is pressed.
pub(crate) fn cancel_on_ctrl_c(control: RunControl) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            control.request_cancel();
        }
    });
}

/// Read and parse a run snapshot file.
pub(crate) async fn read_snapshot(path: &Path) -> anyhow::Result<RunState> {
    read_snapshot_file(path).await.with_context(|| format!("Failed to read snapshot {}", path.display()))
}

/// Write a run snapshot file, replacing it atomically.
pub(crate) async fn write_snapshot(path: &Path, state: &RunState) -> anyhow::Result<()> {
    write_snapshot_file(path, state).await.with_context(|| format!("Failed to write snapshot {}", path.display()))
}

/// Print the outcome and fail when the run ended in error.
pub(crate) fn report(state: &RunState, snapshot: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let outcome = RunOutcome::from_state(state);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        render::print_outcome(&outcome, snapshot);
    }

    if outcome.status == RunStatus::Error {
        anyhow::bail!("Run {} failed: {}", outcome.run_id, outcome.error.unwrap_or_default());
    }
    Ok(())
}

/// Heading printed before human-readable output.
pub(crate) fn heading(title: &str) {
    println!("{}", title.bold().cyan());
    println!();
}
