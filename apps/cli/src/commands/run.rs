//! `ensemble run` - run a team from its TOML definition.

use anyhow::Context;
use ensemble_orchestrator::{EngineSettings, FileSnapshotStore, RunConfig, RunControl, SnapshotStore};
use std::path::PathBuf;
use tracing::info;

use super::{build_orchestrator, cancel_on_ctrl_c, heading, render, report};

/// Options of the run command.
#[derive(Debug)]
pub struct RunOptions {
    pub config: PathBuf,
    pub strategy: Option<String>,
    pub rounds: Option<u32>,
    pub snapshot_dir: PathBuf,
    pub json: bool,
}

/// Execute the run command.
pub async fn execute(options: RunOptions) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&options.config)
        .with_context(|| format!("Failed to read team configuration {}", options.config.display()))?;
    let mut config = RunConfig::from_toml_str(&content).context("Invalid team configuration")?;
    let settings = EngineSettings::from_toml_str(&content).context("Invalid [engine] settings")?;

    if let Some(strategy) = options.strategy {
        config.strategy = strategy;
    }
    if let Some(rounds) = options.rounds {
        config = config.with_rounds_override(rounds);
    }
    let owner = config.owner_id.clone();

    if !options.json {
        heading("ensemble run");
    }

    let (orchestrator, events) = build_orchestrator(settings);
    let renderer = (!options.json).then(|| render::spawn_event_renderer(events));

    let control = RunControl::new();
    cancel_on_ctrl_c(control.clone());
    let state = orchestrator.run(config, control).await.context("Run could not start")?;

    // Closing the event channel lets the renderer drain and stop.
    drop(orchestrator);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    let snapshot = if state.status.is_resumable() {
        let store = FileSnapshotStore::new(&options.snapshot_dir);
        let path = store.path_for(&owner, &state.run_id);
        store
            .save(&owner, &state.run_id, &state)
            .await
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        info!(path = %path.display(), "Suspended run saved");
        Some(path)
    } else {
        None
    };

    report(&state, snapshot.as_deref(), options.json)
}
