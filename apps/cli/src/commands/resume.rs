//! `ensemble resume` - continue a suspended run from its snapshot.

use anyhow::Context;
use ensemble_orchestrator::{EngineSettings, PendingKind, ResumeInput, RunControl};
use std::path::PathBuf;

use super::{build_orchestrator, cancel_on_ctrl_c, heading, read_snapshot, render, report, write_snapshot};

/// Execute the resume command.
///
/// The snapshot file is rewritten with the state the run ends in, so a run
/// that suspends again can be resumed from the same file.
pub async fn execute(
    snapshot: PathBuf,
    answer: Option<String>,
    credential_supplied: bool,
    json: bool,
) -> anyhow::Result<()> {
    let state = read_snapshot(&snapshot).await?;

    let input = match (answer, credential_supplied) {
        (Some(answer), _) => ResumeInput::Answer(answer),
        (None, true) => ResumeInput::CredentialSupplied,
        (None, false) => match state.pending.as_ref().map(|pending| &pending.kind) {
            Some(PendingKind::UserInput { .. }) => {
                anyhow::bail!("Run {} is waiting for an answer; pass --answer", state.run_id)
            }
            Some(PendingKind::Credential { name }) => {
                anyhow::bail!("Run {} is waiting for the credential '{}'; pass --credential-supplied", state.run_id, name)
            }
            None => ResumeInput::Continue,
        },
    };

    if !json {
        heading("ensemble resume");
    }

    let (orchestrator, events) = build_orchestrator(EngineSettings::default());
    let renderer = (!json).then(|| render::spawn_event_renderer(events));

    let control = RunControl::new();
    cancel_on_ctrl_c(control.clone());
    let run_id = state.run_id.clone();
    let state = orchestrator
        .resume(state, input, control)
        .await
        .with_context(|| format!("Run {} cannot be resumed", run_id))?;

    drop(orchestrator);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    write_snapshot(&snapshot, &state).await?;
    let pending = state.status.is_resumable().then_some(snapshot.as_path());
    report(&state, pending, json)
}
