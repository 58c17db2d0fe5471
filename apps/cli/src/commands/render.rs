//! Terminal rendering of run events and outcomes.

use colored::Colorize;
use ensemble_orchestrator::{PendingKind, RunEvent, RunOutcome, RunStatus};
use std::path::Path;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const PREVIEW_CHARS: usize = 100;

/// Render events until the channel closes.
pub fn spawn_event_renderer(mut rx: broadcast::Receiver<RunEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => render_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    println!("  {}", format!("({} events skipped)", skipped).dimmed());
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}

fn render_event(event: &RunEvent) {
    match event {
        RunEvent::RunStarted { run_id, strategy, agents } => {
            println!("  {} {} ({}) with {}", "Run".bold(), run_id, strategy.cyan(), agents.join(", "));
        }
        RunEvent::RoundStarted { round, order, .. } => {
            println!();
            println!("  {} {}: {}", "Round".bold(), round + 1, order.join(" → "));
        }
        RunEvent::TurnStarted { .. } => {}
        RunEvent::TurnFinished { agent, status, response, .. } => {
            let text = response.as_deref().map(preview).unwrap_or_default();
            let label = serde_json::to_value(status)
                .ok()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_default();
            println!("    {} {} {}", agent.green(), format!("[{}]", label).dimmed(), text);
        }
        RunEvent::ContextUpdated { added, edited, .. } => {
            if !added.is_empty() {
                println!("    {} {}", "context added:".dimmed(), added.join(", "));
            }
            if !edited.is_empty() {
                println!("    {} {}", "context edited:".dimmed(), edited.join(", "));
            }
        }
        RunEvent::Paused { .. } => println!("  {}", "Paused".yellow()),
        RunEvent::Resumed { .. } => println!("  {}", "Resumed".cyan()),
        RunEvent::Suspended { status, agent, .. } => {
            println!();
            println!("  {} {} ({})", "Suspended:".yellow().bold(), status, agent);
        }
        RunEvent::RunFinished { status, .. } => {
            println!();
            println!("  {} {}", "Finished:".bold(), status);
        }
    }
}

/// Print the outcome of a run.
pub fn print_outcome(outcome: &RunOutcome, snapshot: Option<&Path>) {
    println!();
    let status = match outcome.status {
        RunStatus::Completed => outcome.status.to_string().green().bold(),
        RunStatus::Error => outcome.status.to_string().red().bold(),
        _ => outcome.status.to_string().yellow().bold(),
    };
    println!("  {} {}", "Status:".bold(), status);
    println!("  {} {}  {} {}", "Rounds:".bold(), outcome.rounds, "Turns:".bold(), outcome.turns);

    if let Some(response) = &outcome.final_response {
        println!();
        println!("  {}", "Final response:".bold());
        println!("  {}", response);
    }
    if let Some(error) = &outcome.error {
        println!();
        println!("  {} {}", "Error:".red().bold(), error);
    }

    if let Some(pending) = &outcome.pending {
        println!();
        println!("  {} {}: {}", "Waiting on".yellow().bold(), pending.agent, pending.message);
        if let Some(path) = snapshot {
            let flag = match &pending.kind {
                PendingKind::UserInput { .. } => "--answer \"...\"",
                PendingKind::Credential { .. } => "--credential-supplied",
            };
            println!();
            println!("  Resume with: ensemble resume --snapshot {} {}", path.display(), flag);
        }
    }
}
