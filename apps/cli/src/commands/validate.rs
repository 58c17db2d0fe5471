//! `ensemble validate` - check a team configuration without running it.

use anyhow::Context;
use colored::Colorize;
use ensemble_orchestrator::{EngineSettings, RunConfig, WorkflowStrategy};
use std::path::Path;

/// Execute the validate command.
pub fn execute(path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read team configuration {}", path.display()))?;
    let config = RunConfig::from_toml_str(&content).context("Invalid team configuration")?;
    let settings = EngineSettings::from_toml_str(&content).context("Invalid [engine] settings")?;
    config.validate().context("Team configuration does not validate")?;

    let strategy = WorkflowStrategy::resolve(&config.strategy, config.agent_ordering);
    let agents: Vec<_> = config.effective_agents().into_iter().map(|agent| agent.name).collect();

    println!("{} {}", "✓".green().bold(), format!("{} is valid", path.display()).bold());
    if !config.team_name.is_empty() {
        println!("  Team:     {}", config.team_name);
    }
    println!("  Strategy: {} (from \"{}\")", strategy.to_string().cyan(), config.strategy);
    println!("  Agents:   {}", agents.join(", "));
    println!("  Rounds:   {}", config.effective_rounds());
    println!("  Timeout:  {}s per turn", settings.turn_timeout_seconds);
    Ok(())
}
