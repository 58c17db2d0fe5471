// Workflow drivers
//
// Every strategy shares one loop: rounds of steps, each step one agent turn.
// A driver only decides the agent order of a round, whether turns route, and
// where a routed turn goes next. Control checks, escalation, validation
// retries, suspension and completion live in the shared loop below.

mod random;
mod reverse;
mod routed;
mod sequential;

pub use random::RandomDriver;
pub use reverse::ReverseDriver;
pub use routed::RoutedDriver;
pub use sequential::SequentialDriver;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{AgentDescriptor, AgentRole, EngineSettings, WorkflowStrategy};
use crate::control::{PauseExit, RunControl};
use crate::error::{OrchestrationError, Result};
use crate::events::{EventSink, RunEvent};
use crate::lifecycle::RunStatus;
use crate::context::ContextUpdate;
use crate::state::{Directives, Message, PendingKind, PendingRequest, RunState};
use crate::summary::Summarizer;
use crate::turn::{RoutingMode, TurnExecutor, TurnOutcome, TurnResult, build_turn_input};

/// Iteration policy of one workflow strategy
pub trait WorkflowDriver: Send + Sync {
    /// Strategy this driver implements
    fn strategy(&self) -> WorkflowStrategy;

    /// How turns treat routing; fixed-order drivers use `None`
    fn routing(&self) -> RoutingMode {
        RoutingMode::None
    }

    /// Agent names for `round`, in turn order
    fn round_order(&self, round: u32, team: &[AgentDescriptor], state: &RunState) -> Vec<String>;

    /// Agent that takes over after `from` named `recipient`
    fn route(&self, _from: &AgentDescriptor, _recipient: &str, _team: &[AgentDescriptor]) -> Option<String> {
        None
    }
}

/// Run-scoped collaborators handed to the shared loop
#[derive(Clone)]
pub struct DriverContext {
    /// Executes agent turns
    pub executor: TurnExecutor,
    /// Refreshes the rolling summary between rounds
    pub summarizer: Option<Arc<dyn Summarizer>>,
    /// Engine settings
    pub settings: EngineSettings,
    /// Pause, continue and cancel signals for this run
    pub control: RunControl,
    /// Progress events
    pub events: EventSink,
}

enum Flow {
    Next,
    Stop,
}

/// Drive `state` with `driver` until the run completes, suspends or stops
///
/// Never fails: errors raised inside the loop end the run in `error`, with
/// history and context kept. The control token is reset on return.
pub async fn run_workflow(driver: &dyn WorkflowDriver, state: &mut RunState, ctx: &DriverContext) {
    if let Err(e) = drive(driver, state, ctx).await {
        error!(run_id = %state.run_id, error = %e, "Run aborted");
        state.fail(e.to_string());
    }
    if state.status.is_terminal() {
        ctx.events.emit(RunEvent::RunFinished {
            run_id: state.run_id.clone(),
            status: state.status,
            error: state.error.clone(),
        });
    }
    ctx.control.reset();
}

async fn drive(driver: &dyn WorkflowDriver, state: &mut RunState, ctx: &DriverContext) -> Result<()> {
    let team = state.config.effective_agents();
    if team.is_empty() {
        return Err(OrchestrationError::InvalidConfig("the team has no agents".to_string()));
    }
    let rounds = state.config.effective_rounds();

    if state.status == RunStatus::Initializing {
        if ctx.control.is_cancelled() {
            info!(run_id = %state.run_id, "Run cancelled before the first step");
            return state.transition(RunStatus::Cancelled);
        }
        state.transition(RunStatus::Running)?;
    }

    info!(
        run_id = %state.run_id,
        strategy = %driver.strategy(),
        round = state.round,
        rounds = rounds,
        "Driving workflow"
    );
    ctx.events.emit(RunEvent::RunStarted {
        run_id: state.run_id.clone(),
        strategy: driver.strategy().to_string(),
        agents: team.iter().map(|agent| agent.name.clone()).collect(),
    });

    while state.round < rounds {
        let round = state.round;
        if state.round_order.is_empty() {
            refresh_summary(state, ctx, round).await;
            state.round_order = driver.round_order(round, &team, state);
            state.step = 0;
            debug!(run_id = %state.run_id, round = round, order = ?state.round_order, "Round started");
            ctx.events.emit(RunEvent::RoundStarted {
                run_id: state.run_id.clone(),
                round,
                order: state.round_order.clone(),
            });
        }

        while (state.step as usize) < state.round_order.len() {
            if ctx.control.is_cancelled() {
                info!(run_id = %state.run_id, round = round, step = state.step, "Run cancelled");
                return state.transition(RunStatus::Cancelled);
            }
            if ctx.control.is_paused() {
                state.transition(RunStatus::Paused)?;
                info!(run_id = %state.run_id, round = round, step = state.step, "Run paused");
                ctx.events.emit(RunEvent::Paused { run_id: state.run_id.clone() });
                match ctx.control.wait_while_paused().await {
                    PauseExit::Cancelled => {
                        info!(run_id = %state.run_id, "Run cancelled while paused");
                        return state.transition(RunStatus::Cancelled);
                    }
                    PauseExit::Resumed => {
                        state.transition(RunStatus::Running)?;
                        info!(run_id = %state.run_id, "Run resumed");
                        ctx.events.emit(RunEvent::Resumed { run_id: state.run_id.clone() });
                    }
                }
            }

            let name = state.round_order[state.step as usize].clone();
            let agent = team
                .iter()
                .find(|agent| agent.name == name)
                .cloned()
                .ok_or_else(|| OrchestrationError::UnknownAgent(name.clone()))?;

            match step(driver, state, ctx, &team, &agent).await? {
                Flow::Next => state.enter_step(state.step + 1),
                Flow::Stop => return Ok(()),
            }
        }

        state.round_order.clear();
        state.enter_round(round + 1);
    }

    if state.status == RunStatus::Running {
        info!(run_id = %state.run_id, turns = state.turns, "Round budget exhausted, run completed");
        state.transition(RunStatus::Completed)?;
    }
    Ok(())
}

/// One step: the agent's turn, escalation on failure, then the outcome
async fn step(
    driver: &dyn WorkflowDriver,
    state: &mut RunState,
    ctx: &DriverContext,
    team: &[AgentDescriptor],
    agent: &AgentDescriptor,
) -> Result<Flow> {
    let task = state.next_input.clone();
    let mut result = take_turn(driver, state, ctx, agent, &task).await;
    let mut acting = agent.clone();

    if let TurnOutcome::Failed { error: failure } = &result.outcome {
        if let Some(manager) = escalation_target(state, agent) {
            warn!(
                run_id = %state.run_id,
                agent = %agent.name,
                manager = %manager.name,
                error = %failure,
                "Escalating failed turn to manager"
            );
            state.record(Message::system(failure.clone(), Some(agent.name.clone())));
            let triage = format!(
                "Agent '{}' failed while working on the task below.\nError: {}\n\
                 Decide how the team should proceed and respond accordingly.\n\nTask:\n{}",
                agent.name, failure, task
            );
            result = take_turn(driver, state, ctx, &manager, &triage).await;
            acting = manager;
        }
    }

    apply_outcome(driver, state, ctx, team, &acting, result)
}

/// Run one agent turn, retrying rejected responses with the validator's feedback
async fn take_turn(
    driver: &dyn WorkflowDriver,
    state: &mut RunState,
    ctx: &DriverContext,
    agent: &AgentDescriptor,
    task: &str,
) -> TurnResult {
    let mut message = task.to_string();
    let mut retries = 0;
    loop {
        state.active_agent = Some(agent.name.clone());
        ctx.events.emit(RunEvent::TurnStarted {
            run_id: state.run_id.clone(),
            round: state.round,
            step: state.step,
            agent: agent.name.clone(),
        });

        let input = build_turn_input(state, agent, &message);
        let result = ctx.executor.run(&input, driver.routing()).await;
        state.turns += 1;

        ctx.events.emit(RunEvent::TurnFinished {
            run_id: state.run_id.clone(),
            agent: agent.name.clone(),
            status: result.status(),
            response: result.response().map(str::to_string),
        });

        match &result.outcome {
            TurnOutcome::ValidationFailed { response, feedback }
                if retries < ctx.settings.max_validation_retries =>
            {
                retries += 1;
                debug!(agent = %agent.name, retry = retries, "Retrying rejected response");
                message = format!(
                    "{}\n\nYour previous response was rejected.\nFeedback: {}\nPrevious response:\n{}",
                    task, feedback, response
                );
            }
            _ => return result,
        }
    }
}

fn escalation_target(state: &RunState, failed: &AgentDescriptor) -> Option<AgentDescriptor> {
    if !state.config.escalate_errors_to_manager {
        return None;
    }
    state.config.manager().filter(|manager| manager.name != failed.name)
}

fn apply_outcome(
    driver: &dyn WorkflowDriver,
    state: &mut RunState,
    ctx: &DriverContext,
    team: &[AgentDescriptor],
    agent: &AgentDescriptor,
    result: TurnResult,
) -> Result<Flow> {
    let dynamic = driver.strategy().is_dynamic();
    let TurnResult { outcome, context_update, .. } = result;

    match outcome {
        TurnOutcome::Completed { response, workflow_complete } => {
            record_response(state, ctx, agent, &response, None, workflow_complete && dynamic, &context_update);
            state.next_input = response;
            if dynamic {
                state.next_agent = None;
                if workflow_complete {
                    info!(run_id = %state.run_id, agent = %agent.name, "Workflow declared complete");
                    state.transition(RunStatus::Completed)?;
                    return Ok(Flow::Stop);
                }
            }
            Ok(Flow::Next)
        }
        TurnOutcome::Routed { response, recipient } => {
            record_response(state, ctx, agent, &response, Some(recipient.clone()), false, &context_update);
            state.next_input = response;
            state.next_agent = driver.route(agent, &recipient, team);
            debug!(run_id = %state.run_id, from = %agent.name, to = ?state.next_agent, "Turn routed");
            Ok(Flow::Next)
        }
        TurnOutcome::AwaitingUser { response } => {
            record_response(state, ctx, agent, &response, Some("user".to_string()), false, &context_update);
            let form_schema = state
                .context_sets
                .iter()
                .filter(|set| set.is_visible_to(&agent.name))
                .find_map(|set| set.form_schema.clone());
            state.pending = Some(PendingRequest {
                agent: agent.name.clone(),
                message: response,
                kind: PendingKind::UserInput { form_schema },
            });
            if dynamic {
                state.next_agent = Some(agent.name.clone());
            }
            // The answer feeds the next step. On the run's last step there is
            // none, so the asking agent takes the answer itself.
            if !is_last_step(state) {
                state.enter_step(state.step + 1);
            }
            suspend(state, ctx, RunStatus::AwaitingUser)?;
            Ok(Flow::Stop)
        }
        TurnOutcome::AwaitingCredential { credential, message } => {
            state.pending = Some(PendingRequest {
                agent: agent.name.clone(),
                message,
                kind: PendingKind::Credential { name: credential },
            });
            // Step stays put so the same agent is retried on resume.
            suspend(state, ctx, RunStatus::AwaitingCredential)?;
            Ok(Flow::Stop)
        }
        TurnOutcome::ValidationFailed { feedback, .. } => {
            let message = format!(
                "Agent '{}' failed validation after {} retries: {}",
                agent.name, ctx.settings.max_validation_retries, feedback
            );
            error!(run_id = %state.run_id, agent = %agent.name, "Validation retries exhausted");
            state.fail(message);
            Ok(Flow::Stop)
        }
        TurnOutcome::Failed { error: failure } => {
            error!(run_id = %state.run_id, agent = %agent.name, error = %failure, "Turn failed");
            state.fail(failure);
            Ok(Flow::Stop)
        }
    }
}

fn record_response(
    state: &mut RunState,
    ctx: &DriverContext,
    agent: &AgentDescriptor,
    response: &str,
    recipient: Option<String>,
    workflow_complete: bool,
    update: &ContextUpdate,
) {
    let context_modified = !update.is_empty();
    let mut message = Message::agent(agent.name.clone(), response);
    if recipient.is_some() || workflow_complete || context_modified {
        message = message.with_directives(Directives { recipient, workflow_complete, context: update.clone() });
    }
    state.record(message);

    if context_modified {
        let report = state.apply_context_update(update);
        if report.changed() {
            ctx.events.emit(RunEvent::ContextUpdated {
                run_id: state.run_id.clone(),
                added: report.added,
                edited: report.edited,
            });
        }
    }
}

fn is_last_step(state: &RunState) -> bool {
    state.step as usize + 1 >= state.round_order.len() && state.round + 1 >= state.config.effective_rounds()
}

fn suspend(state: &mut RunState, ctx: &DriverContext, status: RunStatus) -> Result<()> {
    state.transition(status)?;
    if let Some(pending) = &state.pending {
        info!(run_id = %state.run_id, status = %status, agent = %pending.agent, "Run suspended");
        ctx.events.emit(RunEvent::Suspended {
            run_id: state.run_id.clone(),
            status,
            agent: pending.agent.clone(),
            message: pending.message.clone(),
        });
    }
    Ok(())
}

async fn refresh_summary(state: &mut RunState, ctx: &DriverContext, round: u32) {
    if round == 0 || !ctx.settings.summarize_between_rounds {
        return;
    }
    let Some(summarizer) = &ctx.summarizer else {
        return;
    };
    match summarizer.summarize(&state.history, &state.config.initial_message, &state.context_sets).await {
        Ok(summary) => {
            debug!(run_id = %state.run_id, round = round, "Summary refreshed");
            state.summary = Some(summary);
        }
        Err(e) => warn!(run_id = %state.run_id, error = %e, "Summarizer failed, keeping previous summary"),
    }
}

/// Default agent for a dynamic round: the first manager, else the first agent
pub(crate) fn default_agent(team: &[AgentDescriptor], prefer_manager: bool) -> Option<String> {
    let manager = prefer_manager
        .then(|| team.iter().find(|agent| agent.role == AgentRole::Manager))
        .flatten();
    manager.or_else(|| team.first()).map(|agent| agent.name.clone())
}
