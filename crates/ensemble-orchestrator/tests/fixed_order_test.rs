//! Integration tests for the fixed-order strategies.
//!
//! Covers sequential, reverse and random ordering, message hand-off between
//! agents, multi-round budgets, rolling summaries and context sharing.

use ensemble_abstraction::ChatRole;
use ensemble_orchestrator::testing::{FixedSummarizer, ScriptedReasoner};
use ensemble_orchestrator::{
    AgentDescriptor, AgentOrdering, AgentRole, ContextSet, Orchestrator, RunConfig, RunControl, RunEvent,
    RunOutcome, RunStatus, TurnDecision, WorkflowStrategy,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::broadcast;

fn agent(name: &str) -> AgentDescriptor {
    AgentDescriptor::new(name, AgentRole::Generalist)
}

fn config(strategy: &str, names: &[&str]) -> RunConfig {
    RunConfig::new(strategy, "X", names.iter().map(|name| agent(name)).collect()).with_max_rounds(1)
}

#[tokio::test]
async fn test_two_agents_hand_off_literal_responses() {
    let reasoner = Arc::new(ScriptedReasoner::with_replies(["Draft from A", "Review from B"]));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let state = orchestrator.run(config("sequential", &["a", "b"]), RunControl::new()).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.history.len(), 3);
    assert_eq!(state.history[0].role, ChatRole::User);
    assert_eq!(state.history[0].content, "X");
    assert_eq!(state.history[1].agent.as_deref(), Some("a"));
    assert_eq!(state.history[2].agent.as_deref(), Some("b"));
    assert_eq!(reasoner.tasks(), vec!["X", "Draft from A"]);
}

#[tokio::test]
async fn test_sequential_order() {
    let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("ok")));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let state = orchestrator.run(config("sequential", &["a", "b", "c"]), RunControl::new()).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(reasoner.agents(), vec!["a", "b", "c"]);
    assert_eq!(state.turns, 3);
}

#[tokio::test]
async fn test_reverse_order_from_legacy_identifier_and_hint() {
    let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("ok")));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let legacy = orchestrator.run(config("sequential_reverse", &["a", "b", "c"]), RunControl::new()).await.unwrap();
    assert_eq!(legacy.strategy, WorkflowStrategy::Reverse);

    let hinted = config("sequential", &["a", "b", "c"]).with_ordering(AgentOrdering::Reverse);
    let hinted = orchestrator.run(hinted, RunControl::new()).await.unwrap();
    assert_eq!(hinted.strategy, WorkflowStrategy::Reverse);

    assert_eq!(reasoner.agents(), vec!["c", "b", "a", "c", "b", "a"]);
}

#[tokio::test]
async fn test_custom_agents_restrict_the_team() {
    let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("ok")));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = config("sequential", &["a", "b", "c"]).with_custom_agents(["c", "a"]);
    orchestrator.run(config, RunControl::new()).await.unwrap();

    assert_eq!(reasoner.agents(), vec!["a", "c"]);
}

#[tokio::test]
async fn test_rounds_repeat_the_order() {
    let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("ok")));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = config("sequential", &["a", "b"]).with_max_rounds(5).with_rounds_override(2);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();

    assert_eq!(reasoner.agents(), vec!["a", "b", "a", "b"]);
    let outcome = RunOutcome::from_state(&state);
    assert!(outcome.is_success());
    assert_eq!(outcome.rounds, 2);
    assert_eq!(outcome.turns, 4);
    assert_eq!(outcome.responses.len(), 4);
}

#[tokio::test]
async fn test_seeded_random_order_is_reproducible() {
    let run = |seed: u64| async move {
        let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("ok")));
        let orchestrator = Orchestrator::new(reasoner.clone());
        let config = config("random", &["a", "b", "c", "d"]).with_max_rounds(3).with_random_seed(seed);
        let state = orchestrator.run(config, RunControl::new()).await.unwrap();
        assert_eq!(state.status, RunStatus::Completed);
        reasoner.agents()
    };

    let first = run(7).await;
    let second = run(7).await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 12);

    // Every round is a permutation of the team.
    for round in first.chunks(4) {
        let mut names = round.to_vec();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }
}

#[tokio::test]
async fn test_summary_refreshes_between_rounds() {
    let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("ok")));
    let summarizer = Arc::new(FixedSummarizer::new("A and B agreed on a plan."));
    let orchestrator = Orchestrator::new(reasoner.clone()).with_summarizer(summarizer.clone());

    let state =
        orchestrator.run(config("sequential", &["a", "b"]).with_max_rounds(3), RunControl::new()).await.unwrap();

    // Rounds 2 and 3 only.
    assert_eq!(summarizer.calls(), 2);
    assert_eq!(state.summary.as_deref(), Some("A and B agreed on a plan."));

    let requests = reasoner.requests();
    assert!(!requests[0].briefing.contains("Summary so far"));
    assert!(requests[2].briefing.contains("A and B agreed on a plan."));
}

#[tokio::test]
async fn test_failing_summarizer_does_not_stop_the_run() {
    let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("ok")));
    let orchestrator =
        Orchestrator::new(reasoner.clone()).with_summarizer(Arc::new(FixedSummarizer::failing()));

    let state =
        orchestrator.run(config("sequential", &["a"]).with_max_rounds(2), RunControl::new()).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert!(state.summary.is_none());
    assert_eq!(reasoner.calls(), 2);
}

#[tokio::test]
async fn test_context_sets_flow_to_later_agents() {
    let reasoner = Arc::new(
        ScriptedReasoner::new()
            .then_decide(
                TurnDecision::text("Noted the budget")
                    .with_new_set(ContextSet::new("budget", "Spend at most 100"))
                    .with_new_set(ContextSet::new("secret", "Only A knows").hidden_from(["b"])),
            )
            .then_decide(TurnDecision::text("Working within budget")),
    );
    let (tx, mut rx) = broadcast::channel(64);
    let orchestrator = Orchestrator::new(reasoner.clone()).with_events(tx);

    let state = orchestrator.run(config("sequential", &["a", "b"]), RunControl::new()).await.unwrap();

    let names: Vec<_> = state.context_sets.iter().map(|set| set.name.as_str()).collect();
    assert_eq!(names, vec!["budget", "secret"]);

    let b_briefing = &reasoner.requests()[1].briefing;
    assert!(b_briefing.contains("## budget\nSpend at most 100"));
    assert!(!b_briefing.contains("Only A knows"));

    let directives = state.history[1].directives.as_ref().unwrap();
    assert_eq!(directives.context.new_sets.len(), 2);

    let mut updated = None;
    while let Ok(event) = rx.try_recv() {
        if let RunEvent::ContextUpdated { added, .. } = event {
            updated = Some(added);
        }
    }
    assert_eq!(updated, Some(vec!["budget".to_string(), "secret".to_string()]));
}

#[tokio::test]
async fn test_invalid_config_never_starts() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    let orchestrator = Orchestrator::new(reasoner.clone());

    let result = orchestrator.run(config("sequential", &["a", "a"]), RunControl::new()).await;

    assert!(result.is_err());
    assert_eq!(reasoner.calls(), 0);
}
