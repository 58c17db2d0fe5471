//! Scripted collaborators for tests.
//!
//! Available inside this crate's tests and to downstream crates through the
//! `test-support` feature.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use tokio::time::Duration;

use crate::context::ContextSet;
use crate::error::{OrchestrationError, Result};
use crate::reasoning::{ReasoningProvider, ReasoningRequest};
use crate::state::Message;
use crate::summary::Summarizer;
use crate::turn::TurnDecision;
use crate::validation::{TurnValidator, Verdict};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this decision.
    Decide(TurnDecision),
    /// Fail the call with this message.
    Fail(String),
    /// Sleep, then return the decision.
    Delay(Duration, TurnDecision),
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Reasoning provider that replays a script in call order.
///
/// Once the script runs out the fallback decision is returned, or the call
/// fails if there is none.
#[derive(Default)]
pub struct ScriptedReasoner {
    steps: Mutex<VecDeque<ScriptStep>>,
    fallback: Option<TurnDecision>,
    hooks: Mutex<Vec<(usize, Hook)>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl fmt::Debug for ScriptedReasoner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedReasoner")
            .field("remaining", &lock(&self.steps).len())
            .field("calls", &lock(&self.requests).len())
            .finish_non_exhaustive()
    }
}

// A poisoned lock only means another test thread panicked; keep the data.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ScriptedReasoner {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script of plain decisions.
    pub fn with_decisions<I>(decisions: I) -> Self
    where
        I: IntoIterator<Item = TurnDecision>,
    {
        let reasoner = Self::new();
        lock(&reasoner.steps).extend(decisions.into_iter().map(ScriptStep::Decide));
        reasoner
    }

    /// Script of plain text replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_decisions(replies.into_iter().map(TurnDecision::text))
    }

    /// Append a step.
    #[must_use]
    pub fn then(self, step: ScriptStep) -> Self {
        lock(&self.steps).push_back(step);
        self
    }

    /// Append a decision.
    #[must_use]
    pub fn then_decide(self, decision: TurnDecision) -> Self {
        self.then(ScriptStep::Decide(decision))
    }

    /// Append a failure.
    #[must_use]
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.then(ScriptStep::Fail(message.into()))
    }

    /// Decision returned once the script is exhausted.
    #[must_use]
    pub fn otherwise(mut self, decision: TurnDecision) -> Self {
        self.fallback = Some(decision);
        self
    }

    /// Run `hook` right after the `call`-th call (1-based) returns its reply.
    #[must_use]
    pub fn after_call(self, call: usize, hook: impl Fn() + Send + Sync + 'static) -> Self {
        lock(&self.hooks).push((call, Box::new(hook)));
        self
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        lock(&self.requests).clone()
    }

    /// Agents called, in order.
    pub fn agents(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|request| request.agent.clone()).collect()
    }

    /// Task messages received, in order.
    pub fn tasks(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|request| request.task.clone()).collect()
    }

    /// Number of calls so far.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedReasoner {
    async fn decide(&self, request: &ReasoningRequest) -> Result<TurnDecision> {
        let (call, step) = {
            let mut requests = lock(&self.requests);
            requests.push(request.clone());
            (requests.len(), lock(&self.steps).pop_front())
        };

        let reply = match step {
            Some(ScriptStep::Decide(decision)) => Ok(decision),
            Some(ScriptStep::Fail(message)) => Err(OrchestrationError::Other(message)),
            Some(ScriptStep::Delay(delay, decision)) => {
                tokio::time::sleep(delay).await;
                Ok(decision)
            }
            None => self
                .fallback
                .clone()
                .ok_or_else(|| OrchestrationError::Other(format!("script exhausted at call {}", call))),
        };

        for (_, hook) in lock(&self.hooks).iter().filter(|(at, _)| *at == call) {
            hook();
        }
        reply
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Summarizer returning a fixed text and counting calls.
#[derive(Debug, Default)]
pub struct FixedSummarizer {
    text: String,
    fail: bool,
    calls: Mutex<usize>,
}

impl FixedSummarizer {
    /// Always returns `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Always fails.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Number of calls so far.
    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, _history: &[Message], _initial: &str, _sets: &[ContextSet]) -> Result<String> {
        *lock(&self.calls) += 1;
        if self.fail {
            return Err(OrchestrationError::Other("summarizer offline".to_string()));
        }
        Ok(self.text.clone())
    }
}

/// Validator replaying verdicts; passes once they run out.
#[derive(Debug, Default)]
pub struct ScriptedValidator {
    verdicts: Mutex<VecDeque<Verdict>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedValidator {
    /// Replays `verdicts` in order.
    pub fn new<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = Verdict>,
    {
        Self { verdicts: Mutex::new(verdicts.into_iter().collect()), seen: Mutex::new(Vec::new()) }
    }

    /// Responses validated so far.
    pub fn seen(&self) -> Vec<String> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl TurnValidator for ScriptedValidator {
    async fn validate(&self, _criteria: &str, _task: &str, response: &str) -> Result<Verdict> {
        lock(&self.seen).push(response.to_string());
        Ok(lock(&self.verdicts).pop_front().unwrap_or_else(Verdict::pass))
    }
}
