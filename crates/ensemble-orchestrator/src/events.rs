//! Run event model for streaming progress to callers.
//!
//! Drivers emit these on an optional `broadcast` channel. Sends never block
//! and a missing or lagging receiver never affects the run.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::lifecycle::RunStatus;
use crate::turn::TurnStatus;

/// Progress events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// The driver started (or resumed) iterating.
    RunStarted { run_id: String, strategy: String, agents: Vec<String> },

    /// A new round began.
    RoundStarted { run_id: String, round: u32, order: Vec<String> },

    /// An agent is about to take its turn.
    TurnStarted { run_id: String, round: u32, step: u32, agent: String },

    /// An agent finished its turn.
    TurnFinished {
        run_id: String,
        agent: String,
        status: TurnStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },

    /// A turn changed the context sets.
    ContextUpdated { run_id: String, added: Vec<String>, edited: Vec<String> },

    /// The run parked at a step boundary.
    Paused { run_id: String },

    /// A paused run continued.
    Resumed { run_id: String },

    /// The run is waiting on the user or a credential.
    Suspended { run_id: String, status: RunStatus, agent: String, message: String },

    /// The run reached a terminal status.
    RunFinished {
        run_id: String,
        status: RunStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Optional event sink shared by the drivers.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<broadcast::Sender<RunEvent>>,
}

impl EventSink {
    /// Sink that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sink that forwards to `tx`.
    pub fn new(tx: broadcast::Sender<RunEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Emit an event; a send with no receivers is ignored.
    pub fn emit(&self, event: RunEvent) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(RunEvent::Paused { run_id: "r1".to_string() }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "paused", "run_id": "r1"}));

        let json = serde_json::to_value(RunEvent::RunFinished {
            run_id: "r1".to_string(),
            status: RunStatus::Completed,
            error: None,
        })
        .unwrap();
        assert_eq!(json["status"], "completed");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_sink_forwards_and_tolerates_no_receivers() {
        let (tx, mut rx) = broadcast::channel(8);
        let sink = EventSink::new(tx);
        sink.emit(RunEvent::Resumed { run_id: "r1".to_string() });
        assert_eq!(rx.recv().await.unwrap(), RunEvent::Resumed { run_id: "r1".to_string() });

        drop(rx);
        sink.emit(RunEvent::Paused { run_id: "r1".to_string() });
        EventSink::disabled().emit(RunEvent::Paused { run_id: "r1".to_string() });
    }
}
