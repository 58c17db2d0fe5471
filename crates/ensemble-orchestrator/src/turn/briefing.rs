// Agent briefings
//
// The briefing is the system text an agent reasons under. Builders are pure:
// they only read the turn input and the decision contract.

use std::fmt::Write;

use crate::turn::{DecisionContract, RoutingMode, TurnInput};

/// Renders the system briefing for a turn
pub trait BriefingBuilder: Send + Sync {
    /// Briefing text for `input` under `contract`
    fn build(&self, input: &TurnInput, contract: &DecisionContract) -> String;
}

/// Compact briefing: identity, objective, team, context, routing rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBriefing;

impl BriefingBuilder for DefaultBriefing {
    fn build(&self, input: &TurnInput, contract: &DecisionContract) -> String {
        let agent = &input.agent;
        let snapshot = &input.snapshot;
        let mut text = String::new();

        let _ = write!(text, "You are {}, a {} agent", agent.name, agent.role);
        if !snapshot.team_name.is_empty() {
            let _ = write!(text, " on team {}", snapshot.team_name);
        }
        text.push_str(".\n");
        if !snapshot.objective.is_empty() {
            let _ = writeln!(text, "Objective: {}", snapshot.objective);
        }
        let _ = writeln!(text, "Round {} of {}.", snapshot.round + 1, snapshot.max_rounds);
        if let Some(instructions) = &agent.instructions {
            let _ = writeln!(text, "\n{}", instructions.trim());
        }

        let others: Vec<_> = input.team.iter().filter(|peer| peer.name != agent.name).collect();
        if !others.is_empty() {
            text.push_str("\nTeam:\n");
            for peer in others {
                let _ = writeln!(text, "- {} ({})", peer.name, peer.role);
            }
        }

        if let Some(summary) = &snapshot.summary {
            let _ = writeln!(text, "\nSummary so far:\n{}", summary.trim());
        }

        if !input.context_sets.is_empty() {
            text.push_str("\nShared context:\n");
            for set in &input.context_sets {
                let _ = writeln!(text, "## {}\n{}", set.name, set.text.trim());
            }
        }

        if let Some(criteria) = &input.acceptance_criteria {
            let _ = writeln!(text, "\nYour response must satisfy: {}", criteria.trim());
        }

        text.push_str(
            "\nReply with a JSON object. Put your answer in \"response\". Use \"newContextSets\" \
             to share new context and \"editedContextSets\" (by \"originalSetName\") to update it. \
             Set \"isUserInputRequest\" when you need information from the user and \
             \"workflowComplete\" when the objective is met.\n",
        );
        match contract.routing {
            RoutingMode::None => {}
            RoutingMode::Optional => {
                let _ = writeln!(
                    text,
                    "You may set \"recipient\" to hand over to one of: {}, or \"user\".",
                    contract.recipients.join(", ")
                );
            }
            RoutingMode::Required => {
                let _ = writeln!(
                    text,
                    "You must set \"recipient\" to one of: {}, or \"user\".",
                    contract.recipients.join(", ")
                );
            }
        }

        text
    }
}
