// Randomized order
//
// The order is shuffled once when a round starts and kept in the run state,
// so a suspended run resumes the same round in the same order. With a seed
// the shuffle of every round is reproducible.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::{AgentDescriptor, WorkflowStrategy};
use crate::drivers::WorkflowDriver;
use crate::state::RunState;

/// Every agent once per round, reshuffled every round
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDriver;

impl WorkflowDriver for RandomDriver {
    fn strategy(&self) -> WorkflowStrategy {
        WorkflowStrategy::Random
    }

    fn round_order(&self, round: u32, team: &[AgentDescriptor], state: &RunState) -> Vec<String> {
        let mut order: Vec<String> = team.iter().map(|agent| agent.name.clone()).collect();
        match state.config.random_seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(round)));
                order.shuffle(&mut rng);
            }
            None => order.shuffle(&mut rand::thread_rng()),
        }
        order
    }
}
