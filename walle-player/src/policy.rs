use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use walle_core::{Action, Direction};

/// Trait for action selection policies
pub trait Policy: Send {
    /// Pick the next command given whether the robot holds the flower
    fn select_action(&mut self, carries_flower: bool) -> (Action, Direction);
}

/// Random policy that picks uniformly among the actions that are not
/// guaranteed no-ops for the current carry state
pub struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn select_action(&mut self, carries_flower: bool) -> (Action, Direction) {
        let actions: &[Action] = if carries_flower {
            &[Action::Move, Action::DropFlower]
        } else {
            &[Action::Move, Action::CleanDebris, Action::PickUpFlower]
        };

        let action = actions[self.rng.gen_range(0..actions.len())];
        let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        (action, direction)
    }
}
