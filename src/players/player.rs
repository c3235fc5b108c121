use crate::engine::{Direction, GameState};
use crate::error::Result;

pub trait Player<S: GameState> {
    /// Called once per turn; must return one of the state's legal actions.
    fn choose_action(&mut self, state: &S) -> Result<Direction>;

    /// Called once when a game ends, with the terminal state.
    fn final_state(&mut self, state: &S);
}

/// Legal actions with `Stop` filtered out, in enumeration order.
pub fn playable_actions<S: GameState>(state: &S) -> Vec<Direction> {
    state
        .legal_actions()
        .into_iter()
        .filter(|a| *a != Direction::Stop)
        .collect()
}
