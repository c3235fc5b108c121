#![allow(dead_code)]
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::SplitMix64;
use tracing::{debug, info, trace};

use crate::config::{self, Hyperparameters};
use crate::engine::{Direction, GameState};
use crate::error::{ConfigError, Error, Result};
use crate::players::player::{playable_actions, Player};
use crate::players::q_table::{QTable, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Training,
    // alpha and epsilon pinned to zero
    Evaluation,
}

/// The last two (state, action) observations.
#[derive(Debug, Clone)]
struct History<S> {
    previous: Option<(S, Direction)>,
    current: Option<(S, Direction)>,
}

impl<S> History<S> {
    fn new() -> Self {
        History {
            previous: None,
            current: None,
        }
    }

    fn advance(&mut self, state: S, action: Direction) {
        self.previous = self.current.take();
        self.current = Some((state, action));
    }

    fn clear(&mut self) {
        self.previous = None;
        self.current = None;
    }
}

/// Tabular Q-learning with epsilon-greedy exploration.
///
/// Learning runs one transition behind play: each observed state completes
/// the transition started on the previous turn, and that transition is the
/// one updated.
pub struct QLearningPlayer<S> {
    params: Hyperparameters,
    q_table: QTable<S>,
    history: History<S>,
    episodes_so_far: u32,
    mode: Mode,
    rng: SplitMix64,
}

impl<S: GameState> QLearningPlayer<S> {
    pub fn new(params: Hyperparameters, seed: u64) -> std::result::Result<Self, ConfigError> {
        params.validate()?;
        Ok(QLearningPlayer {
            params,
            q_table: QTable::new(),
            history: History::new(),
            episodes_so_far: 0,
            mode: Mode::Training,
            rng: SplitMix64::seed_from_u64(seed),
        })
    }

    pub fn alpha(&self) -> f64 {
        self.params.alpha
    }

    pub fn set_alpha(&mut self, value: f64) -> std::result::Result<(), ConfigError> {
        config::validate_alpha(value)?;
        self.params.alpha = value;
        Ok(())
    }

    pub fn epsilon(&self) -> f64 {
        self.params.epsilon
    }

    pub fn set_epsilon(&mut self, value: f64) -> std::result::Result<(), ConfigError> {
        config::validate_epsilon(value)?;
        self.params.epsilon = value;
        Ok(())
    }

    pub fn gamma(&self) -> f64 {
        self.params.gamma
    }

    pub fn set_gamma(&mut self, value: f64) -> std::result::Result<(), ConfigError> {
        config::validate_gamma(value)?;
        self.params.gamma = value;
        Ok(())
    }

    pub fn num_training(&self) -> u32 {
        self.params.num_training
    }

    pub fn episodes_so_far(&self) -> u32 {
        self.episodes_so_far
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn q_table(&self) -> &QTable<S> {
        &self.q_table
    }

    /// Counts a finished episode and freezes the policy once training is done.
    pub fn increment_episodes_so_far(&mut self) {
        self.episodes_so_far += 1;
        if self.mode == Mode::Training && self.episodes_so_far >= self.params.num_training {
            info!(
                episodes = self.episodes_so_far,
                "training done (turning off epsilon and alpha)"
            );
            self.params.alpha = 0.0;
            self.params.epsilon = 0.0;
            self.mode = Mode::Evaluation;
        }
    }

    /// Learns from the transition that ends in the current observation.
    fn update(&mut self) {
        let Some((state, action)) = self.history.current.as_ref() else {
            return;
        };
        self.q_table.probe(state, *action);
        let Some((prev_state, prev_action)) = self.history.previous.as_ref() else {
            trace!("no previous transition, skipping update");
            return;
        };

        let reward = state.score() - prev_state.score();
        let temporal_difference = self.q_table.q_learning_update(
            Transition {
                state: prev_state,
                action: *prev_action,
                reward,
                next_state: state,
                next_action: *action,
            },
            &playable_actions(state),
            self.params.alpha,
            self.params.gamma,
        );
        trace!(
            reward,
            temporal_difference,
            action = %prev_action,
            "updated q-value"
        );
    }
}

impl<S: GameState> Player<S> for QLearningPlayer<S> {
    fn choose_action(&mut self, state: &S) -> Result<Direction> {
        let legal = playable_actions(state);
        debug!(
            legal = %legal.iter().join(", "),
            position = %state.agent_position(),
            ghosts = ?state.adversary_positions(),
            score = state.score(),
            "choosing action"
        );

        // Drawn before the greedy check so the RNG stream does not depend on epsilon
        let random_pick = *legal.choose(&mut self.rng).ok_or(Error::NoLegalActions)?;
        let pick = if self.rng.gen_bool(1.0 - self.params.epsilon) {
            self.q_table.best_action(state, random_pick, &legal).0
        } else {
            random_pick
        };

        self.history.advance(state.clone(), pick);
        self.update();
        Ok(pick)
    }

    fn final_state(&mut self, state: &S) {
        self.history.advance(state.clone(), Direction::Stop);
        self.update();
        self.history.clear();

        self.increment_episodes_so_far();
        info!(
            episode = self.episodes_so_far,
            score = state.score(),
            table_size = self.q_table.len(),
            "game ended"
        );
    }
}
