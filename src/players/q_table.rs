#![allow(dead_code)]
use std::collections::HashMap;
use std::hash::Hash;

use crate::engine::Direction;

/// One observed step: taking `action` in `state` led to `next_state`,
/// where `next_action` was then chosen.
pub struct Transition<'a, S> {
    pub state: &'a S,
    pub action: Direction,
    pub reward: f64,
    pub next_state: &'a S,
    pub next_action: Direction,
}

/// Q-values keyed by (state, action); unseen keys are worth 0.0.
#[derive(Debug, Clone)]
pub struct QTable<S> {
    values: HashMap<S, HashMap<Direction, f64>>,
}

impl<S> Default for QTable<S> {
    fn default() -> Self {
        QTable {
            values: HashMap::new(),
        }
    }
}

impl<S: Clone + Eq + Hash> QTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read without inserting.
    pub fn value(&self, state: &S, action: Direction) -> f64 {
        self.values
            .get(state)
            .and_then(|row| row.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Read, inserting 0.0 if the key is new.
    pub fn probe(&mut self, state: &S, action: Direction) -> f64 {
        if let Some(row) = self.values.get_mut(state) {
            return *row.entry(action).or_insert(0.0);
        }
        self.values
            .entry(state.clone())
            .or_default()
            .insert(action, 0.0);
        0.0
    }

    pub fn contains(&self, state: &S, action: Direction) -> bool {
        self.values
            .get(state)
            .is_some_and(|row| row.contains_key(&action))
    }

    pub fn set(&mut self, state: &S, action: Direction, value: f64) {
        match self.values.get_mut(state) {
            Some(row) => {
                row.insert(action, value);
            }
            None => {
                self.values
                    .entry(state.clone())
                    .or_default()
                    .insert(action, value);
            }
        }
    }

    /// Best of `candidates` at `state`, starting from `default`.
    ///
    /// A candidate replaces the running best only if its value is strictly
    /// greater, so ties stay with `default` and then with the earliest
    /// candidate. Every probed key is materialized.
    pub fn best_action(
        &mut self,
        state: &S,
        default: Direction,
        candidates: &[Direction],
    ) -> (Direction, f64) {
        let mut best = default;
        let mut best_value = self.probe(state, default);
        for &action in candidates {
            let value = self.probe(state, action);
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        (best, best_value)
    }

    /// One-step Q-learning:
    /// Q(s,a) += alpha * (r + gamma * max_a' Q(s',a') - Q(s,a)).
    ///
    /// The max over `next_actions` starts from Q(s', next_action). Returns
    /// the temporal difference.
    pub fn q_learning_update(
        &mut self,
        transition: Transition<'_, S>,
        next_actions: &[Direction],
        alpha: f64,
        gamma: f64,
    ) -> f64 {
        self.probe(transition.next_state, transition.next_action);
        let current = self.probe(transition.state, transition.action);
        let (_, best_next) =
            self.best_action(transition.next_state, transition.next_action, next_actions);
        let temporal_difference = transition.reward + gamma * best_next - current;
        self.set(
            transition.state,
            transition.action,
            current + alpha * temporal_difference,
        );
        temporal_difference
    }

    /// Number of stored (state, action) entries.
    pub fn len(&self) -> usize {
        self.values.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, Direction, f64)> + '_ {
        self.values
            .iter()
            .flat_map(|(state, row)| row.iter().map(move |(a, v)| (state, *a, *v)))
    }
}
