use rand::SeedableRng;
use rand_xoshiro::SplitMix64;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::engine::{GridState, Layout, Outcome, TransitionResult};
use crate::error::{Error, Result};
use crate::players::player::Player;

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    pub score: f64,
    // None when the step cap ended the game
    pub outcome: Option<Outcome>,
    pub steps: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub training_games: u32,
    pub evaluation: Vec<EpisodeRecord>,
}

impl RunSummary {
    pub fn average_score(&self) -> Option<f64> {
        if self.evaluation.is_empty() {
            return None;
        }
        let total: f64 = self.evaluation.iter().map(|r| r.score).sum();
        Some(total / self.evaluation.len() as f64)
    }

    pub fn wins(&self) -> usize {
        self.count(Outcome::Win)
    }

    pub fn losses(&self) -> usize {
        self.count(Outcome::Lose)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.evaluation
            .iter()
            .filter(|r| r.outcome == Some(outcome))
            .count()
    }
}

/// Plays one game to completion, or until `max_steps` turns have passed.
///
/// The player always sees the final state, including on a timeout.
pub fn play_episode<P: Player<GridState>>(
    player: &mut P,
    layout: &Layout,
    rng: &mut SplitMix64,
    max_steps: u32,
) -> Result<EpisodeRecord> {
    let mut state = layout.initial_state();
    let mut steps = 0;

    while !state.is_complete() && steps < max_steps {
        let action = player.choose_action(&state)?;
        if let TransitionResult::IllegalMove(reason) = state.transition(action, rng) {
            return Err(Error::IllegalMove { action, reason });
        }
        steps += 1;
    }
    state.display();

    if !state.is_complete() {
        warn!(steps, score = state.score, "game hit the step limit");
    }
    player.final_state(&state);

    Ok(EpisodeRecord {
        score: state.score as f64,
        outcome: state.outcome,
        steps,
    })
}

/// Plays `run.num_games` games; the first `num_training` are left out of the summary.
pub fn run_games<P: Player<GridState>>(
    player: &mut P,
    run: &RunConfig,
    num_training: u32,
) -> Result<RunSummary> {
    let layout = Layout::by_name(&run.layout)?;
    let mut rng = SplitMix64::seed_from_u64(run.seed);
    let mut summary = RunSummary::default();

    for game in 0..run.num_games {
        let record = play_episode(player, &layout, &mut rng, run.max_steps)?;
        if game < num_training {
            summary.training_games += 1;
            if (game + 1) % 100 == 0 {
                info!(completed = game + 1, "training games played");
            }
        } else {
            info!(
                game = game + 1,
                score = record.score,
                outcome = ?record.outcome,
                steps = record.steps,
                "evaluation game"
            );
            summary.evaluation.push(record);
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Hyperparameters;
    use crate::engine::{Direction, GameState, FOOD_REWARD, TIME_PENALTY, WIN_REWARD};
    use crate::players::qlearning_player::{Mode, QLearningPlayer};

    fn learner(num_training: u32, seed: u64) -> QLearningPlayer<GridState> {
        QLearningPlayer::new(
            Hyperparameters {
                num_training,
                ..Hyperparameters::default()
            },
            seed,
        )
        .unwrap()
    }

    /// Walks into walls on purpose.
    struct WallWalker;

    impl Player<GridState> for WallWalker {
        fn choose_action(&mut self, _state: &GridState) -> Result<Direction> {
            Ok(Direction::West)
        }

        fn final_state(&mut self, _state: &GridState) {}
    }

    #[test]
    fn test_play_episode_small_grid() {
        let layout = Layout::by_name("small_grid").unwrap();
        let mut rng = SplitMix64::seed_from_u64(1);
        let mut player = learner(10, 1);
        let record = play_episode(&mut player, &layout, &mut rng, 500).unwrap();
        assert!(record.steps > 0);
        assert!(record.steps <= 500);
        assert_eq!(1, player.episodes_so_far());
        assert!(!player.q_table().is_empty());
    }

    #[test]
    fn test_step_limit_still_ends_episode() {
        let layout = Layout::by_name("medium_grid").unwrap();
        let mut rng = SplitMix64::seed_from_u64(2);
        let mut player = learner(10, 2);
        let record = play_episode(&mut player, &layout, &mut rng, 1).unwrap();
        assert_eq!(1, record.steps);
        assert_eq!(1, player.episodes_so_far());
        if record.outcome.is_none() {
            assert_eq!(-(TIME_PENALTY as f64), record.score);
        }
    }

    #[test]
    fn test_illegal_move_is_reported() {
        let layout = Layout::by_name("small_grid").unwrap();
        let mut rng = SplitMix64::seed_from_u64(0);
        let result = play_episode(&mut WallWalker, &layout, &mut rng, 10);
        assert!(
            matches!(
                result,
                Err(Error::IllegalMove {
                    action: Direction::West,
                    ..
                })
            ),
            "{:?}",
            result
        );
    }

    #[test]
    fn test_run_games_splits_training() {
        let run = RunConfig {
            num_games: 12,
            layout: "small_grid".to_string(),
            seed: 5,
            max_steps: 300,
        };
        let mut player = learner(8, 5);
        let summary = run_games(&mut player, &run, 8).unwrap();
        assert_eq!(8, summary.training_games);
        assert_eq!(4, summary.evaluation.len());
        assert!(summary.average_score().is_some());
        assert!(summary.wins() + summary.losses() <= 4);
        assert_eq!(Mode::Evaluation, player.mode());
        assert_eq!(12, player.episodes_so_far());
    }

    #[test]
    fn test_single_corridor_always_wins() {
        // One food, one legal move: every game is won in a single step
        let layout = Layout::parse("%%%%\n%P.%\n%%%%").unwrap();
        assert_eq!(
            vec![Direction::East, Direction::Stop],
            layout.initial_state().legal_actions()
        );
        let mut rng = SplitMix64::seed_from_u64(3);
        let mut player = learner(3, 3);
        for _ in 0..5 {
            let record = play_episode(&mut player, &layout, &mut rng, 10).unwrap();
            assert_eq!(Some(Outcome::Win), record.outcome);
            assert_eq!(
                (FOOD_REWARD - TIME_PENALTY + WIN_REWARD) as f64,
                record.score
            );
        }
        assert_eq!(0.0, player.alpha());
    }

    #[test]
    fn test_unknown_layout() {
        let run = RunConfig {
            layout: "nope".to_string(),
            ..RunConfig::default()
        };
        let result = run_games(&mut learner(1, 0), &run, 1);
        assert!(matches!(result, Err(Error::UnknownLayout(_))));
    }

    #[test]
    fn test_summary_stats() {
        let summary = RunSummary {
            training_games: 2,
            evaluation: vec![
                EpisodeRecord {
                    score: 500.0,
                    outcome: Some(Outcome::Win),
                    steps: 10,
                },
                EpisodeRecord {
                    score: -500.0,
                    outcome: Some(Outcome::Lose),
                    steps: 4,
                },
                EpisodeRecord {
                    score: 30.0,
                    outcome: None,
                    steps: 100,
                },
            ],
        };
        assert_eq!(Some(10.0), summary.average_score());
        assert_eq!(1, summary.wins());
        assert_eq!(1, summary.losses());
        assert_eq!(None, RunSummary::default().average_score());
    }
}
