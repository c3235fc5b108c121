mod config;
mod engine;
mod error;
mod players;
mod runner;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::config::AppConfig;
use crate::engine::GridState;
use crate::players::qlearning_player::QLearningPlayer;

/// Train a tabular Q-learning agent on a grid world, then play greedily.
#[derive(Parser, Debug)]
#[command(name = "qlearner")]
struct Cli {
    /// TOML config file; missing files fall back to defaults
    #[arg(long, default_value = "qlearner.toml")]
    config: PathBuf,

    #[arg(long)]
    alpha: Option<f64>,

    #[arg(long)]
    epsilon: Option<f64>,

    #[arg(long)]
    gamma: Option<f64>,

    /// Games to learn from before freezing the policy
    #[arg(long)]
    num_training: Option<u32>,

    /// Total games, training games included
    #[arg(long)]
    num_games: Option<u32>,

    #[arg(long)]
    layout: Option<String>,

    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(alpha) = self.alpha {
            config.agent.alpha = alpha;
        }
        if let Some(epsilon) = self.epsilon {
            config.agent.epsilon = epsilon;
        }
        if let Some(gamma) = self.gamma {
            config.agent.gamma = gamma;
        }
        if let Some(num_training) = self.num_training {
            config.agent.num_training = num_training;
        }
        if let Some(num_games) = self.num_games {
            config.run.num_games = num_games;
        }
        if let Some(layout) = &self.layout {
            config.run.layout = layout.clone();
        }
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cli.apply(&mut config);
    config.validate()?;
    info!(?config, "starting run");

    // Ghosts and agent draw from separate streams
    let mut player: QLearningPlayer<GridState> =
        QLearningPlayer::new(config.agent, config.run.seed.wrapping_add(1))?;
    let summary = runner::run_games(&mut player, &config.run, config.agent.num_training)?;

    println!(
        "Played {} training and {} evaluation games on {}",
        summary.training_games,
        summary.evaluation.len(),
        config.run.layout
    );
    match summary.average_score() {
        Some(average) => println!(
            "Average score: {:.1}  Wins: {}  Losses: {}",
            average,
            summary.wins(),
            summary.losses()
        ),
        None => println!("No evaluation games played"),
    }
    println!("Q-table entries: {}", player.q_table().len());

    Ok(())
}
