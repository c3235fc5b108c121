use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Learning parameters of the Q-learning player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// Learning rate.
    pub alpha: f64,
    /// Probability of acting randomly instead of greedily.
    pub epsilon: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Episodes to learn for before the policy is frozen.
    pub num_training: u32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            alpha: 0.35,
            epsilon: 0.1,
            gamma: 0.8,
            num_training: 10,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_alpha(self.alpha)?;
        validate_epsilon(self.epsilon)?;
        validate_gamma(self.gamma)
    }
}

pub fn validate_alpha(alpha: f64) -> Result<(), ConfigError> {
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(ConfigError::Validation(format!(
            "alpha must be finite and >= 0, got {}",
            alpha
        )));
    }
    Ok(())
}

pub fn validate_epsilon(epsilon: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&epsilon) {
        return Err(ConfigError::Validation(format!(
            "epsilon must be in [0, 1], got {}",
            epsilon
        )));
    }
    Ok(())
}

pub fn validate_gamma(gamma: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&gamma) {
        return Err(ConfigError::Validation(format!(
            "gamma must be in [0, 1], got {}",
            gamma
        )));
    }
    Ok(())
}

/// How many games to play and on which board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total games, training games included.
    pub num_games: u32,
    pub layout: String,
    pub seed: u64,
    /// Turn cap per game; a game that hits it ends without an outcome.
    pub max_steps: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            num_games: 20,
            layout: "small_grid".to_string(),
            seed: 0,
            max_steps: 1000,
        }
    }
}

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: Hyperparameters,
    pub run: RunConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Falls back to defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agent.validate()?;
        if self.run.num_games == 0 {
            return Err(ConfigError::Validation("run.num_games must be > 0".into()));
        }
        if self.run.max_steps == 0 {
            return Err(ConfigError::Validation("run.max_steps must be > 0".into()));
        }
        if self.agent.num_training > self.run.num_games {
            warn!(
                num_training = self.agent.num_training,
                num_games = self.run.num_games,
                "fewer games than training episodes, no evaluation games will be played"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(0.35, config.agent.alpha);
        assert_eq!(0.1, config.agent.epsilon);
        assert_eq!(0.8, config.agent.gamma);
        assert_eq!(10, config.agent.num_training);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [agent]
            alpha = 0.5
            num_training = 3

            [run]
            layout = "medium_grid"
            "#,
        )
        .unwrap();
        assert_eq!(0.5, config.agent.alpha);
        assert_eq!(0.1, config.agent.epsilon);
        assert_eq!(3, config.agent.num_training);
        assert_eq!("medium_grid", config.run.layout);
        assert_eq!(20, config.run.num_games);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = AppConfig::from_toml("[agent]\nepsilon = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{:?}", err);

        let err = AppConfig::from_toml("[agent]\ngamma = -0.1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{:?}", err);

        let err = AppConfig::from_toml("[agent]\nalpha = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{:?}", err);

        let err = AppConfig::from_toml("[run]\nnum_games = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{:?}", err);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = AppConfig::from_toml(include_str!("../qlearner.toml")).unwrap();
        assert_eq!(2000, config.agent.num_training);
        assert_eq!(2010, config.run.num_games);
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = AppConfig::from_toml("[agent\nalpha = 0.5").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)), "{:?}", err);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            AppConfig::load_or_default(Path::new("/nonexistent/grid_qlearner.toml")).unwrap();
        assert_eq!(AppConfig::default(), config);
    }
}
