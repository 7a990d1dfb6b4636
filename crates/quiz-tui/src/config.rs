//! Layered configuration loading using figment.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. User-level `~/.config/mathquiz/config.toml`
//! 3. The file passed with `--config`
//! 4. Environment variables with the `MATHQUIZ_` prefix (`MATHQUIZ_THEME=light`)

use crate::error::ConfigError;
use crate::theme::ThemeName;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use quiz_core::{Difficulty, DEFAULT_DURATION_SECS, DEFAULT_LEADERBOARD_LIMIT, DURATION_CHOICES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where documents and the log file live
    pub data_dir: Option<PathBuf>,
    pub default_difficulty: Difficulty,
    /// Seconds, one of the offered durations
    pub default_duration: u64,
    pub leaderboard_limit: usize,
    pub theme: ThemeName,
    /// Log filter used when `MATHQUIZ_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_difficulty: Difficulty::Medium,
            default_duration: DEFAULT_DURATION_SECS,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            theme: ThemeName::Dark,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate configuration from all sources
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Config = Self::figment(explicit).extract()?;
        config.validate()
    }

    /// Build the provider chain
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("MATHQUIZ_").ignore(&["LOG", "ENV"]))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mathquiz").join("config.toml"))
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !DURATION_CHOICES.contains(&self.default_duration) {
            return Err(ConfigError::InvalidValue {
                field: "default_duration".to_string(),
                reason: format!("must be one of {:?}", DURATION_CHOICES),
            });
        }
        if self.leaderboard_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "leaderboard_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    /// Data directory, falling back to the platform's local data dir
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mathquiz")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_difficulty, Difficulty::Medium);
        assert_eq!(config.default_duration, 30);
        assert_eq!(config.leaderboard_limit, 50);
        assert_eq!(config.theme, ThemeName::Dark);
        assert!(config.data_dir().ends_with("mathquiz"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "quiz.toml",
                r#"
                    default_difficulty = "hard"
                    default_duration = 60
                    theme = "light"
                    data_dir = "/tmp/quiz-data"
                "#,
            )?;

            let config = Config::load(Some(Path::new("quiz.toml"))).unwrap();
            assert_eq!(config.default_difficulty, Difficulty::Hard);
            assert_eq!(config.default_duration, 60);
            assert_eq!(config.theme, ThemeName::Light);
            assert_eq!(config.data_dir(), PathBuf::from("/tmp/quiz-data"));
            assert_eq!(config.leaderboard_limit, 50);
            Ok(())
        });
    }

    #[test]
    fn test_env_beats_file() {
        Jail::expect_with(|jail| {
            jail.create_file("quiz.toml", "leaderboard_limit = 10")?;
            jail.set_env("MATHQUIZ_LEADERBOARD_LIMIT", "25");
            jail.set_env("MATHQUIZ_DEFAULT_DIFFICULTY", "EASY");

            let config = Config::load(Some(Path::new("quiz.toml"))).unwrap();
            assert_eq!(config.leaderboard_limit, 25);
            assert_eq!(config.default_difficulty, Difficulty::Easy);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_duration_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("MATHQUIZ_DEFAULT_DURATION", "20");
            let err = Config::load(None).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
            Ok(())
        });
    }
}
