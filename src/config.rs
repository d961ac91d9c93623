//! Application-level configuration loading: game limits, sign-in rewards and the admin token.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    sign_in::SignInRules,
    state_machine::{BulletMode, GameRules},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROULETTE_BACK_CONFIG_PATH";
/// Environment variable holding the token expected on admin routes.
const ADMIN_TOKEN_ENV: &str = "ROULETTE_ADMIN_TOKEN";

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Limits and defaults of the game.
    pub game: GameRules,
    /// Points and opening hours of the daily sign-in.
    pub sign_in: SignInRules,
    /// Admin routes reject every request while this is `None`.
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        max_daily_games = config.game.max_daily_games,
                        "loaded roulette rules from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.admin_token = env::var(ADMIN_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty());
        if config.admin_token.is_none() {
            warn!("{ADMIN_TOKEN_ENV} is not set; admin routes are disabled");
        }

        config
    }

    /// Parse and validate a JSON document. Omitted fields keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        Self::try_from(raw)
    }
}

/// Why a configuration document was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON for the expected shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is outside its accepted range.
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    game: RawGameRules,
    sign_in: RawSignInRules,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawGameRules {
    max_daily_games: u32,
    initiation_cooldown_secs: u64,
    min_bet: i64,
    max_bet: i64,
    default_chamber_count: u32,
    default_bet: i64,
    bullet: RawBulletMode,
}

impl Default for RawGameRules {
    fn default() -> Self {
        let rules = GameRules::default();
        Self {
            max_daily_games: rules.max_daily_games,
            initiation_cooldown_secs: rules.initiation_cooldown.whole_seconds().unsigned_abs(),
            min_bet: rules.min_bet,
            max_bet: rules.max_bet,
            default_chamber_count: rules.default_chamber_count,
            default_bet: rules.default_bet,
            bullet: RawBulletMode::Always,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum RawBulletMode {
    Always,
    Chance { probability: f64 },
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSignInRules {
    base_points: i64,
    rank_bonus: Vec<i64>,
    start_hour: u8,
    end_hour: u8,
}

impl Default for RawSignInRules {
    fn default() -> Self {
        let rules = SignInRules::default();
        Self {
            base_points: rules.base_points,
            rank_bonus: rules.rank_bonus,
            start_hour: rules.start_hour,
            end_hour: rules.end_hour,
        }
    }
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let game = value.game;
        if game.min_bet > game.max_bet {
            return Err(ConfigError::Invalid(format!(
                "min_bet {} exceeds max_bet {}",
                game.min_bet, game.max_bet
            )));
        }
        if !(game.min_bet..=game.max_bet).contains(&game.default_bet) {
            return Err(ConfigError::Invalid(format!(
                "default_bet {} is outside {}..={}",
                game.default_bet, game.min_bet, game.max_bet
            )));
        }
        if game.default_chamber_count == 0 {
            return Err(ConfigError::Invalid(
                "default_chamber_count must be at least 1".into(),
            ));
        }
        let initiation_cooldown = i64::try_from(game.initiation_cooldown_secs)
            .map(time::Duration::seconds)
            .map_err(|_| ConfigError::Invalid("initiation_cooldown_secs is too large".into()))?;
        let bullet_mode = match game.bullet {
            RawBulletMode::Always => BulletMode::Always,
            RawBulletMode::Chance { probability } if (0.0..=1.0).contains(&probability) => {
                BulletMode::Chance { probability }
            }
            RawBulletMode::Chance { probability } => {
                return Err(ConfigError::Invalid(format!(
                    "bullet probability {probability} is outside [0, 1]"
                )));
            }
        };

        let sign_in = value.sign_in;
        if sign_in.start_hour >= sign_in.end_hour || sign_in.end_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "sign-in window {}..{} is not a valid hour range",
                sign_in.start_hour, sign_in.end_hour
            )));
        }

        Ok(Self {
            game: GameRules {
                max_daily_games: game.max_daily_games,
                initiation_cooldown,
                min_bet: game.min_bet,
                max_bet: game.max_bet,
                default_chamber_count: game.default_chamber_count,
                default_bet: game.default_bet,
                bullet_mode,
            },
            sign_in: SignInRules {
                base_points: sign_in.base_points,
                rank_bonus: sign_in.rank_bonus,
                start_hour: sign_in.start_hour,
                end_hour: sign_in.end_hour,
            },
            admin_token: None,
        })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.game, GameRules::default());
        assert_eq!(config.sign_in, SignInRules::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "game": {
                    "max_daily_games": 3,
                    "initiation_cooldown_secs": 0,
                    "bullet": { "mode": "chance", "probability": 0.5 }
                },
                "sign_in": { "rank_bonus": [5] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.game.max_daily_games, 3);
        assert_eq!(config.game.initiation_cooldown, time::Duration::ZERO);
        assert_eq!(config.game.max_bet, 10);
        assert_eq!(
            config.game.bullet_mode,
            BulletMode::Chance { probability: 0.5 }
        );
        assert_eq!(config.sign_in.rank_bonus, vec![5]);
        assert_eq!(config.sign_in.base_points, 10);
    }

    #[test]
    fn inconsistent_values_are_rejected() {
        for document in [
            r#"{"game": {"min_bet": 5, "max_bet": 2}}"#,
            r#"{"game": {"default_chamber_count": 0}}"#,
            r#"{"game": {"bullet": {"mode": "chance", "probability": 1.5}}}"#,
            r#"{"sign_in": {"start_hour": 23, "end_hour": 8}}"#,
            r#"{"sign_in": {"end_hour": 25}}"#,
        ] {
            assert!(
                matches!(AppConfig::from_json(document), Err(ConfigError::Invalid(_))),
                "{document} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
