use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::engine::judge::JudgeWindows;

const CONFIG_FILE: &str = "beatdrop.json";

/// Fatal configuration error. The only error the core can raise: everything
/// else (a press that matches nothing, a clock that has not started) is a
/// normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// BPM must be finite and strictly positive.
    InvalidBpm(f64),
    /// Beat interval must be finite and strictly positive.
    InvalidInterval(f64),
    /// A session needs at least one scheduled beat.
    ZeroBeatCount,
    /// Lead-in must be finite and non-negative.
    InvalidLeadIn(f64),
    /// Visibility window must be finite and strictly positive.
    InvalidVisibility(f64),
    /// Judge windows must be finite, positive, and strictly ascending.
    InvalidWindows(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBpm(bpm) => write!(f, "BPM must be a positive finite number, got {bpm}"),
            Self::InvalidInterval(ms) => {
                write!(f, "beat interval must be a positive finite number of ms, got {ms}")
            }
            Self::ZeroBeatCount => write!(f, "beat count must be at least 1"),
            Self::InvalidLeadIn(ms) => {
                write!(f, "lead-in must be a non-negative finite number of ms, got {ms}")
            }
            Self::InvalidVisibility(ms) => {
                write!(f, "visibility window must be a positive finite number of ms, got {ms}")
            }
            Self::InvalidWindows(reason) => write!(f, "invalid judge windows: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Session configuration, validated once at construction time.
///
/// Replaces the original game's ad-hoc runtime patching of missing config
/// fields: a `GameConfig` that passed `validate` needs no further checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Beats per minute of the backing track.
    pub bpm: f64,
    /// Number of beats scheduled per session.
    pub beat_count: usize,
    /// Countdown buffer before the first scorable beat, in ms.
    pub lead_in_ms: f64,
    /// How far ahead of the playhead beats are visible, in ms.
    pub visibility_ms: f64,
    pub windows: JudgeWindows,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bpm: 130.0,
            beat_count: 100,
            lead_in_ms: 3000.0,
            visibility_ms: 2000.0,
            windows: JudgeWindows::default(),
        }
    }
}

impl GameConfig {
    /// Milliseconds between consecutive beats.
    pub fn beat_interval_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(ConfigError::InvalidBpm(self.bpm));
        }
        if self.beat_count == 0 {
            return Err(ConfigError::ZeroBeatCount);
        }
        if !self.lead_in_ms.is_finite() || self.lead_in_ms < 0.0 {
            return Err(ConfigError::InvalidLeadIn(self.lead_in_ms));
        }
        if !self.visibility_ms.is_finite() || self.visibility_ms <= 0.0 {
            return Err(ConfigError::InvalidVisibility(self.visibility_ms));
        }
        self.windows.validate()
    }

    /// Loads config from the default config file.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Loads config from a specified path.
    /// Returns default config if the file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves config to the default config file.
    pub fn save(&self) -> Result<()> {
        self.save_to(CONFIG_FILE)
    }

    /// Saves config to a specified path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = GameConfig::default();
        assert_eq!(config.bpm, 130.0);
        assert_eq!(config.beat_count, 100);
        assert_eq!(config.lead_in_ms, 3000.0);
        assert_eq!(config.visibility_ms, 2000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_beat_interval_for_130_bpm() {
        let config = GameConfig::default();
        assert!((config.beat_interval_ms() - 461.538).abs() < 0.001);
    }

    #[test]
    fn test_rejects_non_positive_bpm() {
        let config = GameConfig {
            bpm: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBpm(0.0)));

        let config = GameConfig {
            bpm: -130.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBpm(_))));
    }

    #[test]
    fn test_rejects_non_finite_bpm() {
        let config = GameConfig {
            bpm: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBpm(_))));
    }

    #[test]
    fn test_rejects_zero_beat_count() {
        let config = GameConfig {
            beat_count: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBeatCount));
    }

    #[test]
    fn test_rejects_negative_lead_in() {
        let config = GameConfig {
            lead_in_ms: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLeadIn(_))));
    }

    #[test]
    fn test_json_serialization() {
        let config = GameConfig {
            bpm: 174.0,
            beat_count: 256,
            lead_in_ms: 2000.0,
            visibility_ms: 1500.0,
            windows: JudgeWindows::default(),
        };

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: GameConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"bpm": 90.0}"#).unwrap();
        assert_eq!(config.bpm, 90.0);
        assert_eq!(config.beat_count, 100);
    }

    #[test]
    fn test_file_io() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.json");

        let config = GameConfig {
            bpm: 140.0,
            ..Default::default()
        };
        config.save_to(&file_path).unwrap();

        let loaded = GameConfig::load_from(&file_path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempdir().unwrap();
        let loaded = GameConfig::load_from(dir.path().join("nope.json")).unwrap();
        assert_eq!(loaded, GameConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_stored_config() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.json");
        std::fs::write(&file_path, r#"{"bpm": -1.0}"#).unwrap();
        assert!(GameConfig::load_from(&file_path).is_err());
    }
}
