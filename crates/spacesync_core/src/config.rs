//! Engine configuration.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `trash_distance` is finite and strictly positive.

use crate::model::space::ClippingMode;
use crate::spatial::DEFAULT_TRASH_DISTANCE;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Canvas units between the boundary's top edge and the title label.
pub const DEFAULT_TITLE_OFFSET: f64 = 48.0;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "malformed config: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Trashcan drop radius in world units.
    pub trash_distance: f64,
    /// Clipping mode for spaces that store none.
    pub default_clipping: ClippingMode,
    pub title_offset: f64,
    /// Overrides `logging::default_log_level()`.
    pub log_level: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            trash_distance: DEFAULT_TRASH_DISTANCE,
            default_clipping: ClippingMode::Clip,
            title_offset: DEFAULT_TITLE_OFFSET,
            log_level: None,
        }
    }
}

impl SyncConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.trash_distance.is_finite() || self.trash_distance <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "trash_distance",
                reason: format!("expected a positive distance, got {}", self.trash_distance),
            });
        }
        if !self.title_offset.is_finite() {
            return Err(ConfigError::Invalid {
                field: "title_offset",
                reason: "expected a finite offset".to_string(),
            });
        }
        Ok(())
    }
}
