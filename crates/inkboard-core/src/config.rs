//! Tunable canvas parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`CanvasConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Hit-test distances, split out so predicates don't need the whole config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitConfig {
    /// Half-width of the clickable frame around rectangles and ovals.
    pub frame_margin: f64,
    /// Slack added to the stroke width when testing lines.
    pub line_slack: f64,
}

impl HitConfig {
    pub const DEFAULT_FRAME_MARGIN: f64 = 100.0;
    pub const DEFAULT_LINE_SLACK: f64 = 50.0;
}

impl Default for HitConfig {
    fn default() -> Self {
        Self {
            frame_margin: Self::DEFAULT_FRAME_MARGIN,
            line_slack: Self::DEFAULT_LINE_SLACK,
        }
    }
}

/// Canvas-wide configuration.
///
/// Every field has a default, so a partial JSON object such as
/// `{"history_limit": 200}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Hit-test distances.
    pub hit: HitConfig,
    /// Upper bound for stroke widths.
    pub max_stroke_width: f64,
    /// Maximum number of undo entries (None = unlimited).
    pub history_limit: Option<usize>,
}

impl CanvasConfig {
    pub const MAX_STROKE_WIDTH: f64 = 140.0;
    pub const DEFAULT_STROKE_WIDTH: f64 = 4.0;

    /// Parse a config from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values the hit tester and history can't work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hit.frame_margin.is_finite() || self.hit.frame_margin < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "frame_margin must be a non-negative number, got {}",
                self.hit.frame_margin
            )));
        }
        if !self.hit.line_slack.is_finite() || self.hit.line_slack < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "line_slack must be a non-negative number, got {}",
                self.hit.line_slack
            )));
        }
        if !self.max_stroke_width.is_finite() || self.max_stroke_width <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_stroke_width must be positive, got {}",
                self.max_stroke_width
            )));
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::Invalid("history_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Clamp a stroke width into `[0, max_stroke_width]`.
    pub fn clamp_stroke_width(&self, width: f64) -> f64 {
        clamp_width(width, self.max_stroke_width)
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            hit: HitConfig::default(),
            max_stroke_width: Self::MAX_STROKE_WIDTH,
            history_limit: None,
        }
    }
}

/// NaN collapses to zero.
pub(crate) fn clamp_width(width: f64, max: f64) -> f64 {
    if width.is_nan() { 0.0 } else { width.clamp(0.0, max) }
}
