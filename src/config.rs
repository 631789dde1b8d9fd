use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::poll::PollIntervals;
use crate::viewport::Viewport;

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_viewport() -> Viewport {
    Viewport::new(0, 0, 50, 50)
}

fn default_live_interval_ms() -> u64 {
    2500
}

fn default_history_interval_ms() -> u64 {
    10_000
}

fn default_deaths_interval_ms() -> u64 {
    30_000
}

fn default_season_interval_ms() -> u64 {
    60_000
}

fn default_history_limit() -> u32 {
    100
}

fn default_smoothing() -> f64 {
    0.1
}

fn default_hit_tolerance() -> f64 {
    1.5
}

fn default_frame_ms() -> u64 {
    33
}

/// Viewer configuration, loaded from YAML. Every field has a default so an
/// empty file (or no file) is a valid configuration; CLI flags override the
/// loaded values afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,
    #[serde(default = "default_live_interval_ms")]
    pub live_interval_ms: u64,
    #[serde(default = "default_history_interval_ms")]
    pub history_interval_ms: u64,
    #[serde(default = "default_deaths_interval_ms")]
    pub deaths_interval_ms: u64,
    #[serde(default = "default_season_interval_ms")]
    pub season_interval_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Per-frame fraction of remaining distance a critter closes toward its
    /// polled position. Must lie strictly between 0 and 1.
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    /// Selection slack around a drawn marker, in surface cells.
    #[serde(default = "default_hit_tolerance")]
    pub hit_tolerance: f64,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            viewport: default_viewport(),
            live_interval_ms: default_live_interval_ms(),
            history_interval_ms: default_history_interval_ms(),
            deaths_interval_ms: default_deaths_interval_ms(),
            season_interval_ms: default_season_interval_ms(),
            history_limit: default_history_limit(),
            smoothing: default_smoothing(),
            hit_tolerance: default_hit_tolerance(),
            frame_ms: default_frame_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

impl ViewerConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Validation(
                "viewport width and height must be positive".into(),
            ));
        }
        if !(self.smoothing > 0.0 && self.smoothing < 1.0) {
            return Err(ConfigError::Validation(format!(
                "smoothing must lie strictly between 0 and 1, got {}",
                self.smoothing
            )));
        }
        if self.hit_tolerance < 0.0 {
            return Err(ConfigError::Validation(
                "hit_tolerance must not be negative".into(),
            ));
        }
        for (name, value) in [
            ("live_interval_ms", self.live_interval_ms),
            ("history_interval_ms", self.history_interval_ms),
            ("deaths_interval_ms", self.deaths_interval_ms),
            ("season_interval_ms", self.season_interval_ms),
            ("frame_ms", self.frame_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn poll_intervals(&self) -> PollIntervals {
        PollIntervals {
            live: Duration::from_millis(self.live_interval_ms),
            history: Duration::from_millis(self.history_interval_ms),
            deaths: Duration::from_millis(self.deaths_interval_ms),
            season: Duration::from_millis(self.season_interval_ms),
            history_limit: self.history_limit,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}
