use std::{fmt, time::Duration};

use bevy::prelude::*;
use serde::Deserialize;

use crate::systems::media::AcquisitionError;

pub const DEFAULT_TRIGGER_URL: &str = "https://www.google.com";
pub const CONFIG_ENV_VAR: &str = "CAMERA_WIDGET_CONFIG";

/// Preferred capture shape passed to the media collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub audio: bool,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            audio: false,
        }
    }
}

#[derive(Resource, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub poll_interval_ms: u64,
    pub finger_threshold: u32,
    pub required_consecutive_hits: u32,
    pub max_finger_count: u32,
    pub trigger_url: String,
    pub status_flash_ms: u64,
    pub video: VideoConstraints,
    pub clamp_drag_to_viewport: bool,
    pub detector_seed: Option<u64>,
    /// Reason name (`permission-denied`, `NotAllowedError`, ...) the simulated
    /// camera fails with instead of granting a stream.
    pub simulated_failure: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            finger_threshold: 5,
            required_consecutive_hits: 3,
            max_finger_count: 5,
            trigger_url: DEFAULT_TRIGGER_URL.to_string(),
            status_flash_ms: 2000,
            video: VideoConstraints::default(),
            clamp_drag_to_viewport: false,
            detector_seed: None,
            simulated_failure: None,
        }
    }
}

impl WidgetConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn status_flash(&self) -> Duration {
        Duration::from_millis(self.status_flash_ms)
    }

    /// Hint shown under the progress bar while no status message is flashing.
    pub fn gesture_hint(&self) -> String {
        format!(
            "Show {} fingers to open {}",
            self.finger_threshold,
            display_host(&self.trigger_url)
        )
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: WidgetConfig = serde_json::from_str(source)
            .map_err(|error| ConfigError::Parse(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `CAMERA_WIDGET_CONFIG` when present. An unset variable yields the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(source) => Self::from_json_str(&source),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Returns `self` when valid, otherwise logs the problem and falls back to the defaults.
    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(error) => {
                warn!("Ignoring invalid widget config: {}", error);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.finger_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.finger_threshold > self.max_finger_count {
            return Err(ConfigError::UnreachableThreshold {
                threshold: self.finger_threshold,
                max: self.max_finger_count,
            });
        }
        if self.required_consecutive_hits == 0 {
            return Err(ConfigError::ZeroRequiredHits);
        }
        if self.trigger_url.trim().is_empty() {
            return Err(ConfigError::EmptyTriggerUrl);
        }
        if let Some(reason) = &self.simulated_failure {
            if AcquisitionError::from_reason(reason).is_none() {
                return Err(ConfigError::UnknownFailureReason(reason.clone()));
            }
        }
        Ok(())
    }
}

/// Strips the scheme and any trailing slash, `https://www.google.com/` -> `www.google.com`.
pub fn display_host(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme.trim_end_matches('/')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    ZeroPollInterval,
    ZeroThreshold,
    UnreachableThreshold { threshold: u32, max: u32 },
    ZeroRequiredHits,
    EmptyTriggerUrl,
    UnknownFailureReason(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "failed to parse widget config: {message}"),
            Self::ZeroPollInterval => write!(f, "poll_interval_ms must be greater than zero"),
            Self::ZeroThreshold => write!(f, "finger_threshold must be greater than zero"),
            Self::UnreachableThreshold { threshold, max } => write!(
                f,
                "finger_threshold {threshold} can never be reached with max_finger_count {max}"
            ),
            Self::ZeroRequiredHits => {
                write!(f, "required_consecutive_hits must be greater than zero")
            }
            Self::EmptyTriggerUrl => write!(f, "trigger_url must not be empty"),
            Self::UnknownFailureReason(reason) => {
                write!(f, "unknown camera failure reason {reason:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
