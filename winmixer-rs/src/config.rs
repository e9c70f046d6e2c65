//! Knob binding configuration.
//!
//! Loaded from a TOML file listing one `[[encoder]]` table per knob, in
//! encoder order:
//!
//! ```toml
//! [[encoder]]
//! target = "DEVICE"
//! step = 5
//!
//! [[encoder]]
//! target = "Spotify"
//! ```

use crate::audio::Target;
use crate::controller::protocol::MAX_ENCODER;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Percent per detent when a binding does not say.
pub const DEFAULT_STEP: i32 = 2;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid step {step} for encoder {encoder}")]
    InvalidStep { encoder: usize, step: i32 },

    #[error("{count} encoders configured, the controller addresses at most {max}")]
    TooManyEncoders { count: usize, max: usize },
}

/// What one encoder controls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncoderBinding {
    /// `DEVICE`, `SYSTEM` or a process name
    pub target: Target,

    /// Volume change per detent, in percent
    #[serde(default = "default_step")]
    pub step: i32,
}

fn default_step() -> i32 {
    DEFAULT_STEP
}

/// Controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ControllerConfig {
    #[serde(default, rename = "encoder")]
    pub encoders: Vec<EncoderBinding>,
}

impl ControllerConfig {
    /// Parse configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        let max = usize::from(MAX_ENCODER) + 1;
        if config.encoders.len() > max {
            return Err(ConfigError::TooManyEncoders {
                count: config.encoders.len(),
                max,
            });
        }
        for (encoder, binding) in config.encoders.iter().enumerate() {
            if binding.step <= 0 {
                return Err(ConfigError::InvalidStep {
                    encoder,
                    step: binding.step,
                });
            }
        }
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}
