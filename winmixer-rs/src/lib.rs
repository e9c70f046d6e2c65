//! WinMixer - Library
//!
//! Volume and mute control for Windows audio at three levels.
//!
//! ## Features
//!
//! - Control the whole output device, the system sounds session, or any
//!   program with an audio session, by name
//! - Case-insensitive program matching that tolerates programs exiting
//!   mid-lookup
//! - Absent targets reported as `None`, never as errors
//! - Hardware volume knobs over a serial line protocol
//! - In-memory simulator backend for running without Windows

pub mod audio;
pub mod config;
pub mod controller;

pub use audio::{AudioDevice, AudioError, AudioResult, DataFlow, Mixer, Target, VolumeControl};
#[cfg(windows)]
pub use audio::{ComGuard, DeviceEnumerator, SystemMixer};
pub use config::{ConfigError, ControllerConfig, EncoderBinding};
pub use controller::KnobController;
