//! Audio module for Windows Core Audio API interactions.
//!
//! This module resolves logical targets (the device, system sounds or a
//! program) to volume surfaces and exposes them through [`Mixer`].

pub mod backend;
pub mod device;
#[cfg(windows)]
pub mod enumerator;
pub mod mixer;
#[cfg(windows)]
pub mod processes;
pub mod session;
pub mod sim;
pub mod target;
pub mod volume;
#[cfg(windows)]
pub mod wasapi;

pub use backend::{AudioEndpoint, AudioStream, ProcessSnapshot, ProcessTable, SYSTEM_SOUNDS_PID};
pub use device::{AudioDevice, AudioError, AudioResult, DataFlow};
#[cfg(windows)]
pub use enumerator::{ComGuard, DeviceEnumerator};
pub use mixer::Mixer;
pub use session::SessionResolver;
pub use target::Target;
pub use volume::{VolumeControl, VolumeSurface};
#[cfg(windows)]
pub use wasapi::{SystemMixer, WasapiDevice};
