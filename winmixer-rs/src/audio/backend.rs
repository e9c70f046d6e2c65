//! Collaborator traits between the mixer and an audio stack.
//!
//! The live Windows implementation lives in `wasapi`, an in-memory one in
//! `sim`. Resolution and mixing logic only ever see these traits.

use super::device::AudioResult;
use super::volume::{VolumeControl, VolumeSurface};
use std::collections::HashMap;

/// Process identifier reported by the system sounds session.
pub const SYSTEM_SOUNDS_PID: u32 = 0;

/// The output (or input) device a mixer is bound to.
pub trait AudioEndpoint {
    /// Whole-device volume surface.
    type Volume: VolumeSurface;

    /// Live session on this device.
    type Stream: AudioStream;

    /// Activate the device-wide volume surface.
    fn endpoint_volume(&self) -> AudioResult<Self::Volume>;

    /// Take a fresh snapshot of the sessions currently on this device.
    fn streams(&self) -> AudioResult<Vec<Self::Stream>>;
}

/// One audio session. May end at any moment.
pub trait AudioStream {
    /// Per-session volume surface.
    type Volume: VolumeSurface;

    /// Owning process, or [`SYSTEM_SOUNDS_PID`] for system sounds.
    fn process_id(&self) -> AudioResult<u32>;

    /// Activate the session's simple volume surface.
    fn simple_volume(&self) -> AudioResult<Self::Volume>;
}

/// Lookup of running processes by identifier.
pub trait ProcessTable {
    /// Names of the processes running right now.
    fn snapshot(&self) -> AudioResult<ProcessSnapshot>;
}

/// Running processes at one point in time, by identifier.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    names: HashMap<u32, String>,
}

impl ProcessSnapshot {
    /// Name of a process, or `None` if it was not running when taken.
    pub fn name(&self, pid: u32) -> Option<&str> {
        self.names.get(&pid).map(String::as_str)
    }
}

impl FromIterator<(u32, String)> for ProcessSnapshot {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Stream surface type of an endpoint.
pub type StreamVolume<D> = <<D as AudioEndpoint>::Stream as AudioStream>::Volume;

/// Volume controller for anything reachable from an endpoint.
pub type EndpointControl<D> = VolumeControl<StreamVolume<D>, <D as AudioEndpoint>::Volume>;
