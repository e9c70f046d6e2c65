//! In-memory audio stack.
//!
//! Stands in for WASAPI when driving the mixer without Windows: tests use it
//! to add and remove sessions and to make processes exit at awkward moments.

use super::backend::{AudioEndpoint, AudioStream, ProcessSnapshot, ProcessTable, SYSTEM_SOUNDS_PID};
use super::device::{AudioError, AudioResult};
use super::volume::VolumeSurface;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
struct Channel {
    level: f32,
    muted: bool,
    expired: bool,
}

/// A simulated volume surface. Clones share state.
#[derive(Debug, Clone)]
pub struct SimVolume {
    channel: Rc<RefCell<Channel>>,
}

impl SimVolume {
    /// Create a surface with a raw scalar and mute state.
    pub fn new(level: f32, muted: bool) -> Self {
        Self {
            channel: Rc::new(RefCell::new(Channel {
                level,
                muted,
                expired: false,
            })),
        }
    }

    /// Store a raw scalar without clamping, as a misbehaving driver might.
    pub fn force_level(&self, level: f32) {
        self.channel.borrow_mut().level = level;
    }

    fn expire(&self) {
        self.channel.borrow_mut().expired = true;
    }

    fn live(&self) -> AudioResult<std::cell::RefMut<'_, Channel>> {
        let channel = self.channel.borrow_mut();
        if channel.expired {
            return Err(AudioError::SessionExpired);
        }
        Ok(channel)
    }
}

impl VolumeSurface for SimVolume {
    fn level(&self) -> AudioResult<f32> {
        Ok(self.live()?.level)
    }

    fn set_level(&self, level: f32) -> AudioResult<()> {
        self.live()?.level = level.clamp(0.0, 1.0);
        Ok(())
    }

    fn muted(&self) -> AudioResult<bool> {
        Ok(self.live()?.muted)
    }

    fn set_muted(&self, muted: bool) -> AudioResult<()> {
        self.live()?.muted = muted;
        Ok(())
    }
}

/// A simulated audio session.
#[derive(Debug, Clone)]
pub struct SimStream {
    pid: u32,
    volume: SimVolume,
}

impl SimStream {
    /// Direct access to the session surface, bypassing resolution.
    pub fn volume(&self) -> &SimVolume {
        &self.volume
    }
}

impl AudioStream for SimStream {
    type Volume = SimVolume;

    fn process_id(&self) -> AudioResult<u32> {
        Ok(self.pid)
    }

    fn simple_volume(&self) -> AudioResult<SimVolume> {
        Ok(self.volume.clone())
    }
}

/// A simulated device with a mutable list of sessions. Clones share state.
#[derive(Debug, Clone)]
pub struct SimDevice {
    endpoint: SimVolume,
    streams: Rc<RefCell<Vec<SimStream>>>,
}

impl SimDevice {
    /// Create a device at full volume with no sessions.
    pub fn new() -> Self {
        Self {
            endpoint: SimVolume::new(1.0, false),
            streams: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Direct access to the device surface.
    pub fn endpoint(&self) -> &SimVolume {
        &self.endpoint
    }

    /// Start a session for a process at full volume.
    pub fn add_stream(&self, pid: u32) -> SimStream {
        let stream = SimStream {
            pid,
            volume: SimVolume::new(1.0, false),
        };
        self.streams.borrow_mut().push(stream.clone());
        stream
    }

    /// Start the system sounds session.
    pub fn add_system_stream(&self) -> SimStream {
        self.add_stream(SYSTEM_SOUNDS_PID)
    }

    /// End every session owned by `pid`. Surfaces already handed out expire.
    pub fn remove_streams(&self, pid: u32) {
        self.streams.borrow_mut().retain(|stream| {
            if stream.pid == pid {
                stream.volume.expire();
                false
            } else {
                true
            }
        });
    }
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEndpoint for SimDevice {
    type Volume = SimVolume;
    type Stream = SimStream;

    fn endpoint_volume(&self) -> AudioResult<SimVolume> {
        Ok(self.endpoint.clone())
    }

    fn streams(&self) -> AudioResult<Vec<SimStream>> {
        Ok(self.streams.borrow().clone())
    }
}

/// A simulated process table. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimProcesses {
    names: Rc<RefCell<HashMap<u32, String>>>,
}

impl SimProcesses {
    /// Create an empty process table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running process.
    pub fn spawn(&self, pid: u32, name: &str) {
        self.names.borrow_mut().insert(pid, name.to_string());
    }

    /// Remove a process. Its sessions stay on the device until removed there.
    pub fn exit(&self, pid: u32) {
        self.names.borrow_mut().remove(&pid);
    }
}

impl ProcessTable for SimProcesses {
    fn snapshot(&self) -> AudioResult<ProcessSnapshot> {
        Ok(self
            .names
            .borrow()
            .iter()
            .map(|(&pid, name)| (pid, name.clone()))
            .collect())
    }
}
