//! Target resolution against the live session list.
//!
//! Sessions come and go while we look at them. Every resolution takes a new
//! snapshot of the sessions and one of the running processes, walks them once
//! and stops at the first match. A session whose process has already exited
//! is skipped; the scan is never restarted.

use super::backend::{AudioEndpoint, AudioStream, EndpointControl, ProcessTable, SYSTEM_SOUNDS_PID};
use super::device::AudioResult;
use super::target::Target;
use super::volume::VolumeControl;
use tracing::{debug, trace};

/// Finds the volume surface behind a [`Target`].
pub struct SessionResolver<'a, D, P> {
    device: &'a D,
    processes: &'a P,
}

impl<'a, D: AudioEndpoint, P: ProcessTable> SessionResolver<'a, D, P> {
    pub fn new(device: &'a D, processes: &'a P) -> Self {
        Self { device, processes }
    }

    /// Resolve a target to a bound controller.
    ///
    /// `Ok(None)` means nothing currently plays under that target. Errors are
    /// faults from the audio stack or the process table.
    pub fn resolve(&self, target: &Target) -> AudioResult<Option<EndpointControl<D>>> {
        match target {
            Target::Device => Ok(Some(VolumeControl::Endpoint(self.device.endpoint_volume()?))),
            Target::System => self.system_session(),
            Target::Process(name) => self.process_session(target, name),
        }
    }

    fn system_session(&self) -> AudioResult<Option<EndpointControl<D>>> {
        for stream in self.device.streams()? {
            if stream.process_id()? == SYSTEM_SOUNDS_PID {
                debug!("Resolved system sounds session");
                return Ok(Some(VolumeControl::Stream(stream.simple_volume()?)));
            }
        }
        debug!("No system sounds session");
        Ok(None)
    }

    fn process_session(&self, target: &Target, name: &str) -> AudioResult<Option<EndpointControl<D>>> {
        let streams = self.device.streams()?;
        let running = self.processes.snapshot()?;
        for stream in streams {
            let pid = stream.process_id()?;
            if pid == SYSTEM_SOUNDS_PID {
                continue;
            }

            let Some(process_name) = running.name(pid) else {
                // Process exited between enumeration and lookup
                trace!(pid, "Skipping session of exited process");
                continue;
            };

            if target.matches_process(process_name) {
                debug!(pid, process = %process_name, "Resolved session for {}", name);
                return Ok(Some(VolumeControl::Stream(stream.simple_volume()?)));
            }
        }
        debug!("No session for {}", name);
        Ok(None)
    }
}
