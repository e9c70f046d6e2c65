//! Mixer facade.
//!
//! A [`Mixer`] is bound to one device for its whole lifetime. Every call
//! resolves its target from scratch and returns the state read back after
//! the change, or `None` when the target has nothing playing right now.

use super::backend::{AudioEndpoint, AudioStream, EndpointControl, ProcessTable, SYSTEM_SOUNDS_PID};
use super::device::AudioResult;
use super::session::SessionResolver;
use super::target::Target;

/// Volume and mute control for a device, its system sounds and its programs.
pub struct Mixer<D, P> {
    device: D,
    processes: P,
}

impl<D: AudioEndpoint, P: ProcessTable> Mixer<D, P> {
    /// Create a mixer bound to `device`.
    pub fn new(device: D, processes: P) -> Self {
        Self { device, processes }
    }

    fn control(&self, target: &Target) -> AudioResult<Option<EndpointControl<D>>> {
        SessionResolver::new(&self.device, &self.processes).resolve(target)
    }

    /// Names of the programs that currently have a session on the device.
    ///
    /// The session list is snapshotted up front; the process table once the
    /// first program session is reached. Programs that exit in between are
    /// left out. A program with several sessions is listed once per session.
    pub fn enum_programs(&self) -> AudioResult<impl Iterator<Item = AudioResult<String>> + '_> {
        let streams = self.device.streams()?;
        let mut running = None;
        Ok(streams.into_iter().filter_map(move |stream| {
            let pid = match stream.process_id() {
                Ok(pid) => pid,
                Err(e) => return Some(Err(e)),
            };
            if pid == SYSTEM_SOUNDS_PID {
                return None;
            }
            if running.is_none() {
                match self.processes.snapshot() {
                    Ok(snapshot) => running = Some(snapshot),
                    Err(e) => return Some(Err(e)),
                }
            }
            let name = running.as_ref()?.name(pid)?;
            Some(Ok(name.to_string()))
        }))
    }

    /// Get the mute state of a target.
    pub fn is_muted(&self, target: &Target) -> AudioResult<Option<bool>> {
        let Some(control) = self.control(target)? else {
            return Ok(None);
        };
        control.is_muted().map(Some)
    }

    /// Set the mute state of a target. Returns the state read back.
    pub fn set_muted(&self, target: &Target, muted: bool) -> AudioResult<Option<bool>> {
        let Some(control) = self.control(target)? else {
            return Ok(None);
        };
        control.set_muted(muted)?;
        control.is_muted().map(Some)
    }

    /// Flip the mute state of a target. Returns the new state.
    pub fn toggle_muted(&self, target: &Target) -> AudioResult<Option<bool>> {
        let Some(control) = self.control(target)? else {
            return Ok(None);
        };
        let current = control.is_muted()?;
        control.set_muted(!current)?;
        control.is_muted().map(Some)
    }

    /// Get the volume of a target (0-100).
    pub fn get_volume(&self, target: &Target) -> AudioResult<Option<u8>> {
        let Some(control) = self.control(target)? else {
            return Ok(None);
        };
        control.volume().map(Some)
    }

    /// Set the volume of a target. Returns the clamped volume read back.
    pub fn set_volume(&self, target: &Target, volume: i32) -> AudioResult<Option<u8>> {
        let Some(control) = self.control(target)? else {
            return Ok(None);
        };
        control.set_volume(volume)?;
        control.volume().map(Some)
    }

    /// Move the volume of a target by `delta`. Returns the clamped volume read back.
    pub fn change_volume(&self, target: &Target, delta: i32) -> AudioResult<Option<u8>> {
        let Some(control) = self.control(target)? else {
            return Ok(None);
        };
        let current = i32::from(control.volume()?);
        control.set_volume(current.saturating_add(delta))?;
        control.volume().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::AudioError;
    use crate::audio::sim::{SimDevice, SimProcesses};
    use crate::audio::volume::VolumeSurface;

    struct Fixture {
        device: SimDevice,
        processes: SimProcesses,
        mixer: Mixer<SimDevice, SimProcesses>,
    }

    fn fixture() -> Fixture {
        let device = SimDevice::new();
        let processes = SimProcesses::new();
        let mixer = Mixer::new(device.clone(), processes.clone());
        Fixture {
            device,
            processes,
            mixer,
        }
    }

    fn spotify() -> Target {
        Target::process("Spotify").unwrap()
    }

    #[test]
    fn test_set_volume_returns_clamped_value() {
        let f = fixture();
        f.processes.spawn(100, "Spotify");
        f.device.add_stream(100);

        assert_eq!(f.mixer.set_volume(&spotify(), 150).unwrap(), Some(100));
        assert_eq!(f.mixer.set_volume(&spotify(), -20).unwrap(), Some(0));
        assert_eq!(f.mixer.set_volume(&spotify(), 64).unwrap(), Some(64));
        assert_eq!(f.mixer.get_volume(&spotify()).unwrap(), Some(64));
    }

    #[test]
    fn test_change_volume_clamps() {
        let f = fixture();
        assert_eq!(f.mixer.set_volume(&Target::Device, 95).unwrap(), Some(95));
        assert_eq!(f.mixer.change_volume(&Target::Device, 10).unwrap(), Some(100));
        assert_eq!(f.mixer.change_volume(&Target::Device, -30).unwrap(), Some(70));
        assert_eq!(f.mixer.change_volume(&Target::Device, i32::MIN).unwrap(), Some(0));
    }

    #[test]
    fn test_out_of_range_level_reads_clamped() {
        let f = fixture();
        f.device.endpoint().force_level(1.7);
        assert_eq!(f.mixer.get_volume(&Target::Device).unwrap(), Some(100));
        assert_eq!(f.mixer.change_volume(&Target::Device, -5).unwrap(), Some(95));
    }

    #[test]
    fn test_toggle_twice_restores() {
        let f = fixture();
        f.device.add_system_stream();
        assert_eq!(f.mixer.is_muted(&Target::System).unwrap(), Some(false));
        assert_eq!(f.mixer.toggle_muted(&Target::System).unwrap(), Some(true));
        assert_eq!(f.mixer.toggle_muted(&Target::System).unwrap(), Some(false));
    }

    #[test]
    fn test_set_muted_reads_back() {
        let f = fixture();
        assert_eq!(f.mixer.set_muted(&Target::Device, true).unwrap(), Some(true));
        assert!(f.device.endpoint().muted().unwrap());
        assert_eq!(f.mixer.set_muted(&Target::Device, false).unwrap(), Some(false));
    }

    #[test]
    fn test_missing_target_is_absent_everywhere() {
        let f = fixture();
        let missing = Target::process("nonexistent-process-xyz").unwrap();
        assert_eq!(f.mixer.get_volume(&missing).unwrap(), None);
        assert_eq!(f.mixer.set_volume(&missing, 10).unwrap(), None);
        assert_eq!(f.mixer.change_volume(&missing, 10).unwrap(), None);
        assert_eq!(f.mixer.is_muted(&missing).unwrap(), None);
        assert_eq!(f.mixer.set_muted(&missing, true).unwrap(), None);
        assert_eq!(f.mixer.toggle_muted(&missing).unwrap(), None);
        assert_eq!(f.mixer.get_volume(&Target::System).unwrap(), None);
    }

    #[test]
    fn test_process_names_ignore_case() {
        let f = fixture();
        f.processes.spawn(100, "Spotify");
        f.device.add_stream(100);
        f.mixer.set_volume(&spotify(), 40).unwrap();

        for name in ["spotify", "SPOTIFY", "Spotify"] {
            let target = Target::process(name).unwrap();
            assert_eq!(f.mixer.get_volume(&target).unwrap(), Some(40), "{name}");
        }
    }

    #[test]
    fn test_device_unaffected_by_streams() {
        let f = fixture();
        assert_eq!(f.mixer.get_volume(&Target::Device).unwrap(), Some(100));
        f.processes.spawn(100, "Spotify");
        f.device.add_stream(100);
        f.mixer.set_volume(&spotify(), 20).unwrap();
        f.device.remove_streams(100);
        assert_eq!(f.mixer.get_volume(&Target::Device).unwrap(), Some(100));
    }

    #[test]
    fn test_system_is_independent_of_programs() {
        let f = fixture();
        f.processes.spawn(100, "Spotify");
        f.device.add_stream(100);
        f.device.add_system_stream();

        f.mixer.set_volume(&Target::System, 25).unwrap();
        f.mixer.set_muted(&Target::System, true).unwrap();
        assert_eq!(f.mixer.get_volume(&spotify()).unwrap(), Some(100));
        assert_eq!(f.mixer.is_muted(&spotify()).unwrap(), Some(false));
    }

    #[test]
    fn test_enum_programs_skips_system_and_exited() {
        let f = fixture();
        f.device.add_system_stream();
        f.processes.spawn(1, "firefox");
        f.processes.spawn(2, "vlc");
        f.device.add_stream(1);
        f.device.add_stream(2);
        f.device.add_stream(1);
        f.device.add_stream(3);

        let programs = f.mixer.enum_programs().unwrap();
        // Exits after the snapshot are tolerated too
        f.processes.exit(2);
        let names: Vec<String> = programs.collect::<Result<_, _>>().unwrap();
        assert_eq!(names, vec!["firefox", "firefox"]);
    }

    #[test]
    fn test_bound_session_faults_propagate() {
        let f = fixture();
        f.processes.spawn(100, "Spotify");
        f.device.add_stream(100);
        let control = SessionResolver::new(&f.device, &f.processes)
            .resolve(&spotify())
            .unwrap()
            .unwrap();
        f.device.remove_streams(100);
        assert!(matches!(control.volume(), Err(AudioError::SessionExpired)));
        // A fresh lookup simply finds nothing
        assert_eq!(f.mixer.get_volume(&spotify()).unwrap(), None);
    }
}
