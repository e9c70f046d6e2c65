//! WASAPI implementation of the backend traits.
//!
//! Device-wide control goes through IAudioEndpointVolume, per-program control
//! through the ISimpleAudioVolume of each session from IAudioSessionManager2.

use super::backend::{AudioEndpoint, AudioStream};
use super::device::{AudioError, AudioResult, DataFlow};
use super::enumerator::{self, DeviceEnumerator};
use super::mixer::Mixer;
use super::processes::ToolhelpProcesses;
use super::volume::VolumeSurface;
use windows::core::Interface;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{
    IAudioSessionControl2, IAudioSessionManager2, IMMDevice, ISimpleAudioVolume,
};
use windows::Win32::System::Com::CLSCTX_ALL;

/// Device-wide volume surface.
pub struct EndpointVolume {
    endpoint_volume: IAudioEndpointVolume,
}

impl VolumeSurface for EndpointVolume {
    fn level(&self) -> AudioResult<f32> {
        unsafe { Ok(self.endpoint_volume.GetMasterVolumeLevelScalar()?) }
    }

    fn set_level(&self, level: f32) -> AudioResult<()> {
        unsafe {
            self.endpoint_volume
                .SetMasterVolumeLevelScalar(level.clamp(0.0, 1.0), std::ptr::null())?;
        }
        Ok(())
    }

    fn muted(&self) -> AudioResult<bool> {
        unsafe { Ok(self.endpoint_volume.GetMute()?.as_bool()) }
    }

    fn set_muted(&self, muted: bool) -> AudioResult<()> {
        unsafe {
            self.endpoint_volume.SetMute(muted, std::ptr::null())?;
        }
        Ok(())
    }
}

/// Per-session volume surface.
pub struct SessionVolume {
    simple_volume: ISimpleAudioVolume,
}

impl VolumeSurface for SessionVolume {
    fn level(&self) -> AudioResult<f32> {
        unsafe { Ok(self.simple_volume.GetMasterVolume()?) }
    }

    fn set_level(&self, level: f32) -> AudioResult<()> {
        unsafe {
            self.simple_volume
                .SetMasterVolume(level.clamp(0.0, 1.0), std::ptr::null())?;
        }
        Ok(())
    }

    fn muted(&self) -> AudioResult<bool> {
        unsafe { Ok(self.simple_volume.GetMute()?.as_bool()) }
    }

    fn set_muted(&self, muted: bool) -> AudioResult<()> {
        unsafe {
            self.simple_volume.SetMute(muted, std::ptr::null())?;
        }
        Ok(())
    }
}

/// One audio session on an endpoint.
pub struct WasapiStream {
    control: IAudioSessionControl2,
}

impl AudioStream for WasapiStream {
    type Volume = SessionVolume;

    fn process_id(&self) -> AudioResult<u32> {
        unsafe { Ok(self.control.GetProcessId()?) }
    }

    fn simple_volume(&self) -> AudioResult<SessionVolume> {
        let simple_volume: ISimpleAudioVolume = self
            .control
            .cast()
            .map_err(AudioError::volume_unavailable)?;
        Ok(SessionVolume { simple_volume })
    }
}

/// An MMDevice endpoint.
pub struct WasapiDevice {
    device: IMMDevice,
}

impl WasapiDevice {
    pub(crate) fn new(device: IMMDevice) -> Self {
        Self { device }
    }

    /// Opaque Windows ID of this endpoint.
    pub fn id(&self) -> AudioResult<String> {
        enumerator::device_id(&self.device)
    }
}

impl AudioEndpoint for WasapiDevice {
    type Volume = EndpointVolume;
    type Stream = WasapiStream;

    fn endpoint_volume(&self) -> AudioResult<EndpointVolume> {
        unsafe {
            let endpoint_volume: IAudioEndpointVolume = self
                .device
                .Activate(CLSCTX_ALL, None)
                .map_err(AudioError::volume_unavailable)?;
            Ok(EndpointVolume { endpoint_volume })
        }
    }

    fn streams(&self) -> AudioResult<Vec<WasapiStream>> {
        unsafe {
            let manager: IAudioSessionManager2 = self
                .device
                .Activate(CLSCTX_ALL, None)
                .map_err(AudioError::enumeration)?;
            let sessions = manager
                .GetSessionEnumerator()
                .map_err(AudioError::enumeration)?;
            let count = sessions.GetCount().map_err(AudioError::enumeration)?;

            let mut streams = Vec::with_capacity(count.max(0) as usize);
            for i in 0..count {
                let control = sessions.GetSession(i).map_err(AudioError::enumeration)?;
                let control: IAudioSessionControl2 =
                    control.cast().map_err(AudioError::enumeration)?;
                streams.push(WasapiStream { control });
            }
            Ok(streams)
        }
    }
}

/// Mixer over the live Windows audio stack.
pub type SystemMixer = Mixer<WasapiDevice, ToolhelpProcesses>;

impl SystemMixer {
    /// Bind to the default playback device (Multimedia role).
    ///
    /// Note: COM must be initialized on this thread for the mixer's lifetime.
    pub fn default_playback(enumerator: &DeviceEnumerator) -> AudioResult<Self> {
        let device = enumerator.default_device(DataFlow::Render)?;
        Ok(Mixer::new(device, ToolhelpProcesses))
    }

    /// Bind to the default recording device (Multimedia role).
    pub fn default_capture(enumerator: &DeviceEnumerator) -> AudioResult<Self> {
        let device = enumerator.default_device(DataFlow::Capture)?;
        Ok(Mixer::new(device, ToolhelpProcesses))
    }

    /// Bind to a specific endpoint.
    pub fn for_device(enumerator: &DeviceEnumerator, device_id: &str) -> AudioResult<Self> {
        let device = enumerator.device(device_id)?;
        Ok(Mixer::new(device, ToolhelpProcesses))
    }
}
