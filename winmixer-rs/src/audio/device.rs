//! Audio device data models.
//!
//! Defines the endpoint descriptions handed out by device enumeration and
//! the error type shared by every audio operation.

use thiserror::Error;

/// An audio endpoint as reported by device enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Unique Windows device ID (opaque string from IMMDevice::GetId)
    pub id: String,

    /// Human-readable device name (from device properties)
    pub name: String,

    /// Playback or recording endpoint
    pub flow: DataFlow,

    /// Whether this is the default device for the Multimedia role
    pub is_default: bool,
}

impl AudioDevice {
    /// Create a new AudioDevice that is not the default endpoint.
    pub fn new(id: String, name: String, flow: DataFlow) -> Self {
        Self {
            id,
            name,
            flow,
            is_default: false,
        }
    }
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = if self.is_default { "*" } else { " " };
        write!(f, "{} {} ({})", marker, self.name, self.id)
    }
}

/// Direction of an endpoint (maps to Windows EDataFlow enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFlow {
    /// Speakers, headphones
    #[default]
    Render,

    /// Microphones, line-in
    Capture,
}

/// Audio service error types.
///
/// A target that currently has no live stream is *not* an error; the mixer
/// reports it as `None`. Everything in here is either a caller mistake or a
/// genuine fault from the audio stack.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    #[error("No default device available")]
    NoDefaultDevice,

    #[error("Invalid target: {0:?}")]
    InvalidTarget(String),

    #[error("COM initialization failed: {message} ({code:#010x})")]
    ComInitFailed { code: i32, message: String },

    #[error("Failed to enumerate audio: {message} ({code:#010x})")]
    EnumerationFailed { code: i32, message: String },

    #[error("Volume control not available: {message} ({code:#010x})")]
    VolumeNotAvailable { code: i32, message: String },

    #[error("Audio session has expired")]
    SessionExpired,

    #[error("Windows API error: {message} ({code:#010x})")]
    WindowsApi { code: i32, message: String },

    #[error("String conversion error: {0}")]
    StringConversion(String),

    #[error("The Windows audio stack is not available on this platform")]
    Unsupported,
}

#[cfg(windows)]
impl AudioError {
    fn parts(err: &windows::core::Error) -> (i32, String) {
        (err.code().0, err.message().to_string())
    }

    pub(crate) fn com_init(err: windows::core::Error) -> Self {
        let (code, message) = Self::parts(&err);
        Self::ComInitFailed { code, message }
    }

    pub(crate) fn enumeration(err: windows::core::Error) -> Self {
        let (code, message) = Self::parts(&err);
        Self::EnumerationFailed { code, message }
    }

    pub(crate) fn volume_unavailable(err: windows::core::Error) -> Self {
        let (code, message) = Self::parts(&err);
        Self::VolumeNotAvailable { code, message }
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for AudioError {
    fn from(err: windows::core::Error) -> Self {
        let (code, message) = Self::parts(&err);
        Self::WindowsApi { code, message }
    }
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_formats_as_hresult() {
        let err = AudioError::WindowsApi {
            code: 0x8889_0004_u32 as i32,
            message: "device invalidated".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Windows API error: device invalidated (0x88890004)"
        );
    }

    #[test]
    fn test_default_marker_in_display() {
        let mut device = AudioDevice::new("{0.0.0}".into(), "Speakers".into(), DataFlow::Render);
        assert_eq!(device.to_string(), "  Speakers ({0.0.0})");
        device.is_default = true;
        assert_eq!(device.to_string(), "* Speakers ({0.0.0})");
    }
}
