//! FFI bindings for WinMixer.
//!
//! This crate provides C ABI functions for use from C# via P/Invoke.
//! All functions use panic::catch_unwind to prevent Rust panics from
//! unwinding across the FFI boundary.
//!
//! Per-target functions return JSON such as `{"found":true,"volume":42}`.
//! `"found":false` means the target has nothing playing right now; it is not
//! an error. A null or empty target is an error (`InvalidArgument`).

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, UnwindSafe};
use std::ptr;
use std::sync::Once;
use tracing::debug;
use winmixer_rs::{AudioDevice, AudioError, AudioResult, DataFlow, Target};

// ============================================================================
// Error Handling
// ============================================================================

/// Error codes returned by FFI functions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidHandle = -1,
    InvalidArgument = -2,
    DeviceNotFound = -3,
    ComError = -4,
    JsonError = -5,
    VolumeNotAvailable = -6,
    SessionExpired = -7,
    Unsupported = -8,
    Panic = -99,
}

impl From<&AudioError> for ErrorCode {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::DeviceNotFound { .. } | AudioError::NoDefaultDevice => {
                ErrorCode::DeviceNotFound
            }
            AudioError::InvalidTarget(_) => ErrorCode::InvalidArgument,
            AudioError::VolumeNotAvailable { .. } => ErrorCode::VolumeNotAvailable,
            AudioError::SessionExpired => ErrorCode::SessionExpired,
            AudioError::Unsupported => ErrorCode::Unsupported,
            AudioError::ComInitFailed { .. }
            | AudioError::EnumerationFailed { .. }
            | AudioError::WindowsApi { .. }
            | AudioError::StringConversion(_) => ErrorCode::ComError,
        }
    }
}

/// An error on its way to the last-error slot.
#[derive(Debug)]
struct CallError {
    code: ErrorCode,
    message: String,
}

impl CallError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<AudioError> for CallError {
    fn from(err: AudioError) -> Self {
        Self::new(ErrorCode::from(&err), err.to_string())
    }
}

impl From<serde_json::Error> for CallError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCode::JsonError, err.to_string())
    }
}

/// Thread-local storage for the last error.
thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(code: ErrorCode, message: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((code, message.into()));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

// ============================================================================
// Data Types for JSON Serialization
// ============================================================================

/// Configuration for engine creation.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Endpoint to bind to; the default playback device when absent
    #[serde(default)]
    pub device_id: Option<String>,

    /// tracing filter directive, e.g. "debug" or "winmixer_rs=trace"
    #[serde(default)]
    pub log_level: Option<String>,
}

/// An audio endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioDeviceDto {
    pub id: String,
    pub name: String,
    pub is_capture: bool,
    pub is_default: bool,
}

impl From<AudioDevice> for AudioDeviceDto {
    fn from(device: AudioDevice) -> Self {
        Self {
            id: device.id,
            name: device.name,
            is_capture: device.flow == DataFlow::Capture,
            is_default: device.is_default,
        }
    }
}

/// Response containing a list of devices.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<AudioDeviceDto>,
}

/// Response containing the programs with an audio session.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProgramListResponse {
    pub programs: Vec<String>,
}

/// Response of a per-target operation.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_muted: Option<bool>,
}

impl TargetResponse {
    fn volume(volume: Option<u8>) -> Self {
        Self {
            found: volume.is_some(),
            volume,
            is_muted: None,
        }
    }

    fn muted(is_muted: Option<bool>) -> Self {
        Self {
            found: is_muted.is_some(),
            volume: None,
            is_muted,
        }
    }
}

// ============================================================================
// Engine Handle Type
// ============================================================================

/// Opaque handle to the mixer engine. Actually points to a MixerEngine struct.
pub type MixerEngineHandle = *mut c_void;

/// Internal engine state.
///
/// Only the device choice is kept; COM objects and the session list are
/// created per call.
struct MixerEngine {
    device_id: Option<String>,
}

#[cfg(windows)]
type EngineMixer = winmixer_rs::SystemMixer;

#[cfg(not(windows))]
type EngineMixer = winmixer_rs::Mixer<
    winmixer_rs::audio::sim::SimDevice,
    winmixer_rs::audio::sim::SimProcesses,
>;

impl MixerEngine {
    /// Run `f` against a freshly bound mixer, with COM initialized for the call.
    #[cfg(windows)]
    fn with_mixer<T>(&self, f: impl FnOnce(&EngineMixer) -> AudioResult<T>) -> AudioResult<T> {
        use winmixer_rs::{ComGuard, DeviceEnumerator, SystemMixer};

        let _com = ComGuard::new()?;
        let enumerator = DeviceEnumerator::new()?;
        let mixer = match &self.device_id {
            Some(id) => SystemMixer::for_device(&enumerator, id)?,
            None => SystemMixer::default_playback(&enumerator)?,
        };
        f(&mixer)
    }

    #[cfg(not(windows))]
    fn with_mixer<T>(&self, _f: impl FnOnce(&EngineMixer) -> AudioResult<T>) -> AudioResult<T> {
        Err(AudioError::Unsupported)
    }

    #[cfg(windows)]
    fn devices(&self, flow: DataFlow) -> AudioResult<Vec<AudioDevice>> {
        let _com = winmixer_rs::ComGuard::new()?;
        let enumerator = winmixer_rs::DeviceEnumerator::new()?;
        enumerator.devices(flow)
    }

    #[cfg(not(windows))]
    fn devices(&self, _flow: DataFlow) -> AudioResult<Vec<AudioDevice>> {
        Err(AudioError::Unsupported)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

static LOGGING: Once = Once::new();

fn init_logging(directive: &str) {
    let directive = directive.to_string();
    LOGGING.call_once(move || {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(directive))
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Allocate a C string from a Rust string. Caller must free with winmixer_free_string.
fn alloc_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained a null byte, replace with empty
        Err(_) => CString::default().into_raw(),
    }
}

/// Parse a C string to a Rust string slice.
unsafe fn parse_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Borrow the engine behind a handle.
unsafe fn engine<'a>(handle: MixerEngineHandle) -> Result<&'a MixerEngine, CallError> {
    if handle.is_null() {
        return Err(CallError::new(ErrorCode::InvalidHandle, "Null engine handle"));
    }
    Ok(&*(handle as *const MixerEngine))
}

/// Parse a target identifier from a C string.
unsafe fn parse_target(ptr: *const c_char) -> Result<Target, CallError> {
    let s = parse_c_str(ptr)
        .ok_or_else(|| CallError::new(ErrorCode::InvalidArgument, "Invalid target"))?;
    Ok(s.parse::<Target>()?)
}

/// Run a JSON-returning call behind catch_unwind and the last-error slot.
fn json_call<F>(operation: &'static str, f: F) -> *mut c_char
where
    F: FnOnce() -> Result<String, CallError> + UnwindSafe,
{
    clear_last_error();

    match panic::catch_unwind(f) {
        Ok(Ok(json)) => alloc_c_string(&json),
        Ok(Err(e)) => {
            debug!(operation, code = ?e.code, "{}", e.message);
            set_last_error(e.code, e.message);
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error(ErrorCode::Panic, format!("Panic during {}", operation));
            ptr::null_mut()
        }
    }
}

/// Resolve `target` on the engine's device and apply `op`.
fn target_call<F>(
    operation: &'static str,
    handle: MixerEngineHandle,
    target: *const c_char,
    op: F,
) -> *mut c_char
where
    F: FnOnce(&EngineMixer, &Target) -> AudioResult<TargetResponse> + UnwindSafe,
{
    json_call(operation, move || {
        let engine = unsafe { engine(handle)? };
        let target = unsafe { parse_target(target)? };
        let response = engine.with_mixer(|mixer| op(mixer, &target))?;
        Ok(serde_json::to_string(&response)?)
    })
}

// ============================================================================
// FFI Functions - Lifecycle
// ============================================================================

/// Create a new mixer engine instance.
///
/// # Arguments
/// * `config_json` - JSON configuration string (can be null for defaults)
///
/// # Returns
/// Handle to the engine, or null on failure. Check winmixer_last_error_code() on failure.
///
/// # Safety
/// The returned handle must be freed with winmixer_destroy().
#[no_mangle]
pub extern "C" fn winmixer_create(config_json: *const c_char) -> MixerEngineHandle {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let config = if config_json.is_null() {
            EngineConfig::default()
        } else {
            let json = unsafe { parse_c_str(config_json) }
                .ok_or_else(|| CallError::new(ErrorCode::InvalidArgument, "Invalid config"))?;
            serde_json::from_str::<EngineConfig>(json)?
        };

        if let Some(level) = &config.log_level {
            init_logging(level);
        }

        let engine = Box::new(MixerEngine {
            device_id: config.device_id,
        });
        Ok::<_, CallError>(Box::into_raw(engine) as MixerEngineHandle)
    });

    match result {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => {
            set_last_error(e.code, e.message);
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during engine creation");
            ptr::null_mut()
        }
    }
}

/// Destroy a mixer engine instance.
///
/// # Safety
/// The handle must have been created by winmixer_create() and must not be used after this call.
#[no_mangle]
pub extern "C" fn winmixer_destroy(handle: MixerEngineHandle) {
    if handle.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = Box::from_raw(handle as *mut MixerEngine);
    });
}

// ============================================================================
// FFI Functions - Enumeration
// ============================================================================

/// Get all active endpoints.
///
/// # Arguments
/// * `handle` - Engine handle
/// * `flow` - 0 = playback, 1 = recording
///
/// # Returns
/// JSON string containing the device list. Caller must free with winmixer_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn winmixer_get_devices(handle: MixerEngineHandle, flow: u32) -> *mut c_char {
    json_call("device enumeration", move || {
        let engine = unsafe { engine(handle)? };
        let flow = match flow {
            0 => DataFlow::Render,
            1 => DataFlow::Capture,
            _ => return Err(CallError::new(ErrorCode::InvalidArgument, "Invalid flow")),
        };
        let devices = engine.devices(flow)?;
        let response = DeviceListResponse {
            devices: devices.into_iter().map(Into::into).collect(),
        };
        Ok(serde_json::to_string(&response)?)
    })
}

/// Get the names of programs with an audio session on the engine's device.
///
/// # Returns
/// JSON string `{"programs":[...]}`. Caller must free with winmixer_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn winmixer_enum_programs(handle: MixerEngineHandle) -> *mut c_char {
    json_call("program enumeration", move || {
        let engine = unsafe { engine(handle)? };
        let programs: Vec<String> =
            engine.with_mixer(|mixer| mixer.enum_programs()?.collect())?;
        Ok(serde_json::to_string(&ProgramListResponse { programs })?)
    })
}

// ============================================================================
// FFI Functions - Per-target Operations
// ============================================================================
//
// `target` is "DEVICE", "SYSTEM" or a process name (UTF-8). Each returns a
// TargetResponse JSON string to be freed with winmixer_free_string(), or null
// on failure.

/// Get the mute state of a target.
#[no_mangle]
pub extern "C" fn winmixer_is_muted(handle: MixerEngineHandle, target: *const c_char) -> *mut c_char {
    target_call("is muted", handle, target, |mixer, target| {
        Ok(TargetResponse::muted(mixer.is_muted(target)?))
    })
}

/// Set the mute state of a target (`muted`: 1 = muted, 0 = unmuted).
#[no_mangle]
pub extern "C" fn winmixer_set_muted(
    handle: MixerEngineHandle,
    target: *const c_char,
    muted: i32,
) -> *mut c_char {
    target_call("set muted", handle, target, move |mixer, target| {
        Ok(TargetResponse::muted(mixer.set_muted(target, muted != 0)?))
    })
}

/// Toggle the mute state of a target.
#[no_mangle]
pub extern "C" fn winmixer_toggle_muted(
    handle: MixerEngineHandle,
    target: *const c_char,
) -> *mut c_char {
    target_call("toggle muted", handle, target, |mixer, target| {
        Ok(TargetResponse::muted(mixer.toggle_muted(target)?))
    })
}

/// Get the volume of a target (0-100).
#[no_mangle]
pub extern "C" fn winmixer_get_volume(
    handle: MixerEngineHandle,
    target: *const c_char,
) -> *mut c_char {
    target_call("get volume", handle, target, |mixer, target| {
        Ok(TargetResponse::volume(mixer.get_volume(target)?))
    })
}

/// Set the volume of a target. Out-of-range values are clamped.
#[no_mangle]
pub extern "C" fn winmixer_set_volume(
    handle: MixerEngineHandle,
    target: *const c_char,
    volume: i32,
) -> *mut c_char {
    target_call("set volume", handle, target, move |mixer, target| {
        Ok(TargetResponse::volume(mixer.set_volume(target, volume)?))
    })
}

/// Change the volume of a target by a signed delta.
#[no_mangle]
pub extern "C" fn winmixer_change_volume(
    handle: MixerEngineHandle,
    target: *const c_char,
    delta: i32,
) -> *mut c_char {
    target_call("change volume", handle, target, move |mixer, target| {
        Ok(TargetResponse::volume(mixer.change_volume(target, delta)?))
    })
}

// ============================================================================
// FFI Functions - Memory Management
// ============================================================================

/// Free a string allocated by this library.
///
/// # Safety
/// The pointer must have been returned by one of the winmixer_* functions.
/// Do not call this on strings from other sources.
#[no_mangle]
pub extern "C" fn winmixer_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = CString::from_raw(ptr);
    });
}

// ============================================================================
// FFI Functions - Error Handling
// ============================================================================

/// Get the last error code.
///
/// # Returns
/// The error code from the last failed operation, or 0 if no error.
#[no_mangle]
pub extern "C" fn winmixer_last_error_code() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(0)
    })
}

/// Get the last error message.
///
/// # Returns
/// Error message string. Caller must free with winmixer_free_string().
/// Returns null if no error.
#[no_mangle]
pub extern "C" fn winmixer_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, msg)| alloc_c_string(msg))
            .unwrap_or(ptr::null_mut())
    })
}

// ============================================================================
// FFI Functions - Utility
// ============================================================================

/// Get the library version.
///
/// # Returns
/// Version string. Caller must free with winmixer_free_string().
#[no_mangle]
pub extern "C" fn winmixer_version() -> *mut c_char {
    alloc_c_string(env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================
