//! Device enumeration using Windows MMDevice API.
//!
//! Provides COM initialization and endpoint lookup.

use super::device::{AudioDevice, AudioError, AudioResult, DataFlow};
use super::wasapi::WasapiDevice;
use tracing::debug;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eCapture, eMultimedia, eRender, EDataFlow, IMMDevice, IMMDeviceEnumerator,
    MMDeviceEnumerator, DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize, CLSCTX_ALL,
    COINIT_APARTMENTTHREADED, STGM,
};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard(());

impl ComGuard {
    /// Initialize COM for the current thread.
    pub fn new() -> AudioResult<Self> {
        unsafe {
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(AudioError::com_init)?;
        }
        Ok(Self(()))
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

fn to_edataflow(flow: DataFlow) -> EDataFlow {
    match flow {
        DataFlow::Render => eRender,
        DataFlow::Capture => eCapture,
    }
}

/// Device enumerator using Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new DeviceEnumerator.
    ///
    /// Note: COM must be initialized before calling this function.
    pub fn new() -> AudioResult<Self> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(AudioError::enumeration)?;

            Ok(Self { enumerator })
        }
    }

    /// Get all active endpoints of one direction.
    pub fn devices(&self, flow: DataFlow) -> AudioResult<Vec<AudioDevice>> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(to_edataflow(flow), DEVICE_STATE_ACTIVE)
                .map_err(AudioError::enumeration)?;

            let count = collection
                .GetCount()
                .map_err(AudioError::enumeration)?;

            let default_id = self.default_device_id(flow)?;

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                let device = collection.Item(i).map_err(AudioError::enumeration)?;
                let mut info = self.describe(&device, flow)?;
                info.is_default = default_id.as_deref() == Some(info.id.as_str());
                devices.push(info);
            }

            debug!(?flow, count = devices.len(), "Enumerated audio devices");
            Ok(devices)
        }
    }

    /// Get the default endpoint (Multimedia role) of one direction.
    pub fn default_device(&self, flow: DataFlow) -> AudioResult<WasapiDevice> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(to_edataflow(flow), eMultimedia)
                .map_err(|_| AudioError::NoDefaultDevice)?;
            Ok(WasapiDevice::new(device))
        }
    }

    /// Get a specific endpoint by ID.
    pub fn device(&self, device_id: &str) -> AudioResult<WasapiDevice> {
        unsafe {
            let device_id_wide: Vec<u16> =
                device_id.encode_utf16().chain(std::iter::once(0)).collect();

            let device = self
                .enumerator
                .GetDevice(PCWSTR::from_raw(device_id_wide.as_ptr()))
                .map_err(|_| AudioError::DeviceNotFound {
                    device_id: device_id.to_string(),
                })?;

            Ok(WasapiDevice::new(device))
        }
    }

    /// Get the default endpoint ID of one direction, if there is one.
    pub fn default_device_id(&self, flow: DataFlow) -> AudioResult<Option<String>> {
        unsafe {
            let device = match self
                .enumerator
                .GetDefaultAudioEndpoint(to_edataflow(flow), eMultimedia)
            {
                Ok(d) => d,
                Err(_) => return Ok(None),
            };
            device_id(&device).map(Some)
        }
    }

    fn describe(&self, device: &IMMDevice, flow: DataFlow) -> AudioResult<AudioDevice> {
        unsafe {
            let id = device_id(device)?;

            let props: IPropertyStore = device
                .OpenPropertyStore(STGM(0))
                .map_err(AudioError::enumeration)?;

            let name = friendly_name(&props).unwrap_or_else(|| "Unknown".to_string());

            Ok(AudioDevice::new(id, name, flow))
        }
    }
}

/// Read an endpoint's opaque ID string.
pub(crate) fn device_id(device: &IMMDevice) -> AudioResult<String> {
    unsafe {
        let id: PWSTR = device.GetId().map_err(AudioError::enumeration)?;
        let id_string = id
            .to_string()
            .map_err(|e| AudioError::StringConversion(e.to_string()));
        CoTaskMemFree(Some(id.0 as *const _));
        id_string
    }
}

/// Get the friendly name of a device from its property store.
fn friendly_name(props: &IPropertyStore) -> Option<String> {
    unsafe {
        let key = PROPERTYKEY {
            fmtid: DEVPKEY_Device_FriendlyName.fmtid,
            pid: DEVPKEY_Device_FriendlyName.pid,
        };

        let prop = props.GetValue(&key).ok()?;

        let s = prop.to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}
