//! Windows capture endpoint enumeration via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list active microphones with friendly
//! names and to resolve endpoint ids for `WasapiMicOpener`.

use windows::core::*;
use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use mic_capture_core::{CaptureError, DeviceInfo};

use crate::com::{classify, ComApartment};
use crate::error::WasapiError;

/// Audio device enumerator using the Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new device enumerator.
    ///
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> std::result::Result<Self, CaptureError> {
        Ok(Self::new_raw()?)
    }

    pub(crate) fn new_raw() -> std::result::Result<Self, WasapiError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|e| classify("CoCreateInstance(MMDeviceEnumerator)", &e))?;
            Ok(Self { enumerator })
        }
    }

    /// List active capture (microphone) endpoints.
    pub fn list_capture_devices(&self) -> std::result::Result<Vec<DeviceInfo>, CaptureError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eCapture, DEVICE_STATE_ACTIVE)
                .map_err(|e| classify("EnumAudioEndpoints", &e))?;

            let count = collection.GetCount().map_err(|e| classify("GetCount", &e))?;

            let default_id = self.default_capture_device_id().ok();

            let mut devices = Vec::new();
            for i in 0..count {
                let device = match collection.Item(i) {
                    Ok(d) => d,
                    Err(_) => continue,
                };
                let mut info = self.describe_with_default(&device, default_id.as_deref());
                if info.id.is_empty() {
                    continue;
                }
                if info.name.is_empty() {
                    info.name = format!("Microphone {}", i);
                }
                devices.push(info);
            }

            log::debug!("Found {} active capture endpoint(s)", devices.len());
            Ok(devices)
        }
    }

    /// Get the default capture endpoint id.
    pub fn default_capture_device_id(&self) -> std::result::Result<String, CaptureError> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(eCapture, eConsole)
                .map_err(|e| WasapiError::NoEndpoint(e.to_string()))?;
            Ok(endpoint_id(&device)?)
        }
    }

    /// Look up an endpoint by id, or the default capture endpoint.
    pub(crate) fn resolve(&self, device_id: Option<&str>) -> std::result::Result<IMMDevice, WasapiError> {
        unsafe {
            match device_id {
                Some(id) => {
                    let wide_id: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
                    self.enumerator
                        .GetDevice(PCWSTR(wide_id.as_ptr()))
                        .map_err(|e| WasapiError::NoEndpoint(format!("{}: {}", id, e)))
                }
                None => self
                    .enumerator
                    .GetDefaultAudioEndpoint(eCapture, eConsole)
                    .map_err(|e| WasapiError::NoEndpoint(e.to_string())),
            }
        }
    }

    pub(crate) fn describe(&self, device: &IMMDevice) -> DeviceInfo {
        let default_id = self.default_capture_device_id().ok();
        self.describe_with_default(device, default_id.as_deref())
    }

    fn describe_with_default(&self, device: &IMMDevice, default_id: Option<&str>) -> DeviceInfo {
        let id = unsafe { endpoint_id(device) }.unwrap_or_default();
        let name = Self::friendly_name(device).unwrap_or_default();
        let is_default = default_id == Some(id.as_str());
        DeviceInfo { id, name, is_default }
    }

    /// Read the PKEY_Device_FriendlyName property from a device.
    fn friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            let store = device.OpenPropertyStore(STGM_READ).ok()?;
            let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
            let name = value.to_string();
            (!name.is_empty()).then_some(name)
        }
    }
}

/// List microphones from any thread, entering COM for the duration of the call.
pub fn list_microphones() -> std::result::Result<Vec<DeviceInfo>, CaptureError> {
    let _com = ComApartment::enter()?;
    let enumerator = DeviceEnumerator::new()?;
    enumerator.list_capture_devices()
}

unsafe fn endpoint_id(device: &IMMDevice) -> std::result::Result<String, WasapiError> {
    let raw = device.GetId().map_err(|e| classify("GetId", &e))?;
    let id = raw.to_string();
    CoTaskMemFree(Some(raw.0 as *const _));
    id.map_err(|e| WasapiError::Call {
        call: "GetId",
        message: e.to_string(),
    })
}
