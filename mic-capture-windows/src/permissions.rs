//! Windows microphone privacy permission check.
//!
//! On Windows 10 1803+, microphone access is controlled by the privacy
//! settings at Settings > Privacy > Microphone. Desktop apps are generally
//! allowed unless the user has disabled the global toggle.
//!
//! There is no per-app consent dialog for unpackaged desktop apps.
//! Packaged apps (MSIX/UWP) get an automatic consent prompt.

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use mic_capture_core::CaptureError;

use crate::com::{classify, ComApartment};
use crate::device_enumerator::DeviceEnumerator;
use crate::error::WasapiError;

/// Check if microphone access is available.
///
/// Activates an audio client on the default capture endpoint. Access denied
/// or exclusive use by another app reports `false`, as does a machine with
/// no microphone.
pub fn check_microphone_permission() -> Result<bool, CaptureError> {
    let _com = ComApartment::enter()?;
    let enumerator = DeviceEnumerator::new()?;

    let device = match enumerator.resolve(None) {
        Ok(d) => d,
        Err(WasapiError::NoEndpoint(_)) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let activated: windows::core::Result<IAudioClient> = unsafe { device.Activate(CLSCTX_ALL, None) };
    match activated {
        Ok(_) => Ok(true),
        Err(e) => {
            let err = classify("Activate", &e);
            if err.is_permission_failure() {
                log::info!("Microphone unavailable: {}", err);
                Ok(false)
            } else {
                log::warn!("Unexpected error checking mic permission: {}", err);
                Ok(true)
            }
        }
    }
}
