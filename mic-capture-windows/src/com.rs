use windows::Win32::System::Com::*;

use crate::error::WasapiError;

/// RAII guard for a multithreaded COM apartment on the current thread.
///
/// COM objects created while the guard is alive must be dropped before it.
pub(crate) struct ComApartment;

impl ComApartment {
    pub(crate) fn enter() -> Result<Self, WasapiError> {
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
            .ok()
            .map_err(|e| WasapiError::ComInit(e.to_string()))?;
        Ok(Self)
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

/// Map a failed COM call to a [`WasapiError`].
pub(crate) fn classify(call: &'static str, e: &windows::core::Error) -> WasapiError {
    WasapiError::from_hresult(call, e.code().0, e.to_string())
}
