//! WASAPI failure classification.
//!
//! HRESULTs are kept as raw `i32` so the mapping into [`CaptureError`] can be
//! exercised on every platform.

use std::time::Duration;

use mic_capture_core::CaptureError;
use thiserror::Error;

pub const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;
pub const AUDCLNT_E_DEVICE_INVALIDATED: i32 = 0x8889_0004_u32 as i32;
pub const AUDCLNT_E_UNSUPPORTED_FORMAT: i32 = 0x8889_0008_u32 as i32;
pub const AUDCLNT_E_DEVICE_IN_USE: i32 = 0x8889_000A_u32 as i32;

/// Errors raised inside the WASAPI backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WasapiError {
    #[error("COM initialization failed: {0}")]
    ComInit(String),

    #[error("no capture endpoint: {0}")]
    NoEndpoint(String),

    #[error("microphone access denied")]
    AccessDenied,

    #[error("capture endpoint is in exclusive use by another application")]
    DeviceInUse,

    #[error("capture endpoint was removed or disabled")]
    DeviceInvalidated,

    #[error("audio client rejected format: {0}")]
    FormatRejected(String),

    #[error("{call} failed: {message}")]
    Call { call: &'static str, message: String },

    #[error("no audio delivered within {0:?}")]
    ReadTimeout(Duration),
}

impl WasapiError {
    /// Classify a failed COM call by its HRESULT.
    pub fn from_hresult(call: &'static str, code: i32, message: impl Into<String>) -> Self {
        match code {
            E_ACCESSDENIED => Self::AccessDenied,
            AUDCLNT_E_DEVICE_IN_USE => Self::DeviceInUse,
            AUDCLNT_E_DEVICE_INVALIDATED => Self::DeviceInvalidated,
            AUDCLNT_E_UNSUPPORTED_FORMAT => Self::FormatRejected(message.into()),
            _ => Self::Call {
                call,
                message: message.into(),
            },
        }
    }

    /// Whether the failure means the user has disabled microphone access.
    pub fn is_permission_failure(&self) -> bool {
        matches!(self, Self::AccessDenied | Self::DeviceInUse)
    }
}

impl From<WasapiError> for CaptureError {
    fn from(e: WasapiError) -> Self {
        match e {
            WasapiError::AccessDenied => CaptureError::PermissionDenied,
            WasapiError::NoEndpoint(_) | WasapiError::DeviceInUse => CaptureError::DeviceNotAvailable,
            WasapiError::ComInit(_) | WasapiError::FormatRejected(_) => {
                CaptureError::Configuration(e.to_string())
            }
            WasapiError::DeviceInvalidated | WasapiError::Call { .. } | WasapiError::ReadTimeout(_) => {
                CaptureError::DeviceRead(e.to_string())
            }
        }
    }
}
