//! # mic-capture-windows
//!
//! Windows WASAPI backend for mic-capture.
//!
//! Provides:
//! - `WasapiMicOpener` / `WasapiMicDevice`: microphone capture via a WASAPI capture endpoint
//! - `DeviceEnumerator`: capture endpoint enumeration via MMDevice API
//! - `permissions`: Windows microphone privacy check
//!
//! ## Usage
//! ```ignore
//! use mic_capture_core::{CaptureConfiguration, PcmRecorder};
//! use mic_capture_windows::WasapiMicOpener;
//!
//! let mut recorder = PcmRecorder::new(CaptureConfiguration::default(), WasapiMicOpener::default_device());
//! recorder.init("take.wav")?;
//! recorder.start()?;
//! // ...
//! let result = recorder.stop()?;
//! ```

pub mod error;
pub mod packet_buffer;
pub mod read_policy;

#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod wasapi_mic;

pub use error::WasapiError;
pub use read_policy::ReadPolicy;

#[cfg(target_os = "windows")]
pub use device_enumerator::{list_microphones, DeviceEnumerator};
#[cfg(target_os = "windows")]
pub use permissions::check_microphone_permission;
#[cfg(target_os = "windows")]
pub use wasapi_mic::{WasapiMicDevice, WasapiMicOpener};
