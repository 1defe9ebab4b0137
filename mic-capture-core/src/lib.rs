//! # mic-capture-core
//!
//! Platform-agnostic microphone capture core library.
//!
//! Records 16 kHz mono 16-bit PCM from a capture device on a background
//! thread and writes it as a RIFF/WAVE file when recording stops.
//! Platform-specific backends (Windows WASAPI) implement the
//! `CaptureDevice` and `DeviceOpener` traits and plug into `PcmRecorder`.
//!
//! ## Architecture
//!
//! ```text
//! mic-capture-core (this crate)
//! ├── traits/       ← CaptureDevice, DeviceOpener, CaptureSession, CaptureDelegate, SinkFactory
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, PcmFormat, etc.
//! ├── processing/   ← PCM byte conversion and levels, WAV header generation
//! ├── session/      ← PcmRecorder (state machine), CaptureLoop (capture thread)
//! └── storage/      ← WavFileWriter, metadata
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioLevels, CaptureDiagnostics, DeviceInfo, PcmFormat};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use processing::wav_format::{generate_wav_header, parse_wav_header, WavHeader, WAV_HEADER_SIZE};
pub use session::recorder::PcmRecorder;
pub use storage::wav_writer::WavFileWriter;
pub use traits::byte_sink::{FileSinkFactory, SinkFactory};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_device::{CaptureDevice, DeviceGuard, DeviceOpener};
pub use traits::capture_session::CaptureSession;
