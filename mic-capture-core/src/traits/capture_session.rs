use std::path::PathBuf;

use crate::models::audio_models::{AudioLevels, CaptureDiagnostics};
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Main recorder interface.
pub trait CaptureSession: Send {
    /// Current state.
    fn state(&self) -> CaptureState;

    /// Whether the capture loop is running.
    fn is_recording(&self) -> bool;

    /// Levels of the most recent block.
    fn current_levels(&self) -> AudioLevels;

    /// Live capture counters.
    fn diagnostics(&self) -> CaptureDiagnostics;

    /// Open the device for `output_path`. Transitions: uninitialized/closed → initialized.
    fn init(&mut self, output_path: PathBuf) -> Result<(), CaptureError>;

    /// Start capture. Transitions: initialized → recording.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop capture, write the WAV file and release the device.
    /// Transitions: recording → finalizing → closed.
    ///
    /// Returns `Ok(None)` without side effects when not recording.
    fn stop(&mut self) -> Result<Option<RecordingResult>, CaptureError>;
}
