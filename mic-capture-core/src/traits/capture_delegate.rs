use crate::models::audio_models::AudioLevels;
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Event delegate for recorder notifications.
///
/// `on_levels_updated` is called from the capture thread; the others from
/// the thread driving the recorder. Implementations should marshal to a UI
/// thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the recorder state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called after each captured block with its levels.
    fn on_levels_updated(&self, levels: &AudioLevels);

    /// Called whenever an operation is about to return an error.
    fn on_error(&self, error: &CaptureError);

    /// Called when a recording has been written and the device released.
    fn on_recording_finished(&self, result: &RecordingResult);
}
