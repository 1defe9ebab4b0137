use thiserror::Error;

/// Errors that can occur during microphone capture and WAV finalization.
///
/// Every failure is returned to the caller; the capture thread never
/// terminates the process and `stop` never swallows a sink failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The configuration is invalid, or the device rejected the requested
    /// format at `init`. Fatal to that session; re-init with other parameters.
    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("permission denied")]
    PermissionDenied,

    /// A blocking device read failed. Accumulation stops and the error is
    /// reported by `stop`.
    #[error("device read failed: {0}")]
    DeviceRead(String),

    /// Opening, writing, or closing the output failed during finalize.
    /// The captured PCM is retained and finalize can be retried.
    #[error("sink error: {0}")]
    Sink(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("capture thread failed: {0}")]
    CaptureThread(String),
}

impl CaptureError {
    /// Whether the captured audio survives this error and can still be
    /// written with `finalize_pending`.
    pub fn preserves_recording(&self) -> bool {
        matches!(self, Self::DeviceRead(_) | Self::Sink(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = CaptureError::Configuration("unsupported channel count: 2".into());
        assert_eq!(err.to_string(), "configuration failed: unsupported channel count: 2");

        let err = CaptureError::Sink("disk full".into());
        assert_eq!(err.to_string(), "sink error: disk full");
    }

    #[test]
    fn only_read_and_sink_failures_keep_the_recording() {
        assert!(CaptureError::DeviceRead("overrun".into()).preserves_recording());
        assert!(CaptureError::Sink("closed".into()).preserves_recording());
        assert!(!CaptureError::Configuration("bad".into()).preserves_recording());
        assert!(!CaptureError::CaptureThread("panicked".into()).preserves_recording());
    }
}
