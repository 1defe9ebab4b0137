use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::PcmFormat;

/// Result returned when a recording is finalized to a WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    /// PCM payload bytes, excluding the 44-byte header.
    pub payload_bytes: u64,
    /// SHA-256 hex digest of every byte written (header + payload).
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata describing a recording, serializable as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: String,
    pub created_at: String,
    pub format: PcmFormat,
    pub payload_bytes: u64,
}

impl RecordingMetadata {
    pub fn new(
        format: PcmFormat,
        payload_bytes: u64,
        file_path: &str,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs: format.duration_secs(payload_bytes),
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            format,
            payload_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn metadata_derives_duration_from_payload() {
        let meta = RecordingMetadata::new(PcmFormat::SPEECH, 64000, "/tmp/a.wav", "abc");
        assert_relative_eq!(meta.duration_secs, 2.0);
        assert_eq!(meta.payload_bytes, 64000);
        assert_eq!(meta.format, PcmFormat::SPEECH);
        assert!(uuid::Uuid::parse_str(&meta.id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.created_at).is_ok());
    }

    #[test]
    fn metadata_ids_are_unique() {
        let a = RecordingMetadata::new(PcmFormat::SPEECH, 0, "a.wav", "");
        let b = RecordingMetadata::new(PcmFormat::SPEECH, 0, "a.wav", "");
        assert_ne!(a.id, b.id);
    }
}
