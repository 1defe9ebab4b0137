use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;
use crate::traits::byte_sink::{FileSinkFactory, SinkFactory};

/// Sidecar path for a recording: `{stem}.metadata.json` next to it.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    write_metadata_to(&FileSinkFactory, metadata, recording_path)
}

/// Write recording metadata as a JSON sidecar through `sinks`, next to the
/// recording it describes.
pub fn write_metadata_to(
    sinks: &dyn SinkFactory,
    metadata: &RecordingMetadata,
    recording_path: &Path,
) -> Result<PathBuf, CaptureError> {
    let metadata_path = metadata_path(recording_path);
    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|e| CaptureError::Sink(format!("failed to serialize metadata: {}", e)))?;

    let mut sink = sinks.create(&metadata_path).map_err(|e| {
        CaptureError::Sink(format!(
            "failed to open {}: {}",
            metadata_path.display(),
            e
        ))
    })?;
    sink.write_all(&json)
        .and_then(|_| sink.flush())
        .map_err(|e| CaptureError::Sink(format!("failed to write metadata: {}", e)))?;
    Ok(metadata_path)
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let metadata_path = metadata_path(recording_path);
    let json = fs::read_to_string(&metadata_path)
        .map_err(|e| CaptureError::Sink(format!("failed to read metadata: {}", e)))?;
    let metadata: RecordingMetadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::Encoding(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}
