use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format;
use crate::traits::byte_sink::SinkFactory;

/// Writes a finished PCM payload as a WAV file.
///
/// ## File Format
///
/// ```text
/// [44-byte WAV header]
/// [raw little-endian 16-bit PCM, in capture order]
/// ```
///
/// The sink is flushed and dropped before `write` returns, whether or not
/// the write succeeded.
pub struct WavFileWriter {
    file_path: PathBuf,
    format: PcmFormat,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, format: PcmFormat) -> Self {
        Self { file_path, format }
    }

    /// Write header and payload to a new sink at the file path.
    ///
    /// Returns the SHA-256 hex digest of every byte written.
    pub fn write(&self, sinks: &dyn SinkFactory, payload: &[u8]) -> Result<String, CaptureError> {
        // Reject payloads the header can't describe before touching the sink.
        wav_format::data_size_for(payload.len())?;

        let sink = sinks.create(&self.file_path).map_err(|e| {
            CaptureError::Sink(format!(
                "failed to open {}: {}",
                self.file_path.display(),
                e
            ))
        })?;
        let mut sink = ChecksumWriter::new(sink);

        wav_format::write_header(&mut sink, payload.len(), &self.format)?;
        wav_format::write_audio(&mut sink, payload)?;
        sink.flush()
            .map_err(|e| CaptureError::Sink(format!("flush failed: {}", e)))?;

        let (bytes_written, checksum) = sink.finish();
        log::info!(
            "Wrote {} bytes ({} PCM) to {}",
            bytes_written,
            payload.len(),
            self.file_path.display()
        );
        Ok(checksum)
    }

    /// Path of the output file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }
}

/// Hashes everything that reaches the inner writer.
struct ChecksumWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    bytes_written: u64,
}

impl<W: Write> ChecksumWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes_written: 0,
        }
    }

    /// Drop the inner writer (closing it) and return the byte count and digest.
    fn finish(self) -> (u64, String) {
        let digest = self.hasher.finalize();
        (self.bytes_written, hex_encode(&digest))
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
