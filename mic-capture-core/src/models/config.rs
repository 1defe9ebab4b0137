use super::audio_models::PcmFormat;
use super::error::CaptureError;

/// Configuration for a capture session.
///
/// Immutable once handed to a recorder. Only mono 16-bit PCM is supported;
/// the sample rate and read block size are free to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    /// Target sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Number of channels (default: 1). Only mono is accepted.
    pub channels: u16,

    /// Bits per PCM sample (default: 16). Only 16 is accepted.
    pub bits_per_sample: u16,

    /// Samples requested from the device per blocking read (default: 320, 20ms at 16kHz).
    pub block_size: usize,

    /// Write a `.metadata.json` sidecar next to the finalized WAV (default: false).
    pub write_metadata: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::Configuration("sample rate must be positive".into()));
        }
        if self.channels != 1 {
            return Err(CaptureError::Configuration(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if self.bits_per_sample != 16 {
            return Err(CaptureError::Configuration(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        if self.block_size == 0 {
            return Err(CaptureError::Configuration("block size must be positive".into()));
        }
        Ok(())
    }

    /// The PCM format requested from the device and written to the header.
    pub fn format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
        }
    }

    /// Bytes appended to the accumulation buffer per full block.
    pub fn block_bytes(&self) -> usize {
        self.block_size * self.format().bytes_per_sample() as usize
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            bits_per_sample: 16,
            block_size: 320,
            write_metadata: false,
        }
    }
}
