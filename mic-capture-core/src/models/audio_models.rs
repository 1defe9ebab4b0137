use serde::{Deserialize, Serialize};

/// Linear PCM stream format shared by the device, the capture loop and the
/// WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// 16kHz mono 16-bit, the format recorded by default.
    pub const SPEECH: PcmFormat = PcmFormat {
        sample_rate: 16000,
        channels: 1,
        bits_per_sample: 16,
    };

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per sample frame across all channels.
    pub fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Playback duration of `payload_len` bytes of PCM in this format.
    pub fn duration_secs(&self, payload_len: u64) -> f64 {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return 0.0;
        }
        payload_len as f64 / byte_rate as f64
    }
}

/// A capture device available to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Level metering of the most recent block (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
}

/// Counters for debugging a capture session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub blocks_read: u64,
    pub samples_captured: u64,
    pub bytes_accumulated: u64,
    /// Reads that returned fewer samples than requested.
    pub short_reads: u64,
}
