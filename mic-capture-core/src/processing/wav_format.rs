//! WAV file format utilities.
//!
//! Generates and parses the canonical 44-byte RIFF/WAVE header that precedes
//! a PCM payload. All multi-byte fields are little-endian.

use std::io::Write;

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Header bytes counted by the RIFF chunk size (everything after offset 8, minus the payload).
pub const RIFF_CHUNK_OVERHEAD: u32 = 36;

const PCM_FMT_CHUNK_SIZE: u32 = 16;
const PCM_FORMAT_CODE: u16 = 1;

/// Fields of a parsed canonical PCM WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// RIFF chunk size, `36 + data_size`.
    pub chunk_size: u32,
    pub format: PcmFormat,
    pub byte_rate: u32,
    pub block_align: u16,
    /// Size of the `data` sub-chunk, i.e. the PCM payload length.
    pub data_size: u32,
}

impl WavHeader {
    /// Number of sample frames in the payload.
    pub fn frame_count(&self) -> u32 {
        if self.block_align == 0 {
            return 0;
        }
        self.data_size / self.block_align as u32
    }
}

/// Generate a 44-byte WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
/// [32-33]  block_align = channels * bits_per_sample / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &PcmFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let chunk_size = RIFF_CHUNK_OVERHEAD + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&PCM_FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_CODE.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Check that a payload of `payload_len` bytes fits the 32-bit RIFF size fields.
pub fn data_size_for(payload_len: usize) -> Result<u32, CaptureError> {
    u32::try_from(payload_len)
        .ok()
        .filter(|len| len.checked_add(RIFF_CHUNK_OVERHEAD).is_some())
        .ok_or_else(|| {
            CaptureError::Encoding(format!(
                "payload of {} bytes exceeds the RIFF size limit",
                payload_len
            ))
        })
}

/// Write the header for a `payload_len`-byte payload as a single 44-byte unit.
pub fn write_header<W: Write + ?Sized>(
    sink: &mut W,
    payload_len: usize,
    format: &PcmFormat,
) -> Result<[u8; WAV_HEADER_SIZE], CaptureError> {
    let data_size = data_size_for(payload_len)?;
    let header = generate_wav_header(format, data_size);
    sink.write_all(&header)
        .map_err(|e| CaptureError::Sink(format!("header write failed: {}", e)))?;

    log::debug!(
        "WAV header: rate={} byte_rate={} block_align={} bits={} chunk_size={} data_size={}",
        format.sample_rate,
        format.byte_rate(),
        format.block_align(),
        format.bits_per_sample,
        RIFF_CHUNK_OVERHEAD + data_size,
        data_size
    );
    Ok(header)
}

/// Write the PCM payload verbatim, in accumulation order.
pub fn write_audio<W: Write + ?Sized>(sink: &mut W, payload: &[u8]) -> Result<(), CaptureError> {
    log::debug!("Storing {} PCM bytes", payload.len());
    sink.write_all(payload)
        .map_err(|e| CaptureError::Sink(format!("audio write failed: {}", e)))
}

/// Parse a canonical 44-byte PCM WAV header from the start of `bytes`.
pub fn parse_wav_header(bytes: &[u8]) -> Result<WavHeader, CaptureError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::Encoding(format!(
            "header needs {} bytes, got {}",
            WAV_HEADER_SIZE,
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(CaptureError::Encoding("missing RIFF/WAVE magic".into()));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(CaptureError::Encoding("not a canonical fmt/data layout".into()));
    }

    let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    if u32_at(16) != PCM_FMT_CHUNK_SIZE || u16_at(20) != PCM_FORMAT_CODE {
        return Err(CaptureError::Encoding("not uncompressed PCM".into()));
    }

    Ok(WavHeader {
        chunk_size: u32_at(4),
        format: PcmFormat {
            sample_rate: u32_at(24),
            channels: u16_at(22),
            bits_per_sample: u16_at(34),
        },
        byte_rate: u32_at(28),
        block_align: u16_at(32),
        data_size: u32_at(40),
    })
}
