//! Pure-math helpers for 16-bit PCM blocks read from the capture device.
use crate::models::audio_models::AudioLevels;

/// Append `block` to `out` as little-endian 16-bit PCM, zeroing each slot
/// once converted so the next read never sees stale samples.
///
/// Output grows by `block.len() * 2` bytes: low byte first, high byte second.
pub fn drain_into_le_bytes(block: &mut [i16], out: &mut Vec<u8>) {
    out.reserve(block.len() * 2);
    for sample in block.iter_mut() {
        out.extend_from_slice(&sample.to_le_bytes());
        *sample = 0;
    }
}

/// RMS and peak of a block, normalized to 0.0–1.0 against full scale.
pub fn block_levels(block: &[i16]) -> AudioLevels {
    if block.is_empty() {
        return AudioLevels::default();
    }
    let full_scale = -(i16::MIN as f64);
    let sum_sq: f64 = block.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_sq / block.len() as f64).sqrt() / full_scale;
    let peak = block
        .iter()
        .map(|&s| (s as i32).unsigned_abs())
        .max()
        .unwrap_or(0) as f64
        / full_scale;

    AudioLevels {
        rms: rms as f32,
        peak: peak as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sample_is_low_byte_first() {
        let mut block = [0x0102i16];
        let mut out = Vec::new();
        drain_into_le_bytes(&mut block, &mut out);
        assert_eq!(out, vec![0x02, 0x01]);
    }

    #[test]
    fn conversion_preserves_order_and_sign() {
        let mut block = [1i16, -1, i16::MAX, i16::MIN];
        let mut out = Vec::new();
        drain_into_le_bytes(&mut block, &mut out);
        assert_eq!(out, vec![0x01, 0x00, 0xFF, 0xFF, 0xFF, 0x7F, 0x00, 0x80]);
    }

    #[test]
    fn conversion_zeroes_source_slots() {
        let mut block = [7i16, -7, 300];
        let mut out = Vec::new();
        drain_into_le_bytes(&mut block, &mut out);
        assert_eq!(block, [0, 0, 0]);
    }

    #[test]
    fn conversion_appends_after_existing_bytes() {
        let mut out = vec![0xAA, 0xBB];
        drain_into_le_bytes(&mut [0x0304i16], &mut out);
        assert_eq!(out, vec![0xAA, 0xBB, 0x04, 0x03]);
    }

    #[test]
    fn levels_of_silence_and_full_scale() {
        assert_eq!(block_levels(&[0, 0, 0]), AudioLevels::default());
        assert_eq!(block_levels(&[]), AudioLevels::default());

        let full = block_levels(&[i16::MIN, i16::MIN]);
        assert_relative_eq!(full.rms, 1.0, epsilon = 1e-6);
        assert_relative_eq!(full.peak, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn peak_uses_largest_magnitude() {
        let levels = block_levels(&[100, -16384, 200]);
        assert_relative_eq!(levels.peak, 0.5, epsilon = 1e-6);
        assert!(levels.rms < levels.peak);
    }
}
