use std::collections::VecDeque;

/// Samples received from WASAPI packets but not yet handed to the reader.
///
/// WASAPI delivers packets sized by the engine period (typically 10 ms),
/// which rarely lines up with the reader's block size; the remainder is
/// carried over to the next read.
#[derive(Debug, Default)]
pub struct PacketBuffer {
    samples: VecDeque<i16>,
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, packet: &[i16]) {
        self.samples.extend(packet.iter().copied());
    }

    /// Queue `count` zero samples for a packet flagged silent.
    pub fn push_silence(&mut self, count: usize) {
        self.samples.extend(std::iter::repeat(0).take(count));
    }

    /// Move up to `block.len()` samples into `block`, returning how many.
    pub fn drain_into(&mut self, block: &mut [i16]) -> usize {
        let n = block.len().min(self.samples.len());
        for (slot, sample) in block.iter_mut().zip(self.samples.drain(..n)) {
            *slot = sample;
        }
        n
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
