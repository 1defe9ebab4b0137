use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::pcm;
use crate::session::recorder::SessionState;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::{CaptureDevice, DeviceGuard};

/// What the capture thread hands back when it is joined.
///
/// The accumulation buffer is only ever touched by the capture thread until
/// this value crosses the join, so the recorder reads it without a lock.
pub struct CaptureOutcome<D: CaptureDevice> {
    pub device: DeviceGuard<D>,
    pub pcm: Vec<u8>,
    /// Start or read failure that ended capture early.
    pub error: Option<CaptureError>,
    /// Failure stopping the device after capture ended. Every sample read
    /// before it is in `pcm`.
    pub stop_error: Option<CaptureError>,
}

/// Read/accumulate cycle run on the capture thread.
pub struct CaptureLoop<D: CaptureDevice> {
    device: DeviceGuard<D>,
    running: Arc<AtomicBool>,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    format: PcmFormat,
    block_size: usize,
}

impl<D: CaptureDevice> CaptureLoop<D> {
    pub fn new(
        device: DeviceGuard<D>,
        running: Arc<AtomicBool>,
        session_state: Arc<Mutex<SessionState>>,
        delegate: Option<Arc<dyn CaptureDelegate>>,
        format: PcmFormat,
        block_size: usize,
    ) -> Self {
        Self {
            device,
            running,
            session_state,
            delegate,
            format,
            block_size,
        }
    }

    /// Start the device, report the outcome on `started`, then read blocks
    /// until the running flag is cleared or a read fails.
    ///
    /// The flag is only checked between reads; an in-flight read always
    /// completes and its samples are kept.
    pub fn run(mut self, started: Sender<Result<(), CaptureError>>) -> CaptureOutcome<D> {
        let mut pcm = Vec::new();

        let start_result = match self.device.get_mut() {
            Some(device) => device.start(),
            None => Err(CaptureError::DeviceNotAvailable),
        };
        if let Err(e) = start_result {
            self.running.store(false, Ordering::SeqCst);
            let _ = started.send(Err(e.clone()));
            return self.finish(pcm, Some(e), None);
        }
        // The recorder waits on this before reporting `start` as successful.
        let _ = started.send(Ok(()));

        let mut block = vec![0i16; self.block_size];
        let mut error = None;

        while self.running.load(Ordering::SeqCst) {
            let Some(device) = self.device.get_mut() else {
                error = Some(CaptureError::DeviceNotAvailable);
                break;
            };

            let read = match device.read_block(&mut block) {
                Ok(n) => n.min(block.len()),
                Err(e) => {
                    log::error!("Capture read failed after {} bytes: {}", pcm.len(), e);
                    error = Some(e);
                    break;
                }
            };
            if read == 0 {
                continue;
            }

            let samples = &mut block[..read];
            let levels = pcm::block_levels(samples);
            pcm::drain_into_le_bytes(samples, &mut pcm);

            {
                let mut s = self.session_state.lock();
                s.levels = levels;
                s.diagnostics.blocks_read += 1;
                s.diagnostics.samples_captured += read as u64;
                s.diagnostics.bytes_accumulated = pcm.len() as u64;
                if read < self.block_size {
                    s.diagnostics.short_reads += 1;
                    log::warn!("Short read: {} of {} samples", read, self.block_size);
                }
                if s.state.is_recording() {
                    s.state = CaptureState::Recording {
                        duration_secs: self.format.duration_secs(pcm.len() as u64),
                    };
                }
            }

            if let Some(ref d) = self.delegate {
                d.on_levels_updated(&levels);
            }

            log::debug!("There are {} PCM data bytes stored", pcm.len());
        }

        let stop_error = match self.device.get_mut().map(|device| device.stop()) {
            Some(Err(e)) => {
                log::error!("Failed to stop capture device: {}", e);
                Some(e)
            }
            _ => None,
        };

        self.finish(pcm, error, stop_error)
    }

    fn finish(
        self,
        pcm: Vec<u8>,
        error: Option<CaptureError>,
        stop_error: Option<CaptureError>,
    ) -> CaptureOutcome<D> {
        self.running.store(false, Ordering::SeqCst);
        CaptureOutcome {
            device: self.device,
            pcm,
            error,
            stop_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::test_support::ScriptedDevice;

    fn spawn_loop(
        device: ScriptedDevice,
        block_size: usize,
    ) -> (
        Arc<AtomicBool>,
        Arc<Mutex<SessionState>>,
        mpsc::Receiver<Result<(), CaptureError>>,
        thread::JoinHandle<CaptureOutcome<ScriptedDevice>>,
    ) {
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(SessionState::new()));
        let capture = CaptureLoop::new(
            DeviceGuard::new(device),
            Arc::clone(&running),
            Arc::clone(&state),
            None,
            PcmFormat::SPEECH,
            block_size,
        );
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || capture.run(tx));
        (running, state, rx, handle)
    }

    fn wait_for_blocks(state: &Mutex<SessionState>, blocks: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.lock().diagnostics.blocks_read < blocks {
            assert!(Instant::now() < deadline, "timed out waiting for {} blocks", blocks);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn accumulates_blocks_in_order_until_stopped() {
        let device = ScriptedDevice::with_blocks(vec![vec![0x0102, 0x0304], vec![-2, 5]]);
        let counters = device.counters();
        let (running, state, rx, handle) = spawn_loop(device, 2);

        assert_eq!(rx.recv().unwrap(), Ok(()));
        wait_for_blocks(&state, 2);
        running.store(false, Ordering::SeqCst);

        let outcome = handle.join().unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(
            outcome.pcm,
            vec![0x02, 0x01, 0x04, 0x03, 0xFE, 0xFF, 0x05, 0x00]
        );
        assert_eq!(counters.starts(), 1);
        assert_eq!(counters.stops(), 1);
        assert_eq!(counters.releases(), 0);
        assert!(!outcome.device.is_released());
    }

    #[test]
    fn partial_reads_append_only_delivered_samples() {
        let device = ScriptedDevice::with_blocks(vec![vec![1, 2, 3], vec![4]]);
        let (running, state, rx, handle) = spawn_loop(device, 3);

        rx.recv().unwrap().unwrap();
        wait_for_blocks(&state, 2);
        running.store(false, Ordering::SeqCst);

        let outcome = handle.join().unwrap();
        assert_eq!(outcome.pcm.len(), 8);
        let diagnostics = state.lock().diagnostics.clone();
        assert_eq!(diagnostics.samples_captured, 4);
        assert_eq!(diagnostics.short_reads, 1);
        assert_eq!(diagnostics.bytes_accumulated, 8);
    }

    #[test]
    fn read_failure_stops_loop_and_keeps_accumulated_bytes() {
        let device = ScriptedDevice::with_blocks(vec![vec![9; 4]])
            .failing_read(CaptureError::DeviceRead("overrun".into()));
        let counters = device.counters();
        let (running, _state, rx, handle) = spawn_loop(device, 4);

        rx.recv().unwrap().unwrap();
        let outcome = handle.join().unwrap();

        assert_eq!(outcome.error, Some(CaptureError::DeviceRead("overrun".into())));
        assert_eq!(outcome.pcm, [9u8, 0].repeat(4));
        assert!(!running.load(Ordering::SeqCst));
        assert_eq!(counters.stops(), 1);
    }

    #[test]
    fn start_failure_is_reported_before_any_read() {
        let device = ScriptedDevice::new().failing_start(CaptureError::DeviceNotAvailable);
        let counters = device.counters();
        let (_running, _state, rx, handle) = spawn_loop(device, 4);

        assert_eq!(rx.recv().unwrap(), Err(CaptureError::DeviceNotAvailable));
        let outcome = handle.join().unwrap();
        assert_eq!(outcome.error, Some(CaptureError::DeviceNotAvailable));
        assert!(outcome.pcm.is_empty());
        assert_eq!(counters.reads(), 0);
    }

    #[test]
    fn stop_failure_is_kept_apart_from_captured_audio() {
        let device = ScriptedDevice::with_blocks(vec![vec![7, 7]])
            .failing_stop(CaptureError::DeviceRead("Stop failed".into()));
        let (running, state, rx, handle) = spawn_loop(device, 2);

        rx.recv().unwrap().unwrap();
        wait_for_blocks(&state, 1);
        running.store(false, Ordering::SeqCst);

        let outcome = handle.join().unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(outcome.stop_error, Some(CaptureError::DeviceRead("Stop failed".into())));
        assert_eq!(outcome.pcm, vec![7, 0, 7, 0]);
    }
}
