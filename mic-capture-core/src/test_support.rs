//! Scripted collaborators for exercising the recorder without hardware.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioLevels, DeviceInfo};
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::traits::byte_sink::SinkFactory;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::CaptureDevice;

pub(crate) fn temp_wav_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("mic_capture_test_{}_{}.wav", name, uuid::Uuid::new_v4()))
}

/// Call counts shared between a [`ScriptedDevice`] and the test that built it.
#[derive(Clone, Default)]
pub(crate) struct DeviceCounters {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl DeviceCounters {
    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Device that replays queued blocks, then idles with zero-length reads
/// (or fails / panics once, if scripted to).
pub(crate) struct ScriptedDevice {
    blocks: VecDeque<Vec<i16>>,
    initialized: bool,
    start_error: Option<CaptureError>,
    read_error: Option<CaptureError>,
    stop_error: Option<CaptureError>,
    panic_when_exhausted: bool,
    counters: DeviceCounters,
}

impl ScriptedDevice {
    pub(crate) fn new() -> Self {
        Self {
            blocks: VecDeque::new(),
            initialized: true,
            start_error: None,
            read_error: None,
            stop_error: None,
            panic_when_exhausted: false,
            counters: DeviceCounters::default(),
        }
    }

    pub(crate) fn with_blocks(blocks: Vec<Vec<i16>>) -> Self {
        Self {
            blocks: blocks.into(),
            ..Self::new()
        }
    }

    pub(crate) fn uninitialized() -> Self {
        Self {
            initialized: false,
            ..Self::new()
        }
    }

    pub(crate) fn failing_start(mut self, error: CaptureError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Fail the first read after the queued blocks run out.
    pub(crate) fn failing_read(mut self, error: CaptureError) -> Self {
        self.read_error = Some(error);
        self
    }

    pub(crate) fn failing_stop(mut self, error: CaptureError) -> Self {
        self.stop_error = Some(error);
        self
    }

    pub(crate) fn panicking_read(mut self) -> Self {
        self.panic_when_exhausted = true;
        self
    }

    pub(crate) fn counters(&self) -> DeviceCounters {
        self.counters.clone()
    }
}

impl CaptureDevice for ScriptedDevice {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        match self.start_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read_block(&mut self, block: &mut [i16]) -> Result<usize, CaptureError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(samples) = self.blocks.pop_front() {
            let n = samples.len().min(block.len());
            block[..n].copy_from_slice(&samples[..n]);
            return Ok(n);
        }
        if let Some(err) = self.read_error.take() {
            return Err(err);
        }
        if self.panic_when_exhausted {
            panic!("scripted device panic");
        }
        thread::sleep(Duration::from_millis(1));
        Ok(0)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        match self.stop_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            id: "scripted".into(),
            name: "Scripted Microphone".into(),
            is_default: true,
        }
    }
}

/// Collects everything written to its sinks in memory.
#[derive(Clone, Default)]
pub(crate) struct MemorySinkFactory {
    contents: Arc<Mutex<Vec<u8>>>,
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl MemorySinkFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contents(&self) -> Vec<u8> {
        self.contents.lock().clone()
    }

    pub(crate) fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }
}

struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SinkFactory for MemorySinkFactory {
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        self.paths.lock().push(path.to_path_buf());
        self.contents.lock().clear();
        Ok(Box::new(MemorySink(Arc::clone(&self.contents))))
    }
}

#[derive(Clone, Copy)]
enum FailureMode {
    Open,
    AfterBytes(usize),
}

/// Sink factory whose sinks break on open or after a byte budget.
#[derive(Clone)]
pub(crate) struct FailingSinkFactory {
    mode: FailureMode,
    closed: Arc<AtomicUsize>,
}

impl FailingSinkFactory {
    pub(crate) fn on_open() -> Self {
        Self {
            mode: FailureMode::Open,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn after_bytes(limit: usize) -> Self {
        Self {
            mode: FailureMode::AfterBytes(limit),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sinks dropped so far.
    pub(crate) fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FailingSink {
    remaining: usize,
    closed: Arc<AtomicUsize>,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        let n = buf.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FailingSink {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl SinkFactory for FailingSinkFactory {
    fn create(&self, _path: &Path) -> io::Result<Box<dyn Write + Send>> {
        match self.mode {
            FailureMode::Open => Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume")),
            FailureMode::AfterBytes(limit) => Ok(Box::new(FailingSink {
                remaining: limit,
                closed: Arc::clone(&self.closed),
            })),
        }
    }
}

/// Event recorded by [`RecordingDelegate`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DelegateEvent {
    State(&'static str),
    Error(CaptureError),
    Finished(u64),
}

/// Delegate that records state names, errors and finished payload sizes.
#[derive(Default)]
pub(crate) struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
    level_updates: AtomicUsize,
}

impl RecordingDelegate {
    pub(crate) fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn level_updates(&self) -> usize {
        self.level_updates.load(Ordering::SeqCst)
    }
}

impl CaptureDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        self.events.lock().push(DelegateEvent::State(state.name()));
    }

    fn on_levels_updated(&self, _levels: &AudioLevels) {
        self.level_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, error: &CaptureError) {
        self.events.lock().push(DelegateEvent::Error(error.clone()));
    }

    fn on_recording_finished(&self, result: &RecordingResult) {
        self.events.lock().push(DelegateEvent::Finished(result.payload_bytes));
    }
}
