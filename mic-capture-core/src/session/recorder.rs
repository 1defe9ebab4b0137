use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioLevels, CaptureDiagnostics};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::CaptureState;
use crate::session::capture_loop::{CaptureLoop, CaptureOutcome};
use crate::storage::metadata;
use crate::storage::wav_writer::WavFileWriter;
use crate::traits::byte_sink::{FileSinkFactory, SinkFactory};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_device::{CaptureDevice, DeviceGuard, DeviceOpener};
use crate::traits::capture_session::CaptureSession;

/// Mutable session state shared with the capture thread, protected by
/// `parking_lot::Mutex`.
pub struct SessionState {
    pub state: CaptureState,
    pub levels: AudioLevels,
    pub diagnostics: CaptureDiagnostics,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Uninitialized,
            levels: AudioLevels::default(),
            diagnostics: CaptureDiagnostics::default(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Microphone recorder: captures 16-bit PCM on a background thread and
/// writes it as a WAV file on stop.
///
/// ```text
/// [Device] → read_block → [CaptureLoop: Vec<u8>] ──join──→ [WavFileWriter] → [Sink]
/// ```
///
/// The capture thread owns both the device and the accumulation buffer while
/// recording. `stop` clears the running flag, joins the thread, and only then
/// reads the buffer, so no lock guards the PCM bytes.
pub struct PcmRecorder<O: DeviceOpener> {
    config: CaptureConfiguration,
    opener: O,
    sinks: Box<dyn SinkFactory>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    session_state: Arc<Mutex<SessionState>>,

    // Device handle between init and start; owned by the capture thread while recording.
    device: Option<DeviceGuard<O::Device>>,
    output_path: Option<PathBuf>,

    running: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<CaptureOutcome<O::Device>>>,

    // PCM kept after a failed stop so it can be written elsewhere.
    pending: Option<Vec<u8>>,
}

impl<O: DeviceOpener> PcmRecorder<O> {
    pub fn new(config: CaptureConfiguration, opener: O) -> Self {
        Self {
            config,
            opener,
            sinks: Box::new(FileSinkFactory),
            delegate: None,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            device: None,
            output_path: None,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
            pending: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Replace the filesystem sink, e.g. with an in-memory or network sink.
    pub fn set_sink_factory(&mut self, sinks: Box<dyn SinkFactory>) {
        self.sinks = sinks;
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.session_state.lock().state.clone()
    }

    /// Whether the capture loop is running. Turns false as soon as the loop
    /// exits on its own (read failure), before `stop` is called.
    pub fn is_recording(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.session_state.lock().levels
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.session_state.lock().diagnostics.clone()
    }

    /// Destination given to the last successful `init` or `finalize_pending`.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn has_pending_recording(&self) -> bool {
        self.pending.is_some()
    }

    /// Size of the PCM retained after a failed stop.
    pub fn pending_bytes(&self) -> usize {
        self.pending.as_ref().map_or(0, Vec::len)
    }

    /// Open the device for a recording destined for `output_path`.
    /// Transitions: uninitialized/closed → initialized.
    ///
    /// Fails fast with `CaptureError::Configuration` if the configuration is
    /// invalid or the device rejects the format; the state is left unchanged.
    pub fn init(&mut self, output_path: impl Into<PathBuf>) -> Result<(), CaptureError> {
        let current = self.state();
        if !current.accepts_init() {
            return self.report(CaptureError::InvalidState(format!(
                "cannot init while {}",
                current.name()
            )));
        }

        if let Err(e) = self.config.validate() {
            return self.report(e);
        }

        let format = self.config.format();
        let device = match self.opener.open(&format) {
            Ok(device) => device,
            Err(e) => {
                log::error!(
                    "Unable to record audio with {} Hz, {} channel(s), {}-bit: {}",
                    format.sample_rate,
                    format.channels,
                    format.bits_per_sample,
                    e
                );
                return self.report(e);
            }
        };

        let mut guard = DeviceGuard::new(device);
        if !guard.get().is_some_and(|d| d.is_initialized()) {
            guard.release();
            return self.report(CaptureError::Configuration(
                "recorder not initialized properly".into(),
            ));
        }

        if let Some(stale) = self.pending.take() {
            log::warn!("Discarding {} bytes of unwritten PCM from the previous recording", stale.len());
        }

        let output_path = output_path.into();
        if let Some(device) = guard.get() {
            log::info!(
                "Capture device '{}' initialized: {} Hz, block of {} samples, output {}",
                device.device_info().name,
                format.sample_rate,
                self.config.block_size,
                output_path.display()
            );
        }

        self.device = Some(guard);
        self.output_path = Some(output_path);
        {
            let mut s = self.session_state.lock();
            s.levels = AudioLevels::default();
            s.diagnostics = CaptureDiagnostics::default();
        }
        self.set_state(CaptureState::Initialized);
        Ok(())
    }

    /// Start capture on a background thread and return once the device is
    /// delivering audio. Transitions: initialized → recording.
    ///
    /// If the device fails to start it is kept and the recorder stays
    /// initialized.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        let current = self.state();
        if !current.is_initialized() {
            return self.report(CaptureError::InvalidState(format!(
                "can only start from initialized state, not {}",
                current.name()
            )));
        }
        let Some(device) = self.device.take() else {
            return self.report(CaptureError::InvalidState("no device is open".into()));
        };

        self.running.store(true, Ordering::SeqCst);

        let capture = CaptureLoop::new(
            device,
            Arc::clone(&self.running),
            Arc::clone(&self.session_state),
            self.delegate.clone(),
            self.config.format(),
            self.config.block_size,
        );
        let (started_tx, started_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("pcm-capture".into())
            .spawn(move || capture.run(started_tx));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                // The closure, and the device guard in it, has been dropped.
                self.running.store(false, Ordering::SeqCst);
                self.set_state(CaptureState::Closed);
                return self.report(CaptureError::CaptureThread(format!(
                    "failed to spawn capture thread: {}",
                    e
                )));
            }
        };

        match started_rx.recv() {
            Ok(Ok(())) => {
                self.capture_handle = Some(handle);
                self.enter_recording();
                log::info!("Recording started");
                Ok(())
            }
            Ok(Err(e)) => {
                match handle.join() {
                    Ok(outcome) => self.device = Some(outcome.device),
                    Err(panic) => {
                        self.set_state(CaptureState::Closed);
                        return self.report(CaptureError::CaptureThread(panic_message(&*panic)));
                    }
                }
                self.report(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let message = match handle.join() {
                    Err(panic) => panic_message(&*panic),
                    Ok(_) => "capture thread exited before starting".to_string(),
                };
                self.set_state(CaptureState::Closed);
                self.report(CaptureError::CaptureThread(message))
            }
        }
    }

    /// Stop capture, write the WAV file and release the device.
    /// Transitions: recording → finalizing → closed.
    ///
    /// Returns `Ok(None)` without side effects when not recording. On a read
    /// or sink failure the device is still released, the captured PCM is
    /// retained for [`finalize_pending`](Self::finalize_pending), and the
    /// error is returned. If only stopping the device failed, the file is
    /// written first and that error is returned afterwards.
    pub fn stop(&mut self) -> Result<Option<RecordingResult>, CaptureError> {
        let Some(handle) = self.capture_handle.take() else {
            log::debug!("stop called while {}; nothing to do", self.state().name());
            return Ok(None);
        };

        self.set_state(CaptureState::Finalizing);

        // Clear flag → join → read buffer.
        self.running.store(false, Ordering::SeqCst);
        let outcome = match handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => {
                // The device guard was dropped, and the device released, while unwinding.
                self.set_state(CaptureState::Closed);
                return self.report(CaptureError::CaptureThread(panic_message(&*panic)));
            }
        };

        let CaptureOutcome {
            device: mut guard,
            pcm,
            error,
            stop_error,
        } = outcome;

        if let Some(e) = error {
            guard.release();
            self.pending = Some(pcm);
            self.set_state(CaptureState::Closed);
            return self.report(e);
        }

        let written = match self.output_path.clone() {
            Some(path) => self.finalize(&path, &pcm),
            None => Err(CaptureError::InvalidState("no output path".into())),
        };
        // Sink is closed by now; release regardless of the write outcome.
        guard.release();
        self.set_state(CaptureState::Closed);

        match written {
            Ok(result) => {
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_finished(&result);
                }
                // The recording is complete on the sink; the stop failure is still reported.
                match stop_error {
                    Some(e) => self.report(e),
                    None => Ok(Some(result)),
                }
            }
            Err(e) => {
                self.pending = Some(pcm);
                self.report(e)
            }
        }
    }

    /// Write the PCM retained by a failed `stop` to `output_path`.
    ///
    /// On failure the PCM stays pending and the call may be repeated.
    pub fn finalize_pending(&mut self, output_path: impl Into<PathBuf>) -> Result<RecordingResult, CaptureError> {
        let Some(pcm) = self.pending.take() else {
            return self.report(CaptureError::InvalidState("no pending recording".into()));
        };

        let output_path = output_path.into();
        match self.finalize(&output_path, &pcm) {
            Ok(result) => {
                self.output_path = Some(output_path);
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_finished(&result);
                }
                Ok(result)
            }
            Err(e) => {
                self.pending = Some(pcm);
                self.report(e)
            }
        }
    }

    // --- Internal helpers ---

    fn finalize(&self, path: &Path, pcm: &[u8]) -> Result<RecordingResult, CaptureError> {
        let format = self.config.format();
        let writer = WavFileWriter::new(path.to_path_buf(), format);
        let checksum = writer.write(self.sinks.as_ref(), pcm)?;

        let payload_bytes = pcm.len() as u64;
        let metadata = RecordingMetadata::new(format, payload_bytes, &path.to_string_lossy(), &checksum);
        if self.config.write_metadata {
            let sidecar = metadata::write_metadata_to(self.sinks.as_ref(), &metadata, path)?;
            log::debug!("Wrote metadata sidecar {}", sidecar.display());
        }

        Ok(RecordingResult {
            file_path: path.to_path_buf(),
            duration_secs: metadata.duration_secs,
            payload_bytes,
            checksum,
            metadata,
        })
    }

    // Blocks read before this point already count toward the duration.
    fn enter_recording(&self) {
        let recording = {
            let mut s = self.session_state.lock();
            s.state = CaptureState::Recording {
                duration_secs: self.config.format().duration_secs(s.diagnostics.bytes_accumulated),
            };
            s.state.clone()
        };
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&recording);
        }
    }

    fn set_state(&self, new_state: CaptureState) {
        {
            let mut s = self.session_state.lock();
            s.state = new_state.clone();
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    fn report<T>(&self, error: CaptureError) -> Result<T, CaptureError> {
        log::error!("{}", error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
        Err(error)
    }
}

impl<O: DeviceOpener> CaptureSession for PcmRecorder<O> {
    fn state(&self) -> CaptureState {
        PcmRecorder::state(self)
    }

    fn is_recording(&self) -> bool {
        PcmRecorder::is_recording(self)
    }

    fn current_levels(&self) -> AudioLevels {
        PcmRecorder::current_levels(self)
    }

    fn diagnostics(&self) -> CaptureDiagnostics {
        PcmRecorder::diagnostics(self)
    }

    fn init(&mut self, output_path: PathBuf) -> Result<(), CaptureError> {
        PcmRecorder::init(self, output_path)
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        PcmRecorder::start(self)
    }

    fn stop(&mut self) -> Result<Option<RecordingResult>, CaptureError> {
        PcmRecorder::stop(self)
    }
}

impl<O: DeviceOpener> Drop for PcmRecorder<O> {
    fn drop(&mut self) {
        if let Some(handle) = self.capture_handle.take() {
            log::warn!("Recorder dropped while recording; discarding captured audio");
            self.running.store(false, Ordering::SeqCst);
            // Dropping the outcome releases the device.
            if handle.join().is_err() {
                log::error!("Capture thread panicked during shutdown");
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("capture thread panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("capture thread panicked: {}", s)
    } else {
        "capture thread panicked".to_string()
    }
}
