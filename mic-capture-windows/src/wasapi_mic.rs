//! WASAPI microphone capture device.
//!
//! Opens a capture endpoint in shared mode with PCM auto-conversion, so the
//! audio engine resamples and downmixes to the requested 16-bit format.
//! Samples are pulled from the capture client on the recorder's capture
//! thread by `read_block`.

use std::thread;
use std::time::{Duration, Instant};

use windows::core::*;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use mic_capture_core::{CaptureDevice, CaptureError, DeviceInfo, DeviceOpener, PcmFormat};

use crate::com::{classify, ComApartment};
use crate::device_enumerator::DeviceEnumerator;
use crate::error::WasapiError;
use crate::packet_buffer::PacketBuffer;
use crate::read_policy::ReadPolicy;

/// Shared-mode engine buffer, in 100-nanosecond units (100ms).
const BUFFER_DURATION: i64 = 1_000_000;

const STREAM_FLAGS: u32 = AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
    | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY
    | AUDCLNT_STREAMFLAGS_NOPERSIST;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Opens the system default microphone, or a specific one by endpoint id.
pub struct WasapiMicOpener {
    device_id: Option<String>,
    read_policy: ReadPolicy,
}

impl WasapiMicOpener {
    pub fn default_device() -> Self {
        Self {
            device_id: None,
            read_policy: ReadPolicy::default(),
        }
    }

    /// Open a specific microphone by endpoint id (see `DeviceEnumerator`).
    pub fn with_device(id: impl Into<String>) -> Self {
        Self {
            device_id: Some(id.into()),
            read_policy: ReadPolicy::default(),
        }
    }

    /// Fail reads once the endpoint has delivered nothing for `timeout`.
    /// Without it a silent endpoint blocks capture until `stop`.
    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.read_policy.stall_timeout = Some(timeout);
        self
    }
}

impl Default for WasapiMicOpener {
    fn default() -> Self {
        Self::default_device()
    }
}

impl DeviceOpener for WasapiMicOpener {
    type Device = WasapiMicDevice;

    /// Resolve the endpoint and check that the engine accepts `format`.
    ///
    /// The format-check client is discarded; the capture thread opens its own in
    /// `start`. The default endpoint is pinned here by id.
    fn open(&self, format: &PcmFormat) -> std::result::Result<WasapiMicDevice, CaptureError> {
        let _com = ComApartment::enter()?;
        let enumerator = DeviceEnumerator::new()?;
        let endpoint = enumerator.resolve(self.device_id.as_deref())?;
        let info = enumerator.describe(&endpoint);

        unsafe { initialize_client(&endpoint, format) }.map_err(|e| match e {
            WasapiError::Call { message, .. } => WasapiError::FormatRejected(message),
            other => other,
        })?;

        log::info!(
            "Opened microphone '{}' ({}) for {} Hz, {} channel(s), {}-bit",
            info.name,
            info.id,
            format.sample_rate,
            format.channels,
            format.bits_per_sample
        );

        Ok(WasapiMicDevice {
            info,
            format: *format,
            read_policy: self.read_policy,
            last_audio: Instant::now(),
            stream: None,
            pending: PacketBuffer::new(),
            initialized: true,
        })
    }
}

/// An opened WASAPI capture endpoint.
pub struct WasapiMicDevice {
    info: DeviceInfo,
    format: PcmFormat,
    read_policy: ReadPolicy,
    last_audio: Instant,
    stream: Option<CaptureStream>,
    pending: PacketBuffer,
    initialized: bool,
}

// SAFETY: `stream` holds the only COM objects. They are created by `start`
// and dropped by `stop` (or by unwinding), both on the capture thread; the
// device only moves between threads while `stream` is None.
unsafe impl Send for WasapiMicDevice {}

impl CaptureDevice for WasapiMicDevice {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn start(&mut self) -> std::result::Result<(), CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::InvalidState("microphone already started".into()));
        }
        let stream = CaptureStream::open(&self.info.id, &self.format)?;
        self.stream = Some(stream);
        self.last_audio = Instant::now();
        log::info!("Microphone '{}' started", self.info.name);
        Ok(())
    }

    fn read_block(&mut self, block: &mut [i16]) -> std::result::Result<usize, CaptureError> {
        let Some(stream) = self.stream.as_ref() else {
            return Err(CaptureError::InvalidState("microphone not started".into()));
        };

        let started = Instant::now();
        while self.pending.len() < block.len() {
            let received = stream.drain_packets(&mut self.pending, self.format.channels)?;
            if received > 0 {
                self.last_audio = Instant::now();
                continue;
            }
            if self.read_policy.is_stalled(self.last_audio.elapsed(), self.pending.len()) {
                let timeout = self.read_policy.stall_timeout.unwrap_or_default();
                return Err(WasapiError::ReadTimeout(timeout).into());
            }
            if self.read_policy.should_return(started.elapsed()) {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }

        Ok(self.pending.drain_into(block))
    }

    fn stop(&mut self) -> std::result::Result<(), CaptureError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        self.pending.clear();
        stream.stop()?;
        log::info!("Microphone '{}' stopped", self.info.name);
        Ok(())
    }

    fn release(&mut self) {
        self.stream = None;
        self.pending.clear();
        self.initialized = false;
    }

    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }
}

/// A running capture client plus the COM apartment it lives in.
struct CaptureStream {
    capture_client: IAudioCaptureClient,
    audio_client: IAudioClient,
    /// MMCSS registration of the capture thread, reverted on stop or drop.
    mmcss: Option<HANDLE>,
    // Dropped last.
    _com: ComApartment,
}

impl CaptureStream {
    /// Sequence:
    /// 1. CoInitializeEx (MTA)
    /// 2. Resolve the endpoint pinned at open
    /// 3. Activate and initialize IAudioClient in the requested format
    /// 4. Get IAudioCaptureClient service
    /// 5. Register with MMCSS
    /// 6. Start
    fn open(device_id: &str, format: &PcmFormat) -> std::result::Result<Self, WasapiError> {
        let com = ComApartment::enter()?;
        let enumerator = DeviceEnumerator::new_raw()?;
        let endpoint = enumerator.resolve(Some(device_id))?;

        unsafe {
            let audio_client = initialize_client(&endpoint, format)?;
            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| classify("GetService", &e))?;

            let stream = Self {
                capture_client,
                audio_client,
                mmcss: register_mmcss(),
                _com: com,
            };

            // A failed start drops the stream, which reverts MMCSS.
            stream
                .audio_client
                .Start()
                .map_err(|e| classify("IAudioClient::Start", &e))?;

            Ok(stream)
        }
    }

    /// Move every queued packet into `into`. Returns the samples received.
    fn drain_packets(&self, into: &mut PacketBuffer, channels: u16) -> std::result::Result<usize, WasapiError> {
        let mut received = 0;
        unsafe {
            let mut packet_length = self
                .capture_client
                .GetNextPacketSize()
                .map_err(|e| classify("GetNextPacketSize", &e))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                self.capture_client
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(|e| classify("GetBuffer", &e))?;

                let total_samples = num_frames as usize * channels as usize;
                if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 || buffer_ptr.is_null() {
                    into.push_silence(total_samples);
                } else {
                    // Auto-conversion delivers samples in the requested 16-bit layout.
                    let samples = std::slice::from_raw_parts(buffer_ptr as *const i16, total_samples);
                    into.push(samples);
                }
                received += total_samples;

                self.capture_client
                    .ReleaseBuffer(num_frames)
                    .map_err(|e| classify("ReleaseBuffer", &e))?;

                packet_length = self
                    .capture_client
                    .GetNextPacketSize()
                    .map_err(|e| classify("GetNextPacketSize", &e))?;
            }
        }
        Ok(received)
    }

    fn stop(mut self) -> std::result::Result<(), WasapiError> {
        let stopped = unsafe { self.audio_client.Stop() }.map_err(|e| classify("IAudioClient::Stop", &e));
        self.leave_mmcss();
        stopped
    }

    fn leave_mmcss(&mut self) {
        if let Some(handle) = self.mmcss.take() {
            unsafe { revert_mmcss(handle) };
        }
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.leave_mmcss();
    }
}

fn wave_format(format: &PcmFormat) -> WAVEFORMATEX {
    WAVEFORMATEX {
        wFormatTag: WAVE_FORMAT_PCM as u16,
        nChannels: format.channels,
        nSamplesPerSec: format.sample_rate,
        nAvgBytesPerSec: format.byte_rate(),
        nBlockAlign: format.block_align(),
        wBitsPerSample: format.bits_per_sample,
        cbSize: 0,
    }
}

unsafe fn initialize_client(endpoint: &IMMDevice, format: &PcmFormat) -> std::result::Result<IAudioClient, WasapiError> {
    let audio_client: IAudioClient = endpoint
        .Activate(CLSCTX_ALL, None)
        .map_err(|e| classify("Activate", &e))?;

    let wave_format = wave_format(format);
    audio_client
        .Initialize(
            AUDCLNT_SHAREMODE_SHARED,
            STREAM_FLAGS,
            BUFFER_DURATION,
            0,
            &wave_format,
            None,
        )
        .map_err(|e| classify("IAudioClient::Initialize", &e))?;

    Ok(audio_client)
}

/// Raise the calling thread to the MMCSS "Audio" class. Best effort.
unsafe fn register_mmcss() -> Option<HANDLE> {
    let mut task_index: u32 = 0;
    let task_name: Vec<u16> = "Audio\0".encode_utf16().collect();
    match AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index) {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::warn!("MMCSS registration failed: {}", e);
            None
        }
    }
}

/// Must run on the thread that registered `handle`.
unsafe fn revert_mmcss(handle: HANDLE) -> bool {
    match AvRevertMmThreadCharacteristics(handle) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("MMCSS revert failed: {}", e);
            false
        }
    }
}
