use crate::models::audio_models::{DeviceInfo, PcmFormat};
use crate::models::error::CaptureError;

/// Interface for a platform microphone opened for 16-bit PCM capture.
///
/// Implemented by:
/// - `WasapiMicDevice` (Windows)
///
/// A device is owned by exactly one recorder. `start` and `read_block` are
/// called on the capture thread, so implementations must be `Send`.
pub trait CaptureDevice: Send + 'static {
    /// Whether the device finished opening in the requested format.
    fn is_initialized(&self) -> bool;

    /// Begin delivering audio. Called once, on the capture thread.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Block until samples are available and copy up to `block.len()` of them
    /// into `block`. Returns the number of samples written.
    ///
    /// This is the only suspension point of the capture loop. Returning
    /// `Ok(0)` is allowed and lets the loop re-check its stop flag.
    fn read_block(&mut self, block: &mut [i16]) -> Result<usize, CaptureError>;

    /// Stop delivering audio. The device may be restarted only after a new open.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Release the underlying hardware handle. Called exactly once by
    /// [`DeviceGuard`].
    fn release(&mut self);

    /// Information about the hardware backing this device.
    fn device_info(&self) -> DeviceInfo;
}

/// Opens a [`CaptureDevice`] in a requested format.
///
/// Returns `CaptureError::Configuration` when the device rejects the format.
pub trait DeviceOpener: Send {
    type Device: CaptureDevice;

    fn open(&self, format: &PcmFormat) -> Result<Self::Device, CaptureError>;
}

impl<D, F> DeviceOpener for F
where
    D: CaptureDevice,
    F: Fn(&PcmFormat) -> Result<D, CaptureError> + Send,
{
    type Device = D;

    fn open(&self, format: &PcmFormat) -> Result<D, CaptureError> {
        self(format)
    }
}

/// Scoped ownership of an open device.
///
/// Releases the device exactly once: explicitly through [`DeviceGuard::release`]
/// or implicitly on drop, including during unwinding of the capture thread.
pub struct DeviceGuard<D: CaptureDevice> {
    device: Option<D>,
}

impl<D: CaptureDevice> DeviceGuard<D> {
    pub fn new(device: D) -> Self {
        Self { device: Some(device) }
    }

    pub fn get(&self) -> Option<&D> {
        self.device.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut D> {
        self.device.as_mut()
    }

    /// Release the device now. Further calls are no-ops.
    pub fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            log::info!("Releasing capture device '{}'", device.device_info().name);
            device.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.device.is_none()
    }
}

impl<D: CaptureDevice> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedDevice;

    #[test]
    fn guard_releases_once_on_explicit_release_and_drop() {
        let device = ScriptedDevice::new();
        let counters = device.counters();

        let mut guard = DeviceGuard::new(device);
        guard.release();
        guard.release();
        assert!(guard.is_released());
        drop(guard);

        assert_eq!(counters.releases(), 1);
    }

    #[test]
    fn guard_releases_on_drop() {
        let device = ScriptedDevice::new();
        let counters = device.counters();
        drop(DeviceGuard::new(device));
        assert_eq!(counters.releases(), 1);
    }

    #[test]
    fn closures_act_as_openers() {
        let opener = |format: &PcmFormat| {
            assert_eq!(*format, PcmFormat::SPEECH);
            Ok::<_, CaptureError>(ScriptedDevice::new())
        };
        let device = opener.open(&PcmFormat::SPEECH).unwrap();
        assert!(device.is_initialized());
    }
}
