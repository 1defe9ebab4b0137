use std::time::Duration;

/// How long `read_block` waits on the capture client.
///
/// A read never fails just because audio is slow to arrive: after
/// `recheck_interval` it returns whatever it has, possibly nothing, so the
/// capture loop can look at its stop flag again. Only an explicit
/// `stall_timeout` turns a silent endpoint into a read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub recheck_interval: Duration,
    /// Fail once no audio has arrived for this long. `None` waits indefinitely.
    pub stall_timeout: Option<Duration>,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            recheck_interval: Duration::from_millis(100),
            stall_timeout: None,
        }
    }
}

impl ReadPolicy {
    /// Whether a read that has waited `waited` should hand back what it has.
    pub fn should_return(&self, waited: Duration) -> bool {
        waited >= self.recheck_interval
    }

    /// Whether the endpoint counts as stalled: nothing buffered and no audio
    /// for at least the stall timeout.
    pub fn is_stalled(&self, since_last_audio: Duration, buffered: usize) -> bool {
        buffered == 0 && self.stall_timeout.is_some_and(|timeout| since_last_audio >= timeout)
    }
}
