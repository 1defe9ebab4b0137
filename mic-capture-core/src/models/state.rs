/// Recorder state machine.
///
/// State transitions:
/// ```text
/// uninitialized → initialized → recording → finalizing → closed
///        ↑                                                  │
///        └──────────────────── init ────────────────────────┘
/// ```
/// A closed recorder needs a fresh `init` before it can record again.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Uninitialized,
    Initialized,
    Recording { duration_secs: f64 },
    Finalizing,
    Closed,
}

impl CaptureState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// States from which `init` may (re)open a device.
    pub fn accepts_init(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Closed)
    }

    /// Captured duration while recording.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } => Some(*duration_secs),
            _ => None,
        }
    }

    /// Short lowercase name, used in log lines and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Recording { .. } => "recording",
            Self::Finalizing => "finalizing",
            Self::Closed => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_allowed_only_from_uninitialized_or_closed() {
        assert!(CaptureState::Uninitialized.accepts_init());
        assert!(CaptureState::Closed.accepts_init());
        assert!(!CaptureState::Initialized.accepts_init());
        assert!(!CaptureState::Recording { duration_secs: 0.0 }.accepts_init());
        assert!(!CaptureState::Finalizing.accepts_init());
    }

    #[test]
    fn duration_only_while_recording() {
        assert_eq!(CaptureState::Recording { duration_secs: 1.5 }.duration(), Some(1.5));
        assert_eq!(CaptureState::Closed.duration(), None);
    }
}
