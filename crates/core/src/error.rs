use std::io;

use crate::route::ControlKind;

/// Result alias that carries the custom [`TunerError`] type.
pub type Result<T> = std::result::Result<T, TunerError>;

/// Common error type for the core crate.
///
/// Every variant is terminal for a bring-up attempt. Nothing in the core
/// retries; a caller wanting retries wraps the whole orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// The tuner device node could not be opened. No handle exists, so
    /// nothing is closed afterwards.
    #[error("failed to open tuner device `{path}`: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("device query `{operation}` failed: {reason}")]
    DeviceQuery {
        operation: &'static str,
        reason: String,
    },
    #[error("device control `{operation}` failed: {reason}")]
    DeviceControl {
        operation: &'static str,
        reason: String,
    },
    #[error("calibration failed: {0}")]
    Calibration(String),
    /// The requested frequency converts to a native value outside the band
    /// reported by the tuner.
    #[error("frequency {requested_khz} kHz maps to native {native}, outside {low}..={high}")]
    OutOfRange {
        requested_khz: u32,
        native: u64,
        low: u32,
        high: u32,
    },
    #[error("mixer control `{control}` not found ({applied} earlier controls left applied)")]
    ControlNotFound { control: String, applied: usize },
    #[error("mixer control `{control}` is {actual}, expected {expected} ({applied} earlier controls left applied)")]
    UnsupportedControlKind {
        control: String,
        expected: ControlKind,
        actual: ControlKind,
        applied: usize,
    },
    #[error("mixer control `{control}` rejected write: {reason} ({applied} earlier controls left applied)")]
    ControlWriteRejected {
        control: String,
        reason: String,
        applied: usize,
    },
    #[error("mixer unavailable while resolving `{control}`: {source}")]
    MixerTransport {
        control: String,
        applied: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to open {direction} stream: {reason}")]
    StreamOpen {
        direction: &'static str,
        reason: String,
    },
    #[error("failed to start {direction} stream: {reason}")]
    StreamStart {
        direction: &'static str,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// A configuration value parsed but cannot be used.
    #[error("invalid configuration value: {0}")]
    InvalidConfig(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl TunerError {
    pub(crate) fn query(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::DeviceQuery {
            operation,
            reason: err.to_string(),
        }
    }

    pub(crate) fn control(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::DeviceControl {
            operation,
            reason: err.to_string(),
        }
    }

    /// Name of the mixer control that stopped a routing sequence, if this
    /// error came from the audio route sequencer.
    pub fn failed_control(&self) -> Option<&str> {
        match self {
            Self::ControlNotFound { control, .. }
            | Self::UnsupportedControlKind { control, .. }
            | Self::ControlWriteRejected { control, .. }
            | Self::MixerTransport { control, .. } => Some(control),
            _ => None,
        }
    }

    /// Number of routing controls that were written before the failure.
    pub fn applied_controls(&self) -> Option<usize> {
        match self {
            Self::ControlNotFound { applied, .. }
            | Self::UnsupportedControlKind { applied, .. }
            | Self::ControlWriteRejected { applied, .. }
            | Self::MixerTransport { applied, .. } => Some(*applied),
            _ => None,
        }
    }
}
