use std::io;
use std::time::Duration;

/// Why a single probe produced no value.
///
/// Every variant is handled the same way by the generator: the slot is
/// filled with the sentinel and aggregation continues.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("signal unavailable: {0}")]
    Unavailable(String),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("access denied: {0}")]
    Denied(String),

    #[error("probe faulted: {0}")]
    Faulted(String),
}

impl ProbeError {
    /// Short tag used in logs and `explain` output
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Unavailable(_) => "unavailable",
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Denied(_) => "denied",
            ProbeError::Faulted(_) => "faulted",
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ProbeError::Denied(err.to_string()),
            _ => ProbeError::Unavailable(err.to_string()),
        }
    }
}

/// Errors surfaced to callers of the generator.
///
/// Only malformed input is reported; degraded probes never are.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
