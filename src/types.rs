use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Result of running one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok(String),
    Failed(ProbeError),
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok(_))
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Ok(value) => Some(value),
            ProbeOutcome::Failed(_) => None,
        }
    }
}

impl From<Result<String, ProbeError>> for ProbeOutcome {
    fn from(result: Result<String, ProbeError>) -> Self {
        match result {
            Ok(value) => ProbeOutcome::Ok(value),
            Err(e) => ProbeOutcome::Failed(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub name: String,
    pub outcome: ProbeOutcome,
}

/// Probe results in registration order.
///
/// Completion order never leaks in here; slot `i` always belongs to the
/// `i`-th registered probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintVector {
    pub results: Vec<ProbeResult>,
}

impl FingerprintVector {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.outcome.is_ok()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    /// 32-bit `h * 31 + c` rolling hash, 8 hex chars
    Rolling32,
    /// SHA-256 truncated to the configured number of hex chars
    #[default]
    Sha256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub algorithm: DigestAlgorithm,
    pub hex: String,
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex)
    }
}
