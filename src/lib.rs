//! Deterministic fingerprint of the local environment.
//!
//! Probes each read one signal in isolation; the [`Generator`] runs them
//! concurrently under per-probe timeouts, substitutes a sentinel for every
//! failed slot and digests the canonical encoding of the whole vector.
//! Nothing is persisted or transmitted.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod probe;
pub mod types;

pub use crate::config::Config;
pub use error::{FingerprintError, ProbeError};
pub use fingerprint::{Generator, GeneratorConfig};
pub use probe::{DelayedProbe, FixedProbe, FnProbe, Probe};
pub use types::{DigestAlgorithm, Fingerprint, FingerprintVector, ProbeOutcome, ProbeResult};
