//! Canonical string forms for signals and the vector encoding.
//!
//! Probes should build their values through the helpers here instead of
//! formatting ad hoc, so the same signal always renders the same way.

use crate::error::FingerprintError;
use crate::types::{FingerprintVector, ProbeOutcome};

pub const SEPARATOR: char = '|';
pub const ESCAPE: char = '\\';

/// `{width}x{height}`
pub fn geometry(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}

pub fn count(n: usize) -> String {
    n.to_string()
}

pub fn flag(value: bool) -> String {
    value.to_string()
}

/// `{os}/{arch}`
pub fn platform(os: &str, arch: &str) -> String {
    format!("{}/{}", os.to_lowercase(), arch.to_lowercase())
}

/// Normalize a POSIX locale string into a BCP 47 style tag.
///
/// `en_US.UTF-8@euro` becomes `en-US`. The `C` and `POSIX` locales carry
/// no language information and yield `None`.
pub fn locale(raw: &str) -> Option<String> {
    let base = raw
        .split(|c| c == '.' || c == '@')
        .next()
        .unwrap_or("")
        .trim();

    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }

    let mut parts = base.split(|c| c == '_' || c == '-');
    let language = parts.next()?.to_lowercase();
    if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    match parts.next() {
        Some(region) if !region.is_empty() => Some(format!("{}-{}", language, region.to_uppercase())),
        _ => Some(language),
    }
}

/// Round a KiB figure to whole GiB, never below 1.
pub fn gib_rounded(kib: u64) -> String {
    let gib = (kib + 512 * 1024) / (1024 * 1024);
    gib.max(1).to_string()
}

/// A sentinel must be non-empty and free of the separator and escape
/// characters, otherwise a failed slot can encode like real values.
pub fn validate_sentinel(sentinel: &str) -> Result<(), FingerprintError> {
    if sentinel.is_empty() {
        return Err(FingerprintError::InvalidInput("sentinel must not be empty".to_string()));
    }
    if sentinel.contains(SEPARATOR) || sentinel.contains(ESCAPE) {
        return Err(FingerprintError::InvalidInput(format!(
            "sentinel '{}' must not contain '{}' or '{}'",
            sentinel, SEPARATOR, ESCAPE
        )));
    }
    Ok(())
}

/// Escape one successful value for inclusion in the encoded vector.
///
/// Backslash and separator are escaped; a value equal to the sentinel gets
/// a leading escape so it cannot be read back as a failure.
pub fn escape_value(value: &str, sentinel: &str) -> String {
    let mut out = String::with_capacity(value.len() + 1);
    if value == sentinel {
        out.push(ESCAPE);
    }
    for c in value.chars() {
        if c == ESCAPE || c == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Join all slots in registration order.
///
/// Failed slots render as the bare sentinel so the vector keeps its length
/// regardless of which signals the environment exposes.
pub fn encode_vector(vector: &FingerprintVector, sentinel: &str) -> String {
    let mut encoded = String::new();
    for (i, result) in vector.results.iter().enumerate() {
        if i > 0 {
            encoded.push(SEPARATOR);
        }
        match &result.outcome {
            ProbeOutcome::Ok(value) => encoded.push_str(&escape_value(value, sentinel)),
            ProbeOutcome::Failed(_) => encoded.push_str(sentinel),
        }
    }
    encoded
}
