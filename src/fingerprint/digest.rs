use sha2::{Digest, Sha256};

use crate::types::DigestAlgorithm;

pub const ROLLING32_WIDTH: usize = 8;
pub const MIN_SHA256_LEN: usize = 8;
pub const MAX_SHA256_LEN: usize = 64;

/// 32-bit `h * 31 + c` hash over UTF-16 code units.
///
/// Wraps like a signed 32-bit integer and reports the magnitude, so
/// `i32::MIN` renders as `80000000`. Always 8 lowercase hex chars.
pub fn rolling32(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    format!("{:0width$x}", hash.unsigned_abs(), width = ROLLING32_WIDTH)
}

/// SHA-256 hex, truncated to `len` chars (clamped to 8..=64, even).
pub fn sha256_truncated(input: &str, len: usize) -> String {
    let len = normalize_sha256_len(len);
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..len / 2])
}

pub fn normalize_sha256_len(len: usize) -> usize {
    (len.clamp(MIN_SHA256_LEN, MAX_SHA256_LEN) / 2) * 2
}

pub fn digest(input: &str, algorithm: DigestAlgorithm, sha256_len: usize) -> String {
    match algorithm {
        DigestAlgorithm::Rolling32 => rolling32(input),
        DigestAlgorithm::Sha256 => sha256_truncated(input, sha256_len),
    }
}
