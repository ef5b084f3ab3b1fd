//! Input-log checksums.
//!
//! The client seals its input log with a SHA-256 over a canonical byte
//! encoding; the server recomputes it before trusting anything else in the
//! submission.
//!
//! # Canonical Encoding
//!
//! ```text
//! "scoreguard-inputlog-v1"        ASCII domain tag
//! seed                            i32 LE
//! count                           u32 LE
//! repeated, sorted by (t, kind, flag mask):
//!     t                           u64 LE
//!     kind                        u8 (0 direction, 1 action)
//!     flag mask                   u8 (up 1, down 2, left 4, right 8, action 16)
//! ```
//!
//! Submission order does not affect the checksum. Unset flags and flags set
//! to `false` encode identically.

use scoreguard_sim::GameInput;
use sha2::{Digest, Sha256};

/// Domain separation tag prefixed to every canonical encoding.
pub const CHECKSUM_DOMAIN_TAG: &[u8] = b"scoreguard-inputlog-v1";

/// Length of a hex-encoded SHA-256 digest.
const HEX_DIGEST_LEN: usize = 64;

/// Canonical byte encoding of an input log and its seed.
pub fn canonical_bytes(inputs: &[GameInput], seed: i32) -> Vec<u8> {
    let mut keys: Vec<_> = inputs.iter().map(GameInput::canonical_key).collect();
    keys.sort_unstable();

    let mut bytes = Vec::with_capacity(CHECKSUM_DOMAIN_TAG.len() + 8 + keys.len() * 10);
    bytes.extend_from_slice(CHECKSUM_DOMAIN_TAG);
    bytes.extend_from_slice(&seed.to_le_bytes());
    bytes.extend_from_slice(&(keys.len() as u32).to_le_bytes());
    for (t, kind, mask) in keys {
        bytes.extend_from_slice(&t.to_le_bytes());
        bytes.push(kind);
        bytes.push(mask);
    }
    bytes
}

/// Lowercase hex SHA-256 of the canonical encoding.
pub fn generate_checksum(inputs: &[GameInput], seed: i32) -> String {
    format!("{:x}", Sha256::digest(canonical_bytes(inputs, seed)))
}

/// Check a client-supplied checksum.
///
/// Comparison is case-insensitive and does not short-circuit on the first
/// differing byte. Anything that is not a 64 character hex string is simply
/// a mismatch.
pub fn verify_checksum(inputs: &[GameInput], seed: i32, claimed: &str) -> bool {
    if claimed.len() != HEX_DIGEST_LEN || !claimed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }
    let expected = generate_checksum(inputs, seed);
    let claimed = claimed.to_ascii_lowercase();
    constant_time_eq(expected.as_bytes(), claimed.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
