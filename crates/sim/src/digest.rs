//! State digests for replay audit records.
//!
//! FNV-1a 64-bit over little-endian field encodings. Floats are canonicalized
//! first so that `-0.0`/`+0.0` and differing NaN payloads hash identically.

/// Digest algorithm identifier recorded in replay results.
pub const STATE_DIGEST_ALGO_ID: &str = "statedigest-v1-fnv1a64-le-f64canon";

/// FNV-1a 64-bit offset basis.
const FNV1A_OFFSET_BASIS: u64 = 0xcbf29ce484222325;

/// FNV-1a 64-bit prime.
const FNV1A_PRIME: u64 = 0x100000001b3;

/// Incremental FNV-1a 64-bit hasher.
#[derive(Debug, Clone)]
pub struct StateHasher {
    state: u64,
}

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHasher {
    pub fn new() -> Self {
        Self {
            state: FNV1A_OFFSET_BASIS,
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV1A_PRIME);
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.update(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.update(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.update(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.update(&[u8::from(value)]);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.update(&canonicalize_f64(value).to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.state
    }
}

/// Canonicalize an f64 value for deterministic hashing.
///
/// - `-0.0` → `+0.0`
/// - Any NaN → quiet NaN bit pattern `0x7ff8000000000000`
pub fn canonicalize_f64(value: f64) -> u64 {
    const QUIET_NAN_BITS: u64 = 0x7ff8000000000000;

    if value.is_nan() {
        QUIET_NAN_BITS
    } else if value == 0.0 {
        0u64
    } else {
        value.to_bits()
    }
}
