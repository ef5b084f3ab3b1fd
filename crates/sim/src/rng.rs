//! Seeded deterministic RNG shared by client and server simulations.
//!
//! Mulberry32: one 32-bit word of state, two multiply/xorshift rounds per
//! output. Every multiply, add and shift is performed on `u32` with wrapping
//! semantics so the sequence is bit-identical to a JavaScript implementation
//! built on `Math.imul` and `>>> 0`.
//!
//! Not suitable for cryptographic use.

/// Increment added to the state on every step.
const MULBERRY_INCREMENT: u32 = 0x6D2B79F5;

/// 2^32 as f64, the divisor mapping a `u32` output into `[0, 1)`.
const U32_RANGE: f64 = 4_294_967_296.0;

/// Algorithm identifier recorded alongside replays.
pub const RNG_ALGO_ID: &str = "mulberry32";

/// Seeded Mulberry32 generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rng {
    state: u32,
}

impl Rng {
    /// Create a generator from a signed 32-bit seed.
    ///
    /// Negative seeds are reinterpreted as their two's-complement bits, which
    /// matches `seed | 0` on the client.
    pub fn new(seed: i32) -> Self {
        Self {
            state: seed as u32,
        }
    }

    /// Current internal state word (for digests and tests).
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let s = self.state;

        let mut t = (s ^ (s >> 15)).wrapping_mul(s | 1);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61)) ^ t;
        t ^ (t >> 14)
    }

    /// Next float in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        f64::from(self.next_u32()) / U32_RANGE
    }

    /// Integer in `[min, max]` (inclusive). Returns `min` when `max < min`.
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = f64::from(max) - f64::from(min) + 1.0;
        let offset = (self.next() * span).floor();
        (f64::from(min) + offset) as i32
    }

    /// Float in `[min, max)`.
    pub fn next_float(&mut self, min: f64, max: f64) -> f64 {
        min + self.next() * (max - min)
    }

    /// `true` with probability `p`.
    pub fn next_bool(&mut self, p: f64) -> bool {
        self.next() < p
    }

    /// Fair coin flip.
    pub fn chance(&mut self) -> bool {
        self.next_bool(0.5)
    }

    /// Uniformly pick an element. `None` for an empty slice (no state advance).
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = (self.next() * items.len() as f64) as usize;
        items.get(index.min(items.len() - 1))
    }
}
