//! Object name generation.
//!
//! A generated name is `<timestamp><digest>`: a strictly monotonic
//! nanosecond timestamp followed by the decimal CRC-32 of the payload. The
//! timestamp keeps two stores of identical bytes apart, so names are not
//! content addresses.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

static GLOBAL: NameGenerator = NameGenerator::new();

/// Non-cryptographic payload digest rendered as unsigned decimal digits.
pub fn payload_digest(data: &[u8]) -> String {
    crc32fast::hash(data).to_string()
}

/// Monotonic name source.
///
/// Wall-clock nanoseconds, bumped by one whenever the clock has not advanced
/// past the last issued value. Timestamps from one generator are strictly
/// increasing, even across threads and within a single clock tick.
pub struct NameGenerator {
    last_nanos: Mutex<u128>,
}

impl NameGenerator {
    pub const fn new() -> Self {
        Self {
            last_nanos: Mutex::new(0),
        }
    }

    /// The process-wide generator shared by all backends.
    pub fn global() -> &'static NameGenerator {
        &GLOBAL
    }

    /// Next timestamp, strictly greater than any previously returned.
    pub fn next_timestamp(&self) -> u128 {
        let wall = Self::wall_clock_nanos();
        let mut last = self.last_nanos.lock().unwrap_or_else(PoisonError::into_inner);
        let next = wall.max(*last + 1);
        *last = next;
        next
    }

    /// Generate an object name for `data`.
    pub fn generate(&self, data: &[u8]) -> String {
        format!("{}{}", self.next_timestamp(), payload_digest(data))
    }

    fn wall_clock_nanos() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}
