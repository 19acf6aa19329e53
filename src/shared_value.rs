//! A lock-free cell for the one value that crosses threads: the user
//! position, written by the tick loop and read by the telemetry worker.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// A shared `f64`, stored as its bit pattern in an [`AtomicU64`].
///
/// Readers get whatever value was stored last. No ordering with any other
/// memory is implied; a telemetry frame built from a slightly stale value is
/// harmless, so `Relaxed` is all that is needed.
#[derive(Debug, Clone, Default)]
pub struct SharedValue {
    bits: Arc<AtomicU64>,
}

impl SharedValue {
    /// A cell holding `value`.
    pub fn new(value: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }

    /// Replace the value.
    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// The most recently stored value.
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
