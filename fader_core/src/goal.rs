//! Lock-free goal cell shared between the control thread and its owner.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Bit pattern reserved for "no goal". A quiet NaN no arithmetic produces.
const NONE_BITS: u32 = 0x7FC0_DEAD;

/// Target position shared with the control loop; last write wins.
///
/// Clones refer to the same cell. Non-finite goals are stored as `None`.
#[derive(Debug, Clone)]
pub struct GoalHandle {
    bits: Arc<AtomicU32>,
}

impl Default for GoalHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn encode(goal: Option<f32>) -> u32 {
    match goal {
        Some(g) if g.is_finite() => g.to_bits(),
        _ => NONE_BITS,
    }
}

#[inline]
fn decode(bits: u32) -> Option<f32> {
    if bits == NONE_BITS {
        None
    } else {
        Some(f32::from_bits(bits))
    }
}

impl GoalHandle {
    pub fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(NONE_BITS)),
        }
    }

    pub fn set(&self, goal: Option<f32>) {
        self.bits.store(encode(goal), Ordering::Release);
    }

    pub fn get(&self) -> Option<f32> {
        decode(self.bits.load(Ordering::Acquire))
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// Clear the goal only if it still holds `expected`.
    ///
    /// Returns `false` when another writer replaced the goal in the meantime.
    pub fn clear_if(&self, expected: f32) -> bool {
        self.bits
            .compare_exchange(
                encode(Some(expected)),
                NONE_BITS,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}
