//! Common time/period helpers for fader_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
///
/// 64 Hz yields 15 625 µs, the fader's native cadence.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Smallest and largest value of a non-empty window, `None` when empty.
pub(crate) fn span<T, I>(values: I) -> Option<(T, T)>
where
    T: PartialOrd + Copy,
    I: IntoIterator<Item = T>,
{
    let mut it = values.into_iter();
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), v| {
        (if v < lo { v } else { lo }, if v > hi { v } else { hi })
    }))
}
