//! Raw tick → percent-of-travel mapping.

use crate::error::BuildError;
use crate::sampler::RawTick;

/// Number of break-points: 0%, 10%, ..., 100%.
pub const POINTS: usize = fader_config::BREAKPOINTS;
const MAX_TICK: RawTick = fader_config::MAX_TICK;

/// Factory break-points of the reference fader.
pub const NOMINAL: [RawTick; POINTS] = [511, 538, 569, 603, 643, 689, 739, 799, 869, 955, 1023];

/// Piecewise-linear calibration of the fader's (audio-taper) potentiometer.
///
/// `points[k]` is the raw tick read at `k * 10` percent of travel. The table is
/// immutable: calibration produces a new table instead of editing this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationTable {
    points: [RawTick; POINTS],
    nominal: [RawTick; POINTS],
    dead_zone_low: u16,
    dead_zone_high: u16,
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            points: NOMINAL,
            nominal: NOMINAL,
            dead_zone_low: 2,
            dead_zone_high: 3,
        }
    }
}

fn check(points: &[RawTick; POINTS]) -> Result<(), BuildError> {
    if points.windows(2).any(|w| w[1] <= w[0]) {
        return Err(BuildError::InvalidTable("break-points must be strictly increasing"));
    }
    if points[POINTS - 1] > MAX_TICK {
        return Err(BuildError::InvalidTable("break-points must be <= 1023"));
    }
    Ok(())
}

impl CalibrationTable {
    /// Build a table whose nominal and active break-points are `points`.
    pub fn new(
        points: [RawTick; POINTS],
        dead_zone_low: u16,
        dead_zone_high: u16,
    ) -> Result<Self, BuildError> {
        check(&points)?;
        Ok(Self {
            points,
            nominal: points,
            dead_zone_low,
            dead_zone_high,
        })
    }

    /// Same as [`CalibrationTable::new`] from a slice of exactly 11 ticks.
    pub fn from_slice(
        points: &[RawTick],
        dead_zone_low: u16,
        dead_zone_high: u16,
    ) -> Result<Self, BuildError> {
        let arr: [RawTick; POINTS] = points
            .try_into()
            .map_err(|_| BuildError::InvalidTable("expected 11 break-points"))?;
        Self::new(arr, dead_zone_low, dead_zone_high)
    }

    pub fn points(&self) -> &[RawTick; POINTS] {
        &self.points
    }

    pub fn nominal(&self) -> &[RawTick; POINTS] {
        &self.nominal
    }

    pub fn dead_zones(&self) -> (u16, u16) {
        (self.dead_zone_low, self.dead_zone_high)
    }

    /// Map a raw tick to percent of travel.
    ///
    /// Ticks at or below `points[0]` read as 0, ticks at or above `points[10]`
    /// as 100, anything between is interpolated within its decile (not rounded).
    #[inline]
    pub fn map(&self, tick: RawTick) -> f32 {
        // bisect-right: number of break-points <= tick
        let i = self.points.partition_point(|&p| p <= tick);
        if i == 0 {
            return 0.0;
        }
        if i == POINTS {
            return 100.0;
        }
        let lo = f32::from(self.points[i - 1]);
        let hi = f32::from(self.points[i]);
        (f32::from(tick) - lo) / (hi - lo) * 10.0 + (i - 1) as f32 * 10.0
    }

    /// Regenerate the table from a measured bottom end stop.
    ///
    /// All but the top break-point move by `test_min - nominal[0]`; the top
    /// stays at its nominal value. The dead zones are then applied to both
    /// extremes. Shifting always starts from the nominal points, so repeating
    /// a calibration with the same `test_min` yields the same table.
    pub fn shift_minimum(&self, test_min: RawTick) -> Result<Self, BuildError> {
        let delta = i32::from(test_min) - i32::from(self.nominal[0]);
        let mut shifted = [0i32; POINTS];
        for (k, slot) in shifted.iter_mut().enumerate() {
            *slot = if k == POINTS - 1 {
                i32::from(self.nominal[k])
            } else {
                i32::from(self.nominal[k]) + delta
            };
        }
        shifted[0] += i32::from(self.dead_zone_low);
        shifted[POINTS - 1] -= i32::from(self.dead_zone_high);

        let mut points = [0; POINTS];
        for (dst, &v) in points.iter_mut().zip(shifted.iter()) {
            *dst = RawTick::try_from(v)
                .map_err(|_| BuildError::InvalidTable("shifted break-point out of range"))?;
        }
        check(&points)?;
        Ok(Self {
            points,
            nominal: self.nominal,
            dead_zone_low: self.dead_zone_low,
            dead_zone_high: self.dead_zone_high,
        })
    }
}
