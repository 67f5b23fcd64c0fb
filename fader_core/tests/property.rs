use fader_core::calibration::{CalibrationTable, NOMINAL, POINTS};
use fader_core::{ControlCfg, DebounceFilter, SafetyCfg, SeekController};
use proptest::prelude::*;

/// Strictly increasing 11-point tables within 0..=1023.
fn table_strategy() -> impl Strategy<Value = CalibrationTable> {
    proptest::collection::btree_set(0u16..=1023, POINTS).prop_map(|set| {
        let pts: Vec<u16> = set.into_iter().collect();
        CalibrationTable::from_slice(&pts, 2, 3).unwrap()
    })
}

proptest! {
    #[test]
    fn break_points_map_exactly(table in table_strategy()) {
        for (i, &p) in table.points().iter().enumerate() {
            prop_assert_eq!(table.map(p), (i * 10) as f32);
        }
    }

    #[test]
    fn map_is_clamped_and_monotonic(table in table_strategy(), a in 0u16..=1023, b in 0u16..=1023) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (ml, mh) = (table.map(lo), table.map(hi));
        prop_assert!((0.0..=100.0).contains(&ml));
        prop_assert!((0.0..=100.0).contains(&mh));
        prop_assert!(ml <= mh);
        if lo < table.points()[0] {
            prop_assert_eq!(ml, 0.0);
        }
        if hi > table.points()[POINTS - 1] {
            prop_assert_eq!(mh, 100.0);
        }
    }

    #[test]
    fn debounce_is_idempotent(ticks in proptest::collection::vec(0u16..=1023, 1..50), tol in 0u16..16) {
        let mut f = DebounceFilter::new(tol);
        for &t in &ticks {
            f.admit(t, false);
            // Re-admitting the last accepted tick never emits.
            let last = f.last_read();
            prop_assert!(!f.admit(last, false));
        }
    }

    #[test]
    fn tier_speed_never_increases_closer_to_goal(a in 0.0f32..100.0, b in 0.0f32..100.0) {
        let c = SeekController::new(&ControlCfg::default(), &SafetyCfg::default()).unwrap();
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(c.speed_for(near) <= c.speed_for(far));
    }

    #[test]
    fn shift_is_idempotent(test_min in 400u16..560) {
        let t = CalibrationTable::default();
        if let Ok(once) = t.shift_minimum(test_min) {
            let twice = once.shift_minimum(test_min).unwrap();
            prop_assert_eq!(once.points(), twice.points());
            prop_assert_eq!(once.points()[POINTS - 1], NOMINAL[POINTS - 1] - 3);
        }
    }
}
