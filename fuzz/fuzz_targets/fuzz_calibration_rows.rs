#![no_main]
use fader_config::BreakpointRow;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|rows: Vec<(u8, u16)>| {
    let rows: Vec<BreakpointRow> = rows
        .into_iter()
        .map(|(percent, tick)| BreakpointRow { percent, tick })
        .collect();
    if let Ok(points) = fader_config::breakpoints_from_rows(&rows) {
        assert_eq!(points.len(), fader_config::BREAKPOINTS);
        assert!(points.windows(2).all(|w| w[0] < w[1]));
    }
});
