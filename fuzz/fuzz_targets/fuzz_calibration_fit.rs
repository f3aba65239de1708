#![no_main]
use libfuzzer_sys::fuzz_target;
use raincatch_config::{CalibrationRow, VolumeCalibration};

fuzz_target!(|pairs: Vec<(f32, f32)>| {
    let rows: Vec<CalibrationRow> = pairs
        .into_iter()
        .map(|(distance_cm, liters)| CalibrationRow {
            distance_cm,
            liters,
        })
        .collect();
    if let Ok(cal) = VolumeCalibration::from_rows(rows) {
        assert!(cal.slope_l_per_cm.is_finite());
        assert!(cal.intercept_l.is_finite());
    }
});
