extern crate limb_opt;

use limb_opt::cosmic::Sky;
use limb_opt::time::{Epoch, TimeUnits};
use limb_opt::timeline::{ScienceModeTimeline, TimelineGenerator};
use limb_opt::{Configuration, ModeKind, TimelineError};
use rstest::*;
use serde_json::Value;

#[fixture]
fn generated() -> (Configuration, ScienceModeTimeline) {
    let mut config = crate::test_config();
    config.scheduling_priority = vec![ModeKind::CCDBIAS, ModeKind::PM, ModeKind::Mode130];
    let generator = TimelineGenerator::with_sky(config.clone(), Sky::default()).unwrap();
    let timeline = generator
        .generate_at(Epoch::from_gregorian_utc_hms(2022, 11, 21, 9, 5, 3))
        .unwrap();
    (config, timeline)
}

#[rstest]
fn json_array_layout(generated: (Configuration, ScienceModeTimeline)) {
    let (config, timeline) = generated;
    let json = timeline.to_json().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), timeline.entries.len() + 1);

    let header = items[0].as_array().unwrap();
    assert_eq!(header.len(), 7);
    assert_eq!(header[0], "Timeline_settings");
    assert_eq!(header[3], "2022/11/21 09:05:03");
    assert_eq!(header[4], env!("CARGO_PKG_VERSION"));
    assert_eq!(header[5]["duration"], "8 h");
    assert_eq!(header[6][0], config.tle.line1.as_str());
    assert_eq!(header[6][1], config.tle.line2.as_str());

    // [mode, start, end, settings, comment], chronologically
    let first = items[1].as_array().unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first[0], "CCDBIAS");
    assert_eq!(first[1], "2022/11/22 06:00:00");
    assert_eq!(first[2], "2022/11/22 06:00:47");
    assert_eq!(first[3]["mode_duration"], "45 s");
    assert!(first[4].is_string());

    for item in &items[1..] {
        let entry = item.as_array().unwrap();
        assert_eq!(entry.len(), 5);
        assert!(entry[3].is_object());
        // Calendar fields are not zero padded
        let start = entry[1].as_str().unwrap();
        assert!(start.starts_with("2022/11/22 "), "{start}");
    }
    assert!(timeline.entries.windows(2).all(|w| w[0].end <= w[1].start));

    let modes = timeline.entries.iter().map(|e| e.mode).collect::<Vec<_>>();
    assert_eq!(
        modes,
        vec![ModeKind::CCDBIAS, ModeKind::PM, ModeKind::Mode130, ModeKind::Mode1]
    );
}

#[rstest]
fn save_and_reload(generated: (Configuration, ScienceModeTimeline)) {
    let (config, timeline) = generated;
    let path = std::env::temp_dir().join("limb_opt_science_mode_timeline.json");
    timeline.save(&path).unwrap();
    let reloaded = ScienceModeTimeline::load(&path).unwrap();
    assert_eq!(reloaded, timeline);

    // The settings recorded in the timeline override those of the configuration file
    let mut other = config.clone();
    other.timeline.duration = 1.hours();
    other.timeline.yaw_correction = false;
    let patched = other.merged_with(&reloaded.settings_patch().unwrap());
    assert_eq!(patched.timeline, config.timeline);

    let _ = std::fs::remove_file(&path);
    assert!(matches!(
        ScienceModeTimeline::load(&path),
        Err(TimelineError::TimelineIo { .. })
    ));
}
