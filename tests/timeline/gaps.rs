extern crate limb_opt;

use limb_opt::cosmic::Sky;
use limb_opt::time::TimeUnits;
use limb_opt::timeline::settings::StartupCommandSettings;
use limb_opt::timeline::TimelineGenerator;
use limb_opt::{Configuration, ModeKind};
use rstest::*;

#[fixture]
fn config() -> Configuration {
    let mut config = crate::test_config();
    let start = config.timeline.start_date;
    config.timeline.duration = 4.hours();
    config.scheduling_priority = vec![
        ModeKind::CCDBIAS,
        ModeKind::PM,
        ModeKind::Mode130,
        ModeKind::Mode131,
        ModeKind::Mode100,
        ModeKind::HTR,
    ];
    // Leaves a gap shorter than the minimum operational duration after the startup commands
    config.mode130.start_date = Some(start + 80.seconds());
    config.mode131.start_date = Some(start + 1.hours());
    config.mode100.start_date = Some(start + 2.hours());
    config.startup_commands.insert(
        ModeKind::HTR,
        StartupCommandSettings::builder()
            .mode_duration(30.seconds())
            .start_date(start + 3.hours() + 30.minutes())
            .build(),
    );
    config
}

#[rstest]
fn operational_mode_fills_every_gap(config: Configuration) {
    let _ = pretty_env_logger::try_init();
    let horizon_start = config.timeline.start_date;
    let horizon_end = config.timeline.end_date();
    let min_duration = config.timeline.min_operational_duration;
    let operational = config.timeline.operational_mode;

    let generator = TimelineGenerator::with_sky(config, Sky::default()).unwrap();
    let report = generator.generate_report(horizon_start).unwrap();
    assert!(report.placements.iter().all(|(_, p)| p.is_placed()), "{:?}", report.placements);

    let entries = &report.timeline.entries;
    assert!(entries.iter().any(|e| e.mode == operational));

    // Chronological, no double coverage, and whatever is left uncovered is shorter than the minimum
    let mut cursor = horizon_start;
    let mut uncovered = Vec::new();
    for entry in entries {
        assert!(entry.start >= cursor, "{entry:?} overlaps the previous entry");
        if entry.start > cursor {
            uncovered.push(entry.start - cursor);
        }
        cursor = entry.end;
    }
    assert_eq!(cursor, horizon_end);
    assert!(!uncovered.is_empty());
    assert!(uncovered.iter().all(|gap| *gap < min_duration), "{uncovered:?}");

    // Operational fragments never touch each other
    for pair in entries.windows(2) {
        assert!(!(pair[0].mode == operational && pair[1].mode == operational && pair[0].end == pair[1].start));
    }
}

#[rstest]
fn no_gap_filling_below_the_minimum(mut config: Configuration) {
    config.timeline.min_operational_duration = 5.hours();
    let generator = TimelineGenerator::with_sky(config, Sky::default()).unwrap();
    let start = generator.config.timeline.start_date;
    let timeline = generator.generate_at(start).unwrap();
    assert!(timeline.entries.iter().all(|e| !e.mode.is_operational()));
}
