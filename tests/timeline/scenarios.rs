extern crate limb_opt;

use limb_opt::cosmic::{Ephemeris, OrbitAttitudeSimulator, Sky, Star, StarCatalog};
use limb_opt::schedule::Interval;
use limb_opt::time::{Duration, TimeUnits};
use limb_opt::timeline::{OutOfHorizon, Placement, TimelineGenerator};
use limb_opt::visibility::{FovParams, MoonScanner, ScanWindow, StarScanner};
use limb_opt::{Configuration, ModeKind};
use rstest::*;

#[fixture]
fn config() -> Configuration {
    crate::test_config()
}

#[rstest]
fn startup_commands_back_to_back(mut config: Configuration) {
    let _ = pretty_env_logger::try_init();
    config.scheduling_priority = vec![ModeKind::CCDBIAS, ModeKind::PM];
    let start = config.timeline.start_date;
    let separation = config.timeline.mode_separation;
    let bias_duration = config.startup_command(ModeKind::CCDBIAS).mode_duration;

    let generator = TimelineGenerator::with_sky(config, Sky::default()).unwrap();
    let report = generator.generate_report(start).unwrap();

    let (bias, pm) = match (&report.placements[0], &report.placements[1]) {
        ((ModeKind::CCDBIAS, bias), (ModeKind::PM, pm)) => (bias, pm),
        other => panic!("unexpected placements {other:?}"),
    };
    let bias = bias.interval().unwrap();
    let pm_interval = pm.interval().unwrap();
    assert_eq!(bias.start, start);
    assert_eq!(pm_interval.start, bias.start + bias_duration + separation);
    assert_eq!(pm.postponements(), 0);
    assert_eq!(report.placements[0].1.postponements(), 0);
}

#[rstest]
fn same_mode_twice_is_postponed(mut config: Configuration) {
    let _ = pretty_env_logger::try_init();
    config.scheduling_priority = vec![ModeKind::Mode130, ModeKind::Mode130];
    config.timeline.duration = 1.minutes();
    config.timeline.on_out_of_horizon = OutOfHorizon::Warn;
    let start = config.timeline.start_date;

    let generator = TimelineGenerator::with_sky(config, Sky::default()).unwrap();
    let report = generator.generate_report(start).unwrap();

    let first = report.placements[0].1.interval().unwrap();
    let second = &report.placements[1].1;
    assert!(second.postponements() > 0);
    assert!(second.interval().unwrap().start >= first.end);
    assert!(second.comment().contains("postponed"));
    // Both are kept, past the end of the short timeline
    assert_eq!(report.timeline.entries_of(ModeKind::Mode130).count(), 2);
}

#[rstest]
fn unreachable_moon_offset(config: Configuration) {
    let _ = pretty_env_logger::try_init();
    let eph = Ephemeris::from_tle(&config.tle).unwrap();
    let sky = Sky::default();
    let scanner = MoonScanner::new(
        OrbitAttitudeSimulator::new(&eph, config.timeline.yaw()),
        &sky,
        config.mode124.pointing_altitude_m as f64 / 1000.0,
    );
    let window = ScanWindow {
        start: config.timeline.start_date,
        duration: 2.hours(),
        timestep: 30.seconds(),
        time_skip: Duration::ZERO,
    };
    let fov = FovParams {
        v_offset_deg: 200.0,
        h_offset_deg: 0.0,
        h_tolerance_deg: 180.0,
        v_tolerance_deg: 1.0,
        max_vmag: 0.0,
    };
    assert!(scanner.scan(&window, &fov).unwrap().is_empty());

    // The same request through the Moon calibration Mode
    let mut config = config;
    config.scheduling_priority = vec![ModeKind::CCDBIAS, ModeKind::Mode124];
    config.mode124.v_offsets_deg = vec![200.0];
    config.mode124.timestep = 30.seconds();
    config.mode124.time_to_consider = Some(2.hours());
    let start = config.timeline.start_date;

    let generator = TimelineGenerator::with_sky(config, Sky::default()).unwrap();
    let report = generator.generate_report(start).unwrap();
    match &report.placements[1] {
        (ModeKind::Mode124, Placement::Missed { comment }) => {
            assert!(comment.contains("not visible"), "{comment}")
        }
        other => panic!("expected a miss, got {other:?}"),
    }
    assert!(report.session.occupied.windows_of(ModeKind::Mode124).is_empty());
    assert!(report.timeline.entries_of(ModeKind::Mode124).next().is_none());
    // Only the startup command and the operational filler are in the timeline
    assert!(report
        .timeline
        .entries
        .iter()
        .all(|e| e.mode == ModeKind::CCDBIAS || e.mode == ModeKind::Mode1));
}

#[rstest]
fn calibration_windows_follow_the_sightings(mut config: Configuration) {
    let _ = pretty_env_logger::try_init();
    config.scheduling_priority = vec![ModeKind::Mode124, ModeKind::Mode124];
    config.mode124.v_offsets_deg = vec![0.0];
    config.mode124.h_tolerance_deg = 90.0;
    config.mode124.v_tolerance_deg = 2.0;
    config.mode124.timestep = 10.seconds();
    config.mode124.time_to_consider = Some(4.hours());
    let start = config.timeline.start_date;
    let freeze_start = config.mode124.freeze.freeze_start;

    let generator = TimelineGenerator::with_sky(config, Sky::default()).unwrap();
    let report = generator.generate_report(start).unwrap();

    // A wide field of view sees the Moon once per orbit, so both attempts find a free sighting
    let windows = report.session.occupied.windows_of(ModeKind::Mode124);
    assert_eq!(windows.len(), 2, "{:?}", report.placements);
    for (_, placement) in &report.placements {
        assert!(placement.comment().starts_with("Moon"));
        assert_eq!(placement.postponements(), 0);
    }
    // Sightings are never moved: each window is anchored on a different pass
    assert!(windows[0].end <= windows[1].start);
    assert!(windows[1].start - windows[0].start > 45.minutes() - freeze_start);
}

#[rstest]
fn star_calibrations_on_successive_passes(mut config: Configuration) {
    let _ = pretty_env_logger::try_init();
    let start = config.timeline.start_date;
    config.timeline.yaw_correction = false;
    config.scheduling_priority = vec![ModeKind::CCDBIAS, ModeKind::Mode120, ModeKind::Mode120];
    config.mode120.timestep = 5.seconds();
    config.mode120.time_skip = Duration::ZERO;
    config.mode120.time_to_consider = Some(3.hours());

    // A star on the optical axis half an hour in, which crosses the field of view again one orbit later
    let eph = Ephemeris::from_tle(&config.tle).unwrap();
    let simulator = OrbitAttitudeSimulator::new(&eph, config.timeline.yaw());
    let altitude_km = config.mode120.pointing_altitude_m as f64 / 1000.0;
    let sample = simulator.simulate(start + 30.minutes(), altitude_km).unwrap();
    let sky = Sky::new(StarCatalog {
        stars: vec![Star::new(
            "Synthetic",
            sample.optical_axis_ra_deg,
            sample.optical_axis_dec_deg,
            1.0,
        )],
    });

    // The sightings the Mode chooses from
    let window = ScanWindow {
        start,
        duration: 3.hours(),
        timestep: config.mode120.timestep,
        time_skip: Duration::ZERO,
    };
    let fov = FovParams {
        v_offset_deg: 0.0,
        h_offset_deg: config.mode120.h_offset_deg,
        h_tolerance_deg: config.mode120.h_tolerance_deg,
        v_tolerance_deg: 0.0,
        max_vmag: config.mode120.max_vmag,
    };
    let sightings = StarScanner::new(OrbitAttitudeSimulator::new(&eph, config.timeline.yaw()), &sky, altitude_km)
        .scan(&window, &fov)
        .unwrap()
        .events;
    assert_eq!(sightings.len(), 2, "{sightings:?}");
    assert!((sightings[0].epoch - (start + 30.minutes())).abs() <= 5.seconds());

    let freeze = config.mode120.freeze.clone();
    let freeze_duration = freeze
        .effective_duration(ModeKind::Mode120, config.exposure_of(ModeKind::Mode120))
        .unwrap();
    let separation = config.timeline.mode_separation;

    let generator = TimelineGenerator::with_sky(config, sky).unwrap();
    let report = generator.generate_report(start).unwrap();

    let mut windows = Vec::new();
    for (mode, placement) in &report.placements[1..] {
        assert_eq!(*mode, ModeKind::Mode120);
        assert!(placement.comment().starts_with("Synthetic, V-offset"), "{placement:?}");
        assert!(placement.comment().ends_with("Vmag: 1.00"), "{placement:?}");
        assert_eq!(placement.postponements(), 0);

        // Anchored on one of the sightings: [epoch - freeze start, epoch + freeze duration + separation)
        let interval = placement.interval().unwrap();
        assert!(
            sightings.iter().any(|event| interval
                == Interval::new(
                    event.epoch - freeze.freeze_start,
                    event.epoch + freeze_duration + separation
                )),
            "{interval} does not match any sighting"
        );
        windows.push(interval);
    }
    assert!(windows[0].end <= windows[1].start || windows[1].end <= windows[0].start);
    assert!((windows[1].start - windows[0].start).abs() > 45.minutes());
    assert_eq!(report.timeline.entries_of(ModeKind::Mode120).count(), 2);
}
