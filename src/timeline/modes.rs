/*
    Limb-OPT, operational planning for limb imagers
    Copyright (C) 2023 Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::settings::FreezeSettings;
use super::{ModeKind, PlanningSession};
use crate::cosmic::{Ephemeris, OrbitAttitudeSimulator, SkySource};
use crate::errors::{InvalidSettingsSnafu, ModeError, ModeScanSnafu, ModeSyncSnafu};
use crate::instrument::{max_exposure_ms, snapshot_order, CcdSyncPlan};
use crate::io::Configuration;
use crate::schedule::{place, rank_moon_events, rank_star_events, select_first_free, Interval};
use crate::time::{Duration, Epoch};
use crate::visibility::{FovParams, MoonScanner, ScanWindow, StarScanner, VisibilityEvent};
use snafu::{ensure, ResultExt};
use std::fmt;

/// Outcome of the window computation of one Mode.
#[derive(Clone, Debug, PartialEq)]
pub enum Placement {
    Placed {
        interval: Interval,
        postponements: usize,
        comment: String,
    },
    /// The Mode is absent from this timeline, the comment says why.
    Missed { comment: String },
}

impl Placement {
    pub fn interval(&self) -> Option<Interval> {
        match self {
            Self::Placed { interval, .. } => Some(*interval),
            Self::Missed { .. } => None,
        }
    }

    pub fn postponements(&self) -> usize {
        match self {
            Self::Placed { postponements, .. } => *postponements,
            Self::Missed { .. } => 0,
        }
    }

    pub fn comment(&self) -> &str {
        match self {
            Self::Placed { comment, .. } | Self::Missed { comment } => comment,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }

    /// Appends a note to the comment of a placed Mode.
    pub fn with_note(self, note: &str) -> Self {
        match self {
            Self::Placed {
                interval,
                postponements,
                comment,
            } => Self::Placed {
                interval,
                postponements,
                comment: if comment.is_empty() {
                    note.to_string()
                } else {
                    format!("{comment}, {note}")
                },
            },
            missed => missed,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placed {
                interval,
                postponements,
                ..
            } => write!(f, "placed at {interval} after {postponements} postponements"),
            Self::Missed { comment } => write!(f, "missed: {comment}"),
        }
    }
}

/// Everything a Mode needs to compute its window. The session is read only: the generator records the placement.
pub struct ModeContext<'a> {
    pub mode: ModeKind,
    pub config: &'a Configuration,
    pub ephemeris: &'a Ephemeris,
    pub sky: &'a dyn SkySource,
    pub session: &'a PlanningSession,
    /// Number of previous attempts at this Mode during the current run
    pub iteration: usize,
}

impl<'a> ModeContext<'a> {
    fn separation(&self) -> Duration {
        self.config.timeline.mode_separation
    }

    /// Contract A: the window `[start, start + duration + separation)` pushed past every conflict.
    fn postpone(&self, start: Epoch, duration: Duration) -> Result<Placement, ModeError> {
        let span = self.non_empty_window(duration + self.separation())?;
        let placed = place(&self.session.occupied, Interval::from_duration(start, span));
        let comment = if placed.postponements > 0 {
            format!("Number of times Mode was postponed: {}", placed.postponements)
        } else {
            String::new()
        };
        Ok(Placement::Placed {
            interval: placed.interval,
            postponements: placed.postponements,
            comment,
        })
    }

    /// An empty window never conflicts with anything, so it may not be placed.
    fn non_empty_window(&self, span: Duration) -> Result<Duration, ModeError> {
        ensure!(
            span > Duration::ZERO,
            InvalidSettingsSnafu {
                mode: self.mode,
                reason: format!("window of {span} is empty")
            }
        );
        Ok(span)
    }

    /// The vertical offset of this attempt, cycling through the configured ones.
    fn cycled_v_offset(&self, v_offsets_deg: &[f64]) -> Result<f64, ModeError> {
        ensure!(
            !v_offsets_deg.is_empty(),
            InvalidSettingsSnafu {
                mode: self.mode,
                reason: "no vertical offset configured"
            }
        );
        Ok(v_offsets_deg[self.iteration % v_offsets_deg.len()])
    }

    /// Scan window starting at the requested date (or the timeline start) and lasting the requested time (or up to
    /// the end of the timeline).
    fn scan_window(
        &self,
        start_date: Option<Epoch>,
        time_to_consider: Option<Duration>,
        timestep: Duration,
        time_skip: Duration,
    ) -> ScanWindow {
        let start = start_date.unwrap_or(self.config.timeline.start_date);
        let duration = time_to_consider.unwrap_or_else(|| {
            let end = self.config.timeline.end_date();
            if end > start {
                end - start
            } else {
                Duration::ZERO
            }
        });
        ScanWindow {
            start,
            duration,
            timestep,
            time_skip,
        }
    }

    fn simulator(&self) -> OrbitAttitudeSimulator<'a> {
        OrbitAttitudeSimulator::new(self.ephemeris, self.config.timeline.yaw())
    }

    /// Contract B: the first ranked sighting whose freeze window is free. Sightings are never moved in time.
    fn select_event(
        &self,
        events: &[VisibilityEvent],
        freeze: &FreezeSettings,
        freeze_duration: Duration,
    ) -> Placement {
        if events.is_empty() {
            warn!("{} not scheduled: target not visible", self.mode);
            return Placement::Missed {
                comment: format!("{} not scheduled: target not visible", self.mode),
            };
        }

        let separation = self.separation();
        let choice = select_first_free(&self.session.occupied, events, |event| {
            Interval::new(
                event.epoch - freeze.freeze_start,
                event.epoch + freeze_duration + separation,
            )
        });

        match choice {
            Some((idx, interval)) => {
                let event = &events[idx];
                info!("{} selects {event} (candidate {} of {})", self.mode, idx + 1, events.len());
                let mut comment = format!(
                    "{}, V-offset: {:.2} deg, H-offset: {:.2} deg, pointing RA: {:.2} deg, Dec: {:.2} deg, lat: {:.2} deg, long: {:.2} deg",
                    event.target,
                    event.v_offset_deg,
                    event.h_offset_deg,
                    event.pointing_ra_deg,
                    event.pointing_dec_deg,
                    event.latitude_deg,
                    event.longitude_deg
                );
                if let Some(vmag) = event.vmag {
                    comment.push_str(&format!(", Vmag: {vmag:.2}"));
                }
                Placement::Placed {
                    interval,
                    postponements: 0,
                    comment,
                }
            }
            None => {
                warn!(
                    "{} not scheduled: all {} sightings conflict with the timeline",
                    self.mode,
                    events.len()
                );
                Placement::Missed {
                    comment: format!(
                        "{} could not schedule: all {} sightings conflict with other Modes",
                        self.mode,
                        events.len()
                    ),
                }
            }
        }
    }
}

/// Computes the window of one kind of Mode.
pub trait WindowComputer {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError>;
}

/// Returns the window computation of a Mode, or none if the Mode is not scheduled from the priority list.
pub fn window_computer(mode: ModeKind) -> Option<&'static dyn WindowComputer> {
    match mode {
        mode if mode.is_startup_command() => Some(&StartupCommand),
        ModeKind::Mode100 => Some(&AltitudeStepSweep),
        ModeKind::Mode110 => Some(&PointingSweep),
        ModeKind::Mode120 => Some(&StarCalibration),
        ModeKind::Mode124 => Some(&MoonCalibration),
        ModeKind::Mode130 => Some(&Snapshots),
        ModeKind::Mode131 => Some(&FixedPointing),
        ModeKind::Mode132 => Some(&ExposureSweep),
        _ => None,
    }
}

/// Startup commands run back to back from the start of the timeline, unless a start date is requested.
pub struct StartupCommand;

impl WindowComputer for StartupCommand {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = ctx.config.startup_command(ctx.mode);
        let start = settings
            .start_date
            .or_else(|| ctx.session.startup_commands_end())
            .unwrap_or(ctx.config.timeline.start_date);
        ctx.postpone(start, settings.mode_duration)
    }
}

pub struct AltitudeStepSweep;

impl WindowComputer for AltitudeStepSweep {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = &ctx.config.mode100;
        let duration = settings.mode_duration(ctx.mode)?;
        let start = settings.start_date.unwrap_or(ctx.config.timeline.start_date);
        ctx.postpone(start, duration)
    }
}

pub struct PointingSweep;

impl WindowComputer for PointingSweep {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = &ctx.config.mode110;
        let duration = settings.mode_duration(ctx.mode)?;
        let start = settings.start_date.unwrap_or(ctx.config.timeline.start_date);
        ctx.postpone(start, duration)
    }
}

pub struct StarCalibration;

impl WindowComputer for StarCalibration {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = &ctx.config.mode120;
        let v_offset_deg = ctx.cycled_v_offset(&settings.v_offsets_deg)?;
        let max_exposure = max_exposure_ms(&ctx.config.ccd_of(ctx.mode));
        let freeze_duration = settings.freeze.effective_duration(ctx.mode, max_exposure)?;
        ctx.non_empty_window(settings.freeze.freeze_start + freeze_duration + ctx.separation())?;

        let window = ctx.scan_window(
            settings.start_date,
            settings.time_to_consider,
            settings.timestep,
            settings.time_skip,
        );
        let fov = FovParams {
            v_offset_deg,
            h_offset_deg: settings.h_offset_deg,
            h_tolerance_deg: settings.h_tolerance_deg,
            v_tolerance_deg: 0.0,
            max_vmag: settings.max_vmag,
        };
        let scanner = StarScanner::new(
            ctx.simulator(),
            ctx.sky,
            settings.pointing_altitude_m as f64 / 1000.0,
        );
        let mut events = scanner
            .scan(&window, &fov)
            .context(ModeScanSnafu { mode: ctx.mode })?
            .events;
        rank_star_events(&mut events, settings.h_offset_deg);

        Ok(ctx.select_event(&events, &settings.freeze, freeze_duration))
    }
}

pub struct MoonCalibration;

impl WindowComputer for MoonCalibration {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = &ctx.config.mode124;
        let v_offset_deg = ctx.cycled_v_offset(&settings.v_offsets_deg)?;
        let max_exposure = max_exposure_ms(&ctx.config.ccd_of(ctx.mode));
        let freeze_duration = settings.freeze.effective_duration(ctx.mode, max_exposure)?;
        ctx.non_empty_window(settings.freeze.freeze_start + freeze_duration + ctx.separation())?;

        let window = ctx.scan_window(
            settings.start_date,
            settings.time_to_consider,
            settings.timestep,
            Duration::ZERO,
        );
        let fov = FovParams {
            v_offset_deg,
            h_offset_deg: settings.h_offset_deg,
            h_tolerance_deg: settings.h_tolerance_deg,
            v_tolerance_deg: settings.v_tolerance_deg,
            max_vmag: 0.0,
        };
        let scanner = MoonScanner::new(
            ctx.simulator(),
            ctx.sky,
            settings.pointing_altitude_m as f64 / 1000.0,
        );
        let mut events = scanner
            .scan(&window, &fov)
            .context(ModeScanSnafu { mode: ctx.mode })?;
        rank_moon_events(&mut events, settings.h_offset_deg);

        Ok(ctx.select_event(&events, &settings.freeze, freeze_duration))
    }
}

pub struct Snapshots;

impl WindowComputer for Snapshots {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = &ctx.config.mode130;
        ensure!(
            settings.n_snapshots > 0,
            InvalidSettingsSnafu {
                mode: ctx.mode,
                reason: "at least one snapshot is needed"
            }
        );
        let start = settings.start_date.unwrap_or(ctx.config.timeline.start_date);
        let placement = ctx.postpone(start, settings.mode_duration())?;

        let order = snapshot_order(&ctx.config.ccd_of(ctx.mode))
            .iter()
            .map(|ch| ch.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let slew = format!(
            "snapshots of {order} at {} m, slewing from {} m",
            settings.pointing_altitude_m, ctx.session.current_pointing_altitude_m
        );
        Ok(placement.with_note(&slew))
    }
}

/// Fixed pointing with custom CCD settings, only scheduled when at least one synchronized channel is enabled.
pub struct FixedPointing;

impl WindowComputer for FixedPointing {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = &ctx.config.mode131;
        let plan = CcdSyncPlan::compute(
            &ctx.config.ccd_of(ctx.mode),
            ctx.config.timeline.ccd_sync_extra_offset_ms,
            ctx.config.timeline.ccd_sync_extra_interval_ms,
        )
        .context(ModeSyncSnafu { mode: ctx.mode })?;

        if plan.is_empty() {
            warn!("{} not scheduled: no CCD channel to synchronize", ctx.mode);
            return Ok(Placement::Missed {
                comment: format!("{} not scheduled: no CCD channel to synchronize", ctx.mode),
            });
        }

        let start = settings.start_date.unwrap_or(ctx.config.timeline.start_date);
        let placement = ctx.postpone(start, settings.mode_duration)?;
        Ok(placement.with_note(&plan.to_string()))
    }
}

pub struct ExposureSweep;

impl WindowComputer for ExposureSweep {
    fn compute(&self, ctx: &ModeContext<'_>) -> Result<Placement, ModeError> {
        let settings = &ctx.config.mode132;
        ensure!(
            !settings.texpms.is_empty(),
            InvalidSettingsSnafu {
                mode: ctx.mode,
                reason: "the exposure time sweep is empty"
            }
        );
        let start = settings.start_date.unwrap_or(ctx.config.timeline.start_date);
        ctx.postpone(start, settings.mode_duration())
    }
}

#[cfg(test)]
mod modes_ut {
    use super::*;
    use crate::cosmic::{test_tle, Sky};
    use crate::instrument::{CcdSettingsPatch, Channel};
    use crate::time::TimeUnits;
    use crate::timeline::settings::StartupCommandSettings;

    fn config() -> Configuration {
        Configuration::builder()
            .tle(test_tle())
            .timeline(
                crate::timeline::TimelineSettings::builder()
                    .start_date(Epoch::from_gregorian_utc_hms(2022, 11, 21, 12, 0, 0))
                    .duration(8.hours())
                    .build(),
            )
            .build()
    }

    fn event(epoch: Epoch, h: f64) -> VisibilityEvent {
        VisibilityEvent {
            epoch,
            target: "Moon".to_string(),
            v_offset_deg: 0.0,
            h_offset_deg: h,
            vmag: None,
            pointing_ra_deg: 10.0,
            pointing_dec_deg: -5.0,
            latitude_deg: 40.0,
            longitude_deg: 12.0,
            lp_latitude_deg: 38.0,
        }
    }

    #[test]
    fn startup_commands_chain() {
        let config = config();
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let mut session = PlanningSession::new(&config.scheduling_priority, 92_500);
        let t0 = config.timeline.start_date;

        let ctx = ModeContext {
            mode: ModeKind::CCDBIAS,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };
        let bias = StartupCommand.compute(&ctx).unwrap();
        assert_eq!(bias.interval(), Some(Interval::new(t0, t0 + 62.seconds())));
        assert_eq!(bias.postponements(), 0);
        assert!(bias.comment().is_empty());

        session.record(ModeKind::CCDBIAS, bias.interval().unwrap(), None, 0);
        let ctx = ModeContext {
            mode: ModeKind::PM,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };
        let pm = StartupCommand.compute(&ctx).unwrap();
        assert_eq!(pm.interval().unwrap().start, t0 + 62.seconds());
        assert_eq!(pm.interval().unwrap().duration(), 32.seconds());

        // A requested start date wins over the chaining
        let mut config = config.clone();
        config.startup_commands.insert(
            ModeKind::HTR,
            StartupCommandSettings::builder()
                .start_date(t0 + 1.hours())
                .build(),
        );
        let ctx = ModeContext {
            mode: ModeKind::HTR,
            config: &config,
            ..ctx
        };
        assert_eq!(StartupCommand.compute(&ctx).unwrap().interval().unwrap().start, t0 + 1.hours());
    }

    #[test]
    fn fixed_duration_modes_postpone() {
        let config = config();
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let t0 = config.timeline.start_date;
        let mut session = PlanningSession::new(&[ModeKind::Mode130], 92_500);
        session.record(ModeKind::Mode130, Interval::from_duration(t0, 77.seconds()), None, 0);

        let ctx = ModeContext {
            mode: ModeKind::Mode132,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };
        let placement = window_computer(ModeKind::Mode132).unwrap().compute(&ctx).unwrap();
        assert_eq!(placement.postponements(), 1);
        assert_eq!(
            placement.interval(),
            Some(Interval::from_duration(t0 + 77.seconds(), 13.minutes() + 2.seconds()))
        );
        assert_eq!(placement.comment(), "Number of times Mode was postponed: 1");

        assert!(window_computer(ModeKind::Mode1).is_none());
        assert!(window_computer(ModeKind::Idle).is_none());
    }

    #[test]
    fn invalid_settings_abort_the_mode() {
        let mut config = config();
        config.mode110.sweep_rate_m_s = -100.0;
        config.mode132.texpms.clear();
        config.mode120.v_offsets_deg.clear();
        config.mode124.freeze.freeze_duration = 1.seconds();
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let session = PlanningSession::default();
        let ctx = |mode| ModeContext {
            mode,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };

        assert!(matches!(
            PointingSweep.compute(&ctx(ModeKind::Mode110)),
            Err(ModeError::SweepSignMismatch { .. })
        ));
        assert!(matches!(
            ExposureSweep.compute(&ctx(ModeKind::Mode132)),
            Err(ModeError::InvalidSettings { .. })
        ));
        assert!(matches!(
            StarCalibration.compute(&ctx(ModeKind::Mode120)),
            Err(ModeError::InvalidSettings { .. })
        ));
        assert!(matches!(
            MoonCalibration.compute(&ctx(ModeKind::Mode124)),
            Err(ModeError::FreezeTooShort { .. })
        ));
    }

    #[test]
    fn empty_windows_are_rejected() {
        let mut config = config();
        let t0 = config.timeline.start_date;
        config.timeline.mode_separation = Duration::ZERO;
        config.startup_commands.insert(
            ModeKind::CCDBIAS,
            StartupCommandSettings::builder()
                .mode_duration(Duration::ZERO)
                .start_date(t0 + 10.seconds())
                .build(),
        );
        config.mode131.mode_duration = Duration::ZERO;
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let mut session = PlanningSession::default();
        // An empty window would fit inside this one without conflicting
        session.record(ModeKind::Mode130, Interval::from_duration(t0, 1.minutes()), None, 0);
        let ctx = |mode| ModeContext {
            mode,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };

        match StartupCommand.compute(&ctx(ModeKind::CCDBIAS)) {
            Err(ModeError::InvalidSettings { mode, reason }) => {
                assert_eq!(mode, ModeKind::CCDBIAS);
                assert!(reason.contains("empty"), "{reason}");
            }
            other => panic!("expected an empty window error, got {other:?}"),
        }
        assert!(matches!(
            FixedPointing.compute(&ctx(ModeKind::Mode131)),
            Err(ModeError::InvalidSettings { .. })
        ));
        // A positive duration without separation is fine
        assert!(PointingSweep.compute(&ctx(ModeKind::Mode110)).unwrap().is_placed());
    }

    #[test]
    fn snapshots_report_order_and_slew() {
        let mut config = config();
        config.mode130.ccd.insert(
            Channel::IR1,
            CcdSettingsPatch {
                texpms: Some(7000),
                ..Default::default()
            },
        );
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let mut session = PlanningSession::new(&[ModeKind::Mode110, ModeKind::Mode130], 92_500);
        let t0 = config.timeline.start_date;
        session.record(ModeKind::Mode110, Interval::from_duration(t0, 5.minutes()), Some(130_000), 5000);

        let ctx = ModeContext {
            mode: ModeKind::Mode130,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };
        let placement = Snapshots.compute(&ctx).unwrap();
        assert_eq!(placement.postponements(), 1);
        assert_eq!(
            placement.comment(),
            "Number of times Mode was postponed: 1, snapshots of NADIR UV1 UV2 IR4 IR3 IR2 IR1 at 92500 m, \
             slewing from 130000 m"
        );
    }

    #[test]
    fn fixed_pointing_needs_enabled_channels() {
        let mut config = config();
        for settings in config.ccd.values_mut() {
            settings.texpms = 0;
        }
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let session = PlanningSession::default();
        let ctx = ModeContext {
            mode: ModeKind::Mode131,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };
        let placement = FixedPointing.compute(&ctx).unwrap();
        assert!(!placement.is_placed());
        assert!(placement.comment().contains("not scheduled"));

        let config = self::config();
        let ctx = ModeContext {
            config: &config,
            ..ctx
        };
        let placement = FixedPointing.compute(&ctx).unwrap();
        assert_eq!(placement.interval().unwrap().duration(), 10.minutes() + 2.seconds());
        assert!(placement.comment().starts_with("CCD sync plan"));
    }

    #[test]
    fn sightings_are_selected_not_moved() {
        let config = config();
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let t0 = config.timeline.start_date;
        let mut session = PlanningSession::default();
        session.record(
            ModeKind::Mode130,
            Interval::new(t0 + 50.minutes(), t0 + 70.minutes()),
            None,
            0,
        );
        let ctx = ModeContext {
            mode: ModeKind::Mode124,
            config: &config,
            ephemeris: &eph,
            sky: &sky,
            session: &session,
            iteration: 0,
        };
        let freeze = FreezeSettings::default();

        // The preferred sighting falls in the occupied window, the next one is free
        let events = vec![event(t0 + 1.hours(), 0.0), event(t0 + 3.hours(), 0.4)];
        let placement = ctx.select_event(&events, &freeze, 19.seconds());
        assert_eq!(
            placement.interval(),
            Some(Interval::new(
                t0 + 3.hours() - 2.minutes(),
                t0 + 3.hours() + 21.seconds()
            ))
        );
        assert!(placement.comment().starts_with("Moon, V-offset: 0.00 deg, H-offset: 0.40 deg"));

        let placement = ctx.select_event(&events[..1], &freeze, 19.seconds());
        assert!(placement.comment().contains("could not schedule"));
        assert!(placement.interval().is_none());

        let placement = ctx.select_event(&[], &freeze, 19.seconds());
        assert!(placement.comment().contains("not visible"));
        assert_eq!(session.occupied.len(), 1);
    }

    #[test]
    fn vertical_offsets_cycle() {
        let config = config();
        let eph = Ephemeris::from_tle(&config.tle).unwrap();
        let sky = Sky::default();
        let session = PlanningSession::default();
        let offsets = [0.0, -0.5, 0.5];
        for (iteration, expected) in [(0, 0.0), (1, -0.5), (2, 0.5), (3, 0.0)] {
            let ctx = ModeContext {
                mode: ModeKind::Mode120,
                config: &config,
                ephemeris: &eph,
                sky: &sky,
                session: &session,
                iteration,
            };
            assert_eq!(ctx.cycled_v_offset(&offsets).unwrap(), expected);
        }
    }
}
