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

use super::entry::{ScienceModeTimeline, TimelineEntry, TimelineHeader};
use super::modes::{window_computer, ModeContext, Placement};
use super::{ModeKind, OutOfHorizon, PlanningSession};
use crate::cosmic::{Ephemeris, Sky, SkySource, StarCatalog};
use crate::errors::{
    TimelineConfigSnafu, TimelineEphemerisSnafu, TimelineError, TimelineIoSnafu,
    TimelineJsonSnafu, TimelineSkySnafu,
};
use crate::io::Configuration;
use crate::schedule::Interval;
use crate::time::Epoch;
use snafu::ResultExt;
use std::fs::File;

/// Everything a generation produced: the artifact, the outcome of every entry of the priority list and the final
/// planning state.
#[derive(Clone, Debug)]
pub struct GenerationReport {
    pub timeline: ScienceModeTimeline,
    /// Outcome of each entry of the priority list, in priority order
    pub placements: Vec<(ModeKind, Placement)>,
    pub session: PlanningSession,
}

/// Places every Mode of the priority list, fills the gaps with the operational Mode and writes the Science Mode
/// Timeline.
pub struct TimelineGenerator<S: SkySource = Sky> {
    pub config: Configuration,
    pub sky: S,
}

impl TimelineGenerator<Sky> {
    /// Validates the configuration and loads the star catalog it names, or the bundled one.
    pub fn new(config: Configuration) -> Result<Self, TimelineError> {
        let sky = match &config.star_catalog {
            Some(path) => {
                let file = File::open(path).context(TimelineIoSnafu { path })?;
                Sky::new(StarCatalog::from_csv(file).context(TimelineSkySnafu)?)
            }
            None => Sky::bright_stars().context(TimelineSkySnafu)?,
        };
        Self::with_sky(config, sky)
    }
}

impl<S: SkySource> TimelineGenerator<S> {
    pub fn with_sky(config: Configuration, sky: S) -> Result<Self, TimelineError> {
        config.validate().context(TimelineConfigSnafu)?;
        Ok(Self { config, sky })
    }

    /// Generates the timeline, dated now.
    pub fn generate(&self) -> Result<ScienceModeTimeline, TimelineError> {
        let now = Epoch::now().map_err(|e| TimelineError::Clock { msg: e.to_string() })?;
        self.generate_at(now)
    }

    /// Generates the timeline with the provided generation date.
    pub fn generate_at(&self, generated: Epoch) -> Result<ScienceModeTimeline, TimelineError> {
        Ok(self.generate_report(generated)?.timeline)
    }

    pub fn generate_report(&self, generated: Epoch) -> Result<GenerationReport, TimelineError> {
        let config = &self.config;
        let settings = &config.timeline;
        let ephemeris = Ephemeris::from_tle(&config.tle).context(TimelineEphemerisSnafu)?;
        let horizon = settings.horizon();
        info!(
            "generating the science mode timeline over {horizon} for {} Modes",
            config.scheduling_priority.len()
        );

        // Fresh state for every run
        let mut session = PlanningSession::new(
            &config.scheduling_priority,
            settings.standard_pointing_altitude_m,
        );
        let mut placed: Vec<(ModeKind, Interval, String)> = Vec::new();

        let idle = settings.idle_window();
        if let Some(window) = idle {
            info!("reserving {window} to go idle");
            session.record(ModeKind::Idle, window, None, 0);
            placed.push((ModeKind::Idle, window, "go idle".to_string()));
        }

        let mut placements = Vec::with_capacity(config.scheduling_priority.len());
        for &mode in &config.scheduling_priority {
            let iteration = session.next_iteration(mode);
            let placement = match window_computer(mode) {
                Some(computer) => {
                    let ctx = ModeContext {
                        mode,
                        config,
                        ephemeris: &ephemeris,
                        sky: &self.sky,
                        session: &session,
                        iteration,
                    };
                    match computer.compute(&ctx) {
                        Ok(placement) => placement,
                        Err(e) => {
                            error!("{e}");
                            Placement::Missed {
                                comment: format!("{mode} not scheduled: {e}"),
                            }
                        }
                    }
                }
                None => Placement::Missed {
                    comment: format!("{mode} cannot be scheduled from the priority list"),
                },
            };
            let placement = self.check_horizon(mode, placement, &horizon);

            match &placement {
                Placement::Placed {
                    interval, comment, ..
                } => {
                    info!("{mode} {placement}");
                    session.record(
                        mode,
                        *interval,
                        config.pointing_altitude_of(mode),
                        config.exposure_of(mode),
                    );
                    placed.push((mode, *interval, comment.clone()));
                }
                Placement::Missed { comment } => warn!("{comment}"),
            }
            placements.push((mode, placement));
        }

        // Operational Mode everywhere else, up to the idle handover
        let operational = settings.operational_mode;
        let fill_horizon = Interval::new(horizon.start, idle.map_or(horizon.end, |w| w.start));
        let gaps = session
            .occupied
            .gaps(&fill_horizon, settings.min_operational_duration);
        info!("filling {} gaps with {operational}", gaps.len());
        for gap in gaps {
            session.record(
                operational,
                gap,
                config.pointing_altitude_of(operational),
                config.exposure_of(operational),
            );
            placed.push((operational, gap, String::new()));
        }

        placed.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        let entries = placed
            .into_iter()
            .map(|(mode, interval, comment)| {
                let mode_settings = config.settings_of(mode).context(TimelineJsonSnafu)?;
                Ok(TimelineEntry::new(mode, interval, mode_settings, comment))
            })
            .collect::<Result<Vec<_>, TimelineError>>()?;

        let header = TimelineHeader {
            description: "Science Mode Timeline".to_string(),
            note: format!(
                "{} Modes placed out of {} requested, longest exposure {} ms",
                placements.iter().filter(|(_, p)| p.is_placed()).count(),
                placements.len(),
                session.largest_exposure_ms
            ),
            generated,
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: serde_json::to_value(settings).context(TimelineJsonSnafu)?,
            tle: [config.tle.line1.clone(), config.tle.line2.clone()],
        };
        info!("science mode timeline has {} entries", entries.len());

        Ok(GenerationReport {
            timeline: ScienceModeTimeline { header, entries },
            placements,
            session,
        })
    }

    /// Applies the horizon policy to a placement which does not fit within the timeline.
    fn check_horizon(&self, mode: ModeKind, placement: Placement, horizon: &Interval) -> Placement {
        let interval = match placement.interval() {
            Some(interval) if interval.start < horizon.start || interval.end > horizon.end => interval,
            _ => return placement,
        };

        match self.config.timeline.on_out_of_horizon {
            OutOfHorizon::Warn => {
                error!("{mode} at {interval} is outside of the timeline {horizon}");
                placement.with_note("outside of the timeline")
            }
            OutOfHorizon::Reject => Placement::Missed {
                comment: format!("{mode} not scheduled: {interval} is outside of the timeline {horizon}"),
            },
        }
    }
}
