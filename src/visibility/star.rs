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

use super::{FovParams, ScanWindow, VisibilityEvent};
use crate::cosmic::geodesy::angle_between_deg;
use crate::cosmic::{OrbitAttitudeSimulator, SimulationSample, SkyRegion, SkySource, Star};
use crate::errors::{ScanEphemerisSnafu, ScanError, ScanSkySnafu};
use crate::time::{Duration, Epoch, Unit};
use indicatif::{ProgressBar, ProgressStyle};
use snafu::ResultExt;
use std::collections::{BTreeSet, HashMap};

/// Precession of a sun-synchronous orbital plane, in degrees per day
const PLANE_DRIFT_DEG_PER_DAY: f64 = 0.9856;

/// Outcome of a star scan.
#[derive(Clone, Debug, Default)]
pub struct StarScanReport {
    /// Sightings in chronological order
    pub events: Vec<VisibilityEvent>,
    /// Stars dropped at the first step because they never come close enough to the orbital plane
    pub excluded: BTreeSet<String>,
    /// Number of simulated steps
    pub steps: usize,
}

/// Finds the stars which cross a vertical offset of the field of view while within the horizontal tolerance.
pub struct StarScanner<'a, S: SkySource + ?Sized> {
    pub simulator: OrbitAttitudeSimulator<'a>,
    pub sky: &'a S,
    pub pointing_altitude_km: f64,
}

impl<'a, S: SkySource + ?Sized> StarScanner<'a, S> {
    pub fn new(simulator: OrbitAttitudeSimulator<'a>, sky: &'a S, pointing_altitude_km: f64) -> Self {
        Self {
            simulator,
            sky,
            pointing_altitude_km,
        }
    }

    pub fn scan(&self, window: &ScanWindow, fov: &FovParams) -> Result<StarScanReport, ScanError> {
        let stars = self
            .sky
            .stars_in_region(&SkyRegion::all_sky(), fov.max_vmag)
            .context(ScanSkySnafu)?;

        info!(
            "scanning {} stars brighter than Vmag {} from {} for {} (step {}, skip {})",
            stars.len(),
            fov.max_vmag,
            window.start,
            window.duration,
            window.timestep,
            window.time_skip
        );

        let pb = progress_bar(window.duration);

        let mut report = StarScanReport::default();
        // Indexes of the stars which are scanned, fixed after the first step
        let mut candidates: Option<Vec<usize>> = None;
        // Last sighting of each star, used to suppress duplicates within the same pass
        let mut exceptions: HashMap<usize, Epoch> = HashMap::new();
        let mut prev_v_offsets: Vec<Option<f64>> = vec![None; stars.len()];

        let end = window.end();
        let mut epoch = window.start;
        let mut orbit_start = window.start;

        while epoch <= end {
            let sample = self
                .simulator
                .simulate(epoch, self.pointing_altitude_km)
                .context(ScanEphemerisSnafu)?;
            report.steps += 1;

            let scanned = candidates.get_or_insert_with(|| {
                let (kept, excluded) = self.exclusion_list(&stars, &sample, window.duration, fov);
                report.excluded = excluded;
                kept
            });

            let half_period = sample.orbital_period * 0.5;
            exceptions.retain(|_, sighted| epoch - *sighted < half_period);

            for &idx in scanned.iter() {
                let star = &stars[idx];
                let (v_offset, h_offset) = sample.offsets_deg(&star.unit);

                if let Some(prev) = prev_v_offsets[idx] {
                    // Stars drift downwards through the field of view. Jumps larger than a quadrant are the
                    // wrap-around behind the instrument.
                    let crossed = prev > fov.v_offset_deg
                        && v_offset <= fov.v_offset_deg
                        && prev - v_offset < 90.0;

                    if crossed && fov.h_within(h_offset) && !exceptions.contains_key(&idx) {
                        let event = VisibilityEvent::from_sample(
                            &sample,
                            epoch,
                            &star.name,
                            v_offset,
                            h_offset,
                            Some(star.vmag),
                        );
                        debug!("sighted {event}");
                        exceptions.insert(idx, epoch);
                        report.events.push(event);
                    }
                }
                trace!("{epoch}: {} V {v_offset:.4} H {h_offset:.4}", star.name);
                prev_v_offsets[idx] = Some(v_offset);
            }

            if window.time_skip > Duration::ZERO && epoch - orbit_start >= sample.orbital_period {
                epoch += window.time_skip;
                orbit_start = epoch;
                // Offsets across a skip are not consecutive samples
                prev_v_offsets.iter_mut().for_each(|v| *v = None);
                trace!("skipped to {epoch}");
            }

            epoch += window.timestep;
            pb.set_position((epoch - window.start).to_seconds().clamp(0.0, u64::MAX as f64) as u64);
        }

        pb.finish_and_clear();

        info!(
            "star scan done in {} steps: {} sightings, {} stars excluded",
            report.steps,
            report.events.len(),
            report.excluded.len()
        );

        Ok(report)
    }

    /// Splits the stars into those worth scanning and those too far from the orbital plane to ever reach the
    /// horizontal tolerance during the window.
    fn exclusion_list(
        &self,
        stars: &[Star],
        sample: &SimulationSample,
        duration: Duration,
        fov: &FovParams,
    ) -> (Vec<usize>, BTreeSet<String>) {
        let yaw_margin = if self.simulator.yaw.yaw_correction {
            self.simulator.yaw.yaw_amplitude_deg.abs()
        } else {
            0.0
        };
        let drift = PLANE_DRIFT_DEG_PER_DAY * duration.to_unit(Unit::Day).abs();
        let limit = fov.h_offset_deg.abs() + fov.h_tolerance_deg + yaw_margin + drift;

        let mut kept = Vec::with_capacity(stars.len());
        let mut excluded = BTreeSet::new();
        for (idx, star) in stars.iter().enumerate() {
            let from_plane = (90.0 - angle_between_deg(&star.unit, &sample.orbit_normal)).abs();
            if from_plane > limit {
                excluded.insert(star.name.clone());
            } else {
                kept.push(idx);
            }
        }
        debug!(
            "{} of {} stars are further than {limit:.3} deg from the orbital plane",
            excluded.len(),
            stars.len()
        );
        (kept, excluded)
    }
}

fn progress_bar(duration: Duration) -> ProgressBar {
    let pb = ProgressBar::new(duration.to_seconds().max(0.0) as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:100.cyan/blue} {pos:>7}/{len:7} s {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("star scan");
    pb
}
