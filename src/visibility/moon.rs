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
use crate::cosmic::{CelestialBody, OrbitAttitudeSimulator, SkySource};
use crate::errors::{ScanEphemerisSnafu, ScanError};
use crate::time::{Epoch, Unit};
use snafu::ResultExt;

#[derive(Copy, Clone, Debug)]
struct OffsetSample {
    epoch: Epoch,
    v_offset_deg: f64,
    h_offset_deg: f64,
    in_fov: bool,
}

/// Finds the passes of the Moon through the field of view. The Moon moves slowly with respect to the orbit, so it is
/// scanned continuously and each pass yields a single event at the interpolated vertical offset crossing.
pub struct MoonScanner<'a, S: SkySource + ?Sized> {
    pub simulator: OrbitAttitudeSimulator<'a>,
    pub sky: &'a S,
    pub pointing_altitude_km: f64,
}

impl<'a, S: SkySource + ?Sized> MoonScanner<'a, S> {
    pub fn new(simulator: OrbitAttitudeSimulator<'a>, sky: &'a S, pointing_altitude_km: f64) -> Self {
        Self {
            simulator,
            sky,
            pointing_altitude_km,
        }
    }

    /// Vertical and horizontal offsets of the Moon as seen from the satellite, in degrees.
    fn offsets_at(&self, epoch: Epoch) -> Result<(f64, f64), ScanError> {
        let sample = self
            .simulator
            .simulate(epoch, self.pointing_altitude_km)
            .context(ScanEphemerisSnafu)?;
        let moon = self.sky.body_position(CelestialBody::Moon, epoch) - sample.position;
        Ok(sample.offsets_deg(&moon.normalize()))
    }

    /// Returns one event per continuous pass of the Moon through the field of view, in chronological order.
    /// An empty list means that the Moon is not visible at the requested offsets during the window.
    pub fn scan(&self, window: &ScanWindow, fov: &FovParams) -> Result<Vec<VisibilityEvent>, ScanError> {
        info!(
            "scanning the Moon from {} for {} (step {}) at V-offset {} deg",
            window.start, window.duration, window.timestep, fov.v_offset_deg
        );

        let mut series = Vec::new();
        let end = window.end();
        let mut epoch = window.start;
        while epoch <= end {
            let (v_offset_deg, h_offset_deg) = self.offsets_at(epoch)?;
            let in_fov = fov.h_within(h_offset_deg)
                && (v_offset_deg - fov.v_offset_deg).abs() <= fov.v_tolerance_deg;
            trace!("{epoch}: Moon V {v_offset_deg:.4} H {h_offset_deg:.4} in FOV {in_fov}");
            series.push(OffsetSample {
                epoch,
                v_offset_deg,
                h_offset_deg,
                in_fov,
            });
            epoch += window.timestep;
        }

        let mut events = Vec::new();
        for (first, last) in passes(&series) {
            let (epoch, v_offset_deg, h_offset_deg) = crossing(&series, first, last, fov.v_offset_deg);
            let sample = self
                .simulator
                .simulate(epoch, self.pointing_altitude_km)
                .context(ScanEphemerisSnafu)?;
            let event = VisibilityEvent::from_sample(
                &sample,
                epoch,
                &CelestialBody::Moon.to_string(),
                v_offset_deg,
                h_offset_deg,
                None,
            );
            debug!("sighted {event}");
            events.push(event);
        }

        if events.is_empty() {
            warn!(
                "the Moon does not cross V-offset {} deg within {} deg of H-offset {} deg between {} and {}",
                fov.v_offset_deg, fov.h_tolerance_deg, fov.h_offset_deg, window.start, end
            );
        } else {
            info!("Moon scan done: {} passes", events.len());
        }

        Ok(events)
    }
}

/// Index ranges (inclusive) of contiguous in-FOV samples.
fn passes(series: &[OffsetSample]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut current: Option<usize> = None;
    for (idx, sample) in series.iter().enumerate() {
        match (sample.in_fov, current) {
            (true, None) => current = Some(idx),
            (false, Some(first)) => {
                ranges.push((first, idx - 1));
                current = None;
            }
            _ => {}
        }
    }
    if let Some(first) = current {
        ranges.push((first, series.len() - 1));
    }
    ranges
}

/// Epoch and offsets of the vertical offset crossing closest to the target within a pass, linearly interpolated
/// between the bracketing samples. Falls back to the sample nearest to the target when the pass does not cross it.
fn crossing(series: &[OffsetSample], first: usize, last: usize, target: f64) -> (Epoch, f64, f64) {
    // The bracketing sample may be just outside the pass
    let lo = first.saturating_sub(1);
    let hi = (last + 1).min(series.len() - 1);

    let mut best: Option<(f64, Epoch, f64, f64)> = None;
    for k in lo..hi {
        let (a, b) = (&series[k], &series[k + 1]);
        let da = a.v_offset_deg - target;
        let db = b.v_offset_deg - target;
        if da * db > 0.0 || a.v_offset_deg == b.v_offset_deg {
            continue;
        }
        let frac = da / (a.v_offset_deg - b.v_offset_deg);
        let step_s = (b.epoch - a.epoch).to_seconds();
        let epoch = a.epoch + (frac * step_s) * Unit::Second;
        let h = a.h_offset_deg + frac * (b.h_offset_deg - a.h_offset_deg);
        // Prefer the crossing at the center of the pass
        let mid = (first + last) as f64 / 2.0;
        let dist = ((k as f64 + frac) - mid).abs();
        if best.map_or(true, |(d, ..)| dist < d) {
            best = Some((dist, epoch, target, h));
        }
    }

    match best {
        Some((_, epoch, v, h)) => (epoch, v, h),
        None => {
            let nearest = series[first..=last]
                .iter()
                .min_by(|a, b| {
                    (a.v_offset_deg - target)
                        .abs()
                        .total_cmp(&(b.v_offset_deg - target).abs())
                })
                .unwrap_or(&series[first]);
            (nearest.epoch, nearest.v_offset_deg, nearest.h_offset_deg)
        }
    }
}
