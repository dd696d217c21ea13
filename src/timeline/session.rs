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

use super::ModeKind;
use crate::schedule::{Interval, OccupiedTimeline};
use crate::time::Epoch;
use std::collections::BTreeMap;

/// Mutable state of one planning run. A new session is created by every generation, so nothing leaks from one run
/// to the next.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanningSession {
    pub occupied: OccupiedTimeline,
    iterations: BTreeMap<ModeKind, usize>,
    /// Pointing altitude (m) left by the last placed Mode
    pub current_pointing_altitude_m: i64,
    /// Longest exposure (ms) of any placed Mode so far
    pub largest_exposure_ms: u32,
}

impl PlanningSession {
    pub fn new(priority: &[ModeKind], standard_pointing_altitude_m: i64) -> Self {
        Self {
            occupied: OccupiedTimeline::new(priority.iter().copied()),
            iterations: BTreeMap::new(),
            current_pointing_altitude_m: standard_pointing_altitude_m,
            largest_exposure_ms: 0,
        }
    }

    /// Returns how many times this Mode was already attempted, and counts the current attempt.
    pub fn next_iteration(&mut self, mode: ModeKind) -> usize {
        let count = self.iterations.entry(mode).or_insert(0);
        let current = *count;
        *count += 1;
        current
    }

    pub fn iterations_of(&self, mode: ModeKind) -> usize {
        self.iterations.get(&mode).copied().unwrap_or(0)
    }

    /// Records a placed window along with the pointing and exposure it leaves the instrument in.
    pub fn record(&mut self, mode: ModeKind, interval: Interval, pointing_altitude_m: Option<i64>, exposure_ms: u32) {
        self.occupied.insert(mode, interval);
        if let Some(altitude) = pointing_altitude_m {
            self.current_pointing_altitude_m = altitude;
        }
        self.largest_exposure_ms = self.largest_exposure_ms.max(exposure_ms);
    }

    /// End of the latest startup command placed so far
    pub fn startup_commands_end(&self) -> Option<Epoch> {
        self.occupied
            .iter()
            .filter(|(mode, _)| mode.is_startup_command())
            .map(|(_, w)| w.end)
            .max()
    }
}

#[cfg(test)]
mod session_ut {
    use super::*;
    use crate::time::TimeUnits;

    #[test]
    fn counters_and_records() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2023, 1, 1);
        let mut session = PlanningSession::new(&[ModeKind::Mode120, ModeKind::CCDBIAS], 92_500);
        assert!(session.occupied.is_empty());
        assert_eq!(session.next_iteration(ModeKind::Mode120), 0);
        assert_eq!(session.next_iteration(ModeKind::Mode120), 1);
        assert_eq!(session.next_iteration(ModeKind::Mode124), 0);
        assert_eq!(session.iterations_of(ModeKind::Mode120), 2);
        assert_eq!(session.iterations_of(ModeKind::Mode130), 0);

        assert_eq!(session.startup_commands_end(), None);
        session.record(ModeKind::CCDBIAS, Interval::from_duration(t0, 62.seconds()), None, 0);
        session.record(
            ModeKind::Mode120,
            Interval::from_duration(t0 + 1.hours(), 2.minutes()),
            Some(227_000),
            5000,
        );
        assert_eq!(session.startup_commands_end(), Some(t0 + 62.seconds()));
        assert_eq!(session.current_pointing_altitude_m, 227_000);
        assert_eq!(session.largest_exposure_ms, 5000);
        assert_eq!(session.occupied.len(), 2);

        // A fresh session starts from scratch
        let fresh = PlanningSession::new(&[ModeKind::Mode120], 92_500);
        assert_eq!(fresh.iterations_of(ModeKind::Mode120), 0);
        assert_eq!(fresh.largest_exposure_ms, 0);
    }
}
