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

use crate::time::{Duration, Epoch};
use crate::timeline::ModeKind;
use crate::visibility::VisibilityEvent;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A half-open time window `[start, end)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub start: Epoch,
    pub end: Epoch,
}

impl Interval {
    pub fn new(start: Epoch, end: Epoch) -> Self {
        Self { start, end }
    }

    pub fn from_duration(start: Epoch, duration: Duration) -> Self {
        Self::new(start, start + duration)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True if the windows share any instant. Windows which only touch do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Same duration, starting at `start`
    pub fn moved_to(&self, start: Epoch) -> Self {
        Self::from_duration(start, self.duration())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The windows already taken by each Mode during one planning run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OccupiedTimeline {
    windows: BTreeMap<ModeKind, Vec<Interval>>,
}

impl OccupiedTimeline {
    /// Initializes an empty list of windows for every Mode of the priority list.
    pub fn new<I: IntoIterator<Item = ModeKind>>(modes: I) -> Self {
        Self {
            windows: modes.into_iter().map(|mode| (mode, Vec::new())).collect(),
        }
    }

    /// Records a window. Windows of the same Mode are kept sorted by start.
    pub fn insert(&mut self, mode: ModeKind, interval: Interval) {
        let windows = self.windows.entry(mode).or_default();
        let idx = windows.partition_point(|w| w.start <= interval.start);
        windows.insert(idx, interval);
    }

    pub fn windows_of(&self, mode: ModeKind) -> &[Interval] {
        self.windows.get(&mode).map(Vec::as_slice).unwrap_or_default()
    }

    /// All windows of all Modes
    pub fn iter(&self) -> impl Iterator<Item = (ModeKind, &Interval)> + '_ {
        self.windows
            .iter()
            .flat_map(|(mode, windows)| windows.iter().map(move |w| (*mode, w)))
    }

    /// All windows sorted chronologically
    pub fn sorted(&self) -> Vec<(ModeKind, Interval)> {
        let mut all = self.iter().map(|(mode, w)| (mode, *w)).collect::<Vec<_>>();
        all.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        all
    }

    pub fn len(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first recorded window (in Mode then start order) which overlaps the candidate.
    pub fn first_conflict(&self, candidate: &Interval) -> Option<(ModeKind, Interval)> {
        self.iter()
            .find(|(_, w)| w.overlaps(candidate))
            .map(|(mode, w)| (mode, *w))
    }

    pub fn is_free(&self, candidate: &Interval) -> bool {
        self.first_conflict(candidate).is_none()
    }

    /// Gaps between the recorded windows within `horizon` which last at least `min_duration`.
    pub fn gaps(&self, horizon: &Interval, min_duration: Duration) -> Vec<Interval> {
        let mut gaps = Vec::new();
        let mut cursor = horizon.start;
        for (_, w) in self.sorted() {
            if w.end <= cursor {
                continue;
            }
            if w.start > cursor {
                let gap_end = if w.start < horizon.end { w.start } else { horizon.end };
                if gap_end > cursor && gap_end - cursor >= min_duration {
                    gaps.push(Interval::new(cursor, gap_end));
                }
            }
            cursor = w.end;
            if cursor >= horizon.end {
                break;
            }
        }
        if cursor < horizon.end && horizon.end - cursor >= min_duration {
            gaps.push(Interval::new(cursor, horizon.end));
        }
        gaps
    }
}

/// Result of the postponement of a candidate window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Postponed {
    pub interval: Interval,
    /// Number of times the candidate was pushed past a conflicting window
    pub postponements: usize,
}

/// Generic placement: pushes the candidate forward past every conflicting window, keeping its duration, until it
/// fits. The result never starts before the candidate.
pub fn place(occupied: &OccupiedTimeline, candidate: Interval) -> Postponed {
    let mut interval = candidate;
    let mut postponements = 0;
    while let Some((mode, conflict)) = occupied.first_conflict(&interval) {
        trace!("{interval} conflicts with {mode} {conflict}");
        interval = interval.moved_to(conflict.end);
        postponements += 1;
    }
    if postponements > 0 {
        debug!("{candidate} postponed {postponements} times to {interval}");
    }
    Postponed {
        interval,
        postponements,
    }
}

/// Target specific placement: tries the candidates in the provided order and returns the index and window of the
/// first one whose window is free. Celestial geometry dictates the timing, so conflicting windows are never shifted.
pub fn select_first_free<T, F>(
    occupied: &OccupiedTimeline,
    candidates: &[T],
    window_of: F,
) -> Option<(usize, Interval)>
where
    F: Fn(&T) -> Interval,
{
    candidates.iter().enumerate().find_map(|(idx, candidate)| {
        let window = window_of(candidate);
        match occupied.first_conflict(&window) {
            Some((mode, conflict)) => {
                trace!("candidate {idx} at {window} rejected, conflicts with {mode} {conflict}");
                None
            }
            None => Some((idx, window)),
        }
    })
}

/// Star preference: closest to the ideal horizontal offset (to the hundredth of a degree), then brightest.
pub fn rank_star_events(events: &mut [VisibilityEvent], ideal_h_offset_deg: f64) {
    let key = |e: &VisibilityEvent| ((e.h_offset_deg - ideal_h_offset_deg).abs() * 100.0).round() as i64;
    events.sort_by(|a, b| {
        key(a).cmp(&key(b)).then_with(|| {
            a.vmag
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.vmag.unwrap_or(f64::INFINITY))
        })
    });
}

/// Moon preference: closest to the ideal horizontal offset.
pub fn rank_moon_events(events: &mut [VisibilityEvent], ideal_h_offset_deg: f64) {
    events.sort_by(|a, b| {
        let da = (a.h_offset_deg - ideal_h_offset_deg).abs();
        let db = (b.h_offset_deg - ideal_h_offset_deg).abs();
        da.partial_cmp(&db).unwrap_or(Ordering::Equal)
    });
}
