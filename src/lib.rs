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

/*! # limb-opt

Operational planning for a satellite limb imager: places calibration Modes and startup commands into a conflict free
Science Mode Timeline, using an orbit and attitude simulation to find when stars and the Moon cross the field of view,
and solves the staggering of the CCD exposures so that no two readouts overlap.
*/

/// Orbit propagation, geodesy, attitude model and sky.
pub mod cosmic;

/// CCD channels, their settings and the exposure synchronization.
pub mod instrument;

/// Scanning of the field of view for stars and the Moon.
pub mod visibility;

/// Conflict free placement of time windows.
pub mod schedule;

/// Priority driven generation of the Science Mode Timeline.
pub mod timeline;

mod errors;
/// Limb-OPT does not panic on bad input: functions which may fail return one of these errors.
pub use self::errors::{EphemerisError, ModeError, ScanError, SkyError, SyncError, TimelineError};

/// Configuration files and date formats.
pub mod io;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::io::Configuration;
pub use self::timeline::{ModeKind, ScienceModeTimeline, TimelineGenerator};
