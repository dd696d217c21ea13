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

/// Orbit and attitude model of the limb imager.
mod attitude;
pub use self::attitude::{plane_offset_deg, OrbitAttitudeSimulator, SimulationSample, YawSettings};

/// SGP4 ephemeris from two-line element sets.
mod ephemeris;
pub use self::ephemeris::{Ephemeris, Tle};

/// WGS-84 geodesy, Earth rotation and elementary rotations.
pub mod geodesy;
pub use self::geodesy::Geodetic;

/// Star catalog and Moon ephemeris.
mod sky;
pub use self::sky::{moon_position_km, CelestialBody, Sky, SkyRegion, SkySource, Star, StarCatalog};

/// TLE of a ~590 km sun-synchronous orbit used throughout the unit tests.
#[cfg(test)]
pub(crate) fn test_tle() -> Tle {
    Tle::new(
        "1 54227U 22139B   22325.50000000  .00001500  00000-0  95000-4 0  9990",
        "2 54227  97.6800 338.0000 0001800  90.0000 270.0000 14.93500000 12345",
    )
}
