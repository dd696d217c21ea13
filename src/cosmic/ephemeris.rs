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

use crate::errors::{EphemerisError, TleEpochSnafu};
use crate::linalg::Vector3;
use crate::time::{Epoch, Unit};
use serde_derive::{Deserialize, Serialize};
use sgp4::{Constants, Elements, MinutesSinceEpoch};
use snafu::ensure;
use std::fmt;

/// A two-line element set, as provided in the planning configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tle {
    pub line1: String,
    pub line2: String,
}

impl Tle {
    pub fn new<S: Into<String>>(line1: S, line2: S) -> Self {
        Self {
            line1: line1.into(),
            line2: line2.into(),
        }
    }
}

/// A propagatable ephemeris built from a TLE. Immutable once loaded.
pub struct Ephemeris {
    tle: Tle,
    epoch: Epoch,
    constants: Constants,
}

impl Ephemeris {
    /// Parses and initializes the SGP4 propagator from the two lines of a TLE.
    pub fn from_tle(tle: &Tle) -> Result<Self, EphemerisError> {
        let elements = Elements::from_tle(
            None,
            tle.line1.trim().as_bytes(),
            tle.line2.trim().as_bytes(),
        )
        .map_err(|e| EphemerisError::TleParsing { msg: e.to_string() })?;

        let constants = Constants::from_elements(&elements)
            .map_err(|e| EphemerisError::Sgp4Init { msg: e.to_string() })?;

        let epoch = tle_epoch(tle.line1.trim())?;

        debug!("loaded TLE with epoch {epoch}");

        Ok(Self {
            tle: tle.clone(),
            epoch,
            constants,
        })
    }

    /// Epoch of the element set
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn tle(&self) -> &Tle {
        &self.tle
    }

    /// Returns the TEME position (km) and velocity (km/s) at the requested epoch.
    pub fn propagate(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), EphemerisError> {
        let minutes = (epoch - self.epoch).to_unit(Unit::Minute);
        let prediction = self
            .constants
            .propagate(MinutesSinceEpoch(minutes))
            .map_err(|e| EphemerisError::Propagation {
                epoch,
                msg: e.to_string(),
            })?;

        Ok((
            Vector3::from(prediction.position),
            Vector3::from(prediction.velocity),
        ))
    }
}

impl fmt::Debug for Ephemeris {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ephemeris")
            .field("epoch", &format!("{}", self.epoch))
            .field("tle", &self.tle)
            .finish()
    }
}

/// Decodes the epoch field (columns 19 to 32, `YYDDD.DDDDDDDD`) of the first line of a TLE.
pub(crate) fn tle_epoch(line1: &str) -> Result<Epoch, EphemerisError> {
    let field = line1.get(18..32).unwrap_or_default();
    ensure!(
        field.len() == 14,
        TleEpochSnafu {
            field: field.to_string()
        }
    );

    let yy = field[..2]
        .trim()
        .parse::<i32>()
        .map_err(|_| EphemerisError::TleEpoch {
            field: field.to_string(),
        })?;
    let day_of_year = field[2..]
        .trim()
        .parse::<f64>()
        .map_err(|_| EphemerisError::TleEpoch {
            field: field.to_string(),
        })?;
    ensure!(
        (1.0..367.0).contains(&day_of_year),
        TleEpochSnafu {
            field: field.to_string()
        }
    );

    let year = if yy < 57 { 2000 + yy } else { 1900 + yy };

    Ok(Epoch::from_gregorian_utc_at_midnight(year, 1, 1) + (day_of_year - 1.0) * Unit::Day)
}
