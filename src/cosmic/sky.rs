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

use super::geodesy::{between_0_360, r1, unit_from_ra_dec};
use crate::errors::{CatalogCsvSnafu, CatalogNotFoundSnafu, SkyError};
use crate::linalg::Vector3;
use crate::time::Epoch;
use rust_embed::RustEmbed;
use serde_derive::Deserialize;
use snafu::{OptionExt, ResultExt};
use std::f64::consts::TAU;
use std::fmt;
use std::io::Read;

const ARCSEC_PER_RAD: f64 = 206_264.806_247_096_36;
/// Mean obliquity of the ecliptic at J2000, in degrees
const OBLIQUITY_J2000_DEG: f64 = 23.439_291_11;

#[derive(RustEmbed)]
#[folder = "data/embed/"]
struct EmbeddedAsset;

/// A catalog star. The unit vector is precomputed because the scanners project it at every step.
#[derive(Clone, Debug, PartialEq)]
pub struct Star {
    pub name: String,
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// Visual magnitude
    pub vmag: f64,
    pub unit: Vector3<f64>,
}

impl Star {
    pub fn new<S: Into<String>>(name: S, ra_deg: f64, dec_deg: f64, vmag: f64) -> Self {
        Self {
            name: name.into(),
            ra_deg,
            dec_deg,
            vmag,
            unit: unit_from_ra_dec(ra_deg, dec_deg),
        }
    }
}

impl fmt::Display for Star {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (RA {:.3} deg, Dec {:.3} deg, Vmag {:.2})",
            self.name, self.ra_deg, self.dec_deg, self.vmag
        )
    }
}

#[derive(Deserialize)]
struct StarRecord {
    name: String,
    ra_deg: f64,
    dec_deg: f64,
    vmag: f64,
}

/// A region of the celestial sphere. The right ascension range wraps through zero when `ra_min_deg > ra_max_deg`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SkyRegion {
    pub ra_min_deg: f64,
    pub ra_max_deg: f64,
    pub dec_min_deg: f64,
    pub dec_max_deg: f64,
}

impl SkyRegion {
    pub fn all_sky() -> Self {
        Self {
            ra_min_deg: 0.0,
            ra_max_deg: 360.0,
            dec_min_deg: -90.0,
            dec_max_deg: 90.0,
        }
    }

    pub fn contains(&self, ra_deg: f64, dec_deg: f64) -> bool {
        if dec_deg < self.dec_min_deg || dec_deg > self.dec_max_deg {
            return false;
        }
        if self.ra_max_deg - self.ra_min_deg >= 360.0 {
            return true;
        }
        let ra = between_0_360(ra_deg);
        let (lo, hi) = (
            between_0_360(self.ra_min_deg),
            between_0_360(self.ra_max_deg),
        );
        if lo <= hi {
            ra >= lo && ra <= hi
        } else {
            ra >= lo || ra <= hi
        }
    }
}

/// Solar system bodies the planner can observe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CelestialBody {
    Moon,
}

impl fmt::Display for CelestialBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moon => write!(f, "Moon"),
        }
    }
}

/// Capability used by the scanners to obtain their targets, agnostic of the backing data source.
pub trait SkySource {
    /// Returns the stars inside the region which are at least as bright as `max_vmag`.
    fn stars_in_region(&self, region: &SkyRegion, max_vmag: f64) -> Result<Vec<Star>, SkyError>;

    /// Geocentric position of the body in km, in the same quasi-inertial frame as the orbit propagator.
    fn body_position(&self, body: CelestialBody, epoch: Epoch) -> Vector3<f64>;
}

/// An in-memory star catalog.
#[derive(Clone, Debug, Default)]
pub struct StarCatalog {
    pub stars: Vec<Star>,
}

impl StarCatalog {
    /// Loads a catalog from a CSV source with the `name,ra_deg,dec_deg,vmag` header.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, SkyError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut stars = Vec::new();
        for record in rdr.deserialize() {
            let record: StarRecord = record.context(CatalogCsvSnafu)?;
            if !(-90.0..=90.0).contains(&record.dec_deg) {
                return Err(SkyError::InvalidStar {
                    name: record.name,
                    reason: format!("declination {} out of range", record.dec_deg),
                });
            }
            stars.push(Star::new(
                record.name,
                between_0_360(record.ra_deg),
                record.dec_deg,
                record.vmag,
            ));
        }
        debug!("loaded {} stars", stars.len());
        Ok(Self { stars })
    }

    /// The bright star catalog shipped with the planner (stars brighter than magnitude ~2.8).
    pub fn bright_stars() -> Result<Self, SkyError> {
        let name = "bright_stars.csv";
        let asset = EmbeddedAsset::get(name).context(CatalogNotFoundSnafu { name })?;
        Self::from_csv(asset.data.as_ref())
    }
}

impl StarCatalog {
    /// Stars inside the region which are at least as bright as `max_vmag`.
    pub fn stars_in_region(&self, region: &SkyRegion, max_vmag: f64) -> Vec<Star> {
        self.stars
            .iter()
            .filter(|star| star.vmag <= max_vmag && region.contains(star.ra_deg, star.dec_deg))
            .cloned()
            .collect()
    }
}

/// The default sky: a star catalog and the analytical Moon.
#[derive(Clone, Debug, Default)]
pub struct Sky {
    pub catalog: StarCatalog,
}

impl Sky {
    pub fn new(catalog: StarCatalog) -> Self {
        Self { catalog }
    }

    /// Sky backed by the bundled bright star catalog
    pub fn bright_stars() -> Result<Self, SkyError> {
        Ok(Self::new(StarCatalog::bright_stars()?))
    }
}

impl SkySource for Sky {
    fn stars_in_region(&self, region: &SkyRegion, max_vmag: f64) -> Result<Vec<Star>, SkyError> {
        Ok(self.catalog.stars_in_region(region, max_vmag))
    }

    fn body_position(&self, body: CelestialBody, epoch: Epoch) -> Vector3<f64> {
        match body {
            CelestialBody::Moon => moon_position_km(epoch),
        }
    }
}

/// Geocentric position of the Moon in km (equatorial frame of date) from a truncated lunar theory.
///
/// The accuracy is of the order of a few arcminutes in direction, which is well below the field of view of the
/// instrument. The satellite parallax (about 0.1 deg in LEO) must be removed by the caller.
pub fn moon_position_km(epoch: Epoch) -> Vector3<f64> {
    let j2000 = Epoch::from_gregorian_utc_hms(2000, 1, 1, 12, 0, 0);
    let t = (epoch - j2000).to_seconds() / (86_400.0 * 36_525.0);

    let frac = |x: f64| x - x.floor();

    // Mean elements of the lunar orbit
    let l0 = frac(0.606_433 + 1_336.855_225 * t);
    let l = TAU * frac(0.374_897 + 1_325.552_410 * t);
    let lp = TAU * frac(0.993_133 + 99.997_361 * t);
    let d = TAU * frac(0.827_361 + 1_236.853_086 * t);
    let f = TAU * frac(0.259_086 + 1_342.227_825 * t);

    // Ecliptic longitude perturbations in arcseconds
    let dl = 22_640.0 * l.sin() - 4_586.0 * (l - 2.0 * d).sin() + 2_370.0 * (2.0 * d).sin()
        + 769.0 * (2.0 * l).sin()
        - 668.0 * lp.sin()
        - 412.0 * (2.0 * f).sin()
        - 212.0 * (2.0 * l - 2.0 * d).sin()
        - 206.0 * (l + lp - 2.0 * d).sin()
        + 192.0 * (l + 2.0 * d).sin()
        - 165.0 * (lp - 2.0 * d).sin()
        - 125.0 * d.sin()
        - 110.0 * (l + lp).sin()
        + 148.0 * (l - lp).sin()
        - 55.0 * (2.0 * f - 2.0 * d).sin();

    let longitude = TAU * frac(l0 + dl / 1_296.0e3);

    let s = f + (dl + 412.0 * (2.0 * f).sin() + 541.0 * lp.sin()) / ARCSEC_PER_RAD;
    let h = f - 2.0 * d;
    let n = -526.0 * h.sin() + 44.0 * (l + h).sin() - 31.0 * (-l + h).sin()
        - 23.0 * (lp + h).sin()
        + 11.0 * (-lp + h).sin()
        - 25.0 * (-2.0 * l + f).sin()
        + 21.0 * (-l + f).sin();
    let latitude = (18_520.0 * s.sin() + n) / ARCSEC_PER_RAD;

    let distance_km = 385_000.0
        - 20_905.0 * l.cos()
        - 3_699.0 * (2.0 * d - l).cos()
        - 2_956.0 * (2.0 * d).cos()
        - 570.0 * (2.0 * l).cos()
        + 246.0 * (2.0 * l - 2.0 * d).cos()
        - 205.0 * (lp - 2.0 * d).cos()
        - 171.0 * (l + 2.0 * d).cos()
        - 152.0 * (l + lp - 2.0 * d).cos();

    let ecliptic = Vector3::new(
        distance_km * longitude.cos() * latitude.cos(),
        distance_km * longitude.sin() * latitude.cos(),
        distance_km * latitude.sin(),
    );

    // r1 is a frame rotation, rotating the ecliptic frame by -obliquity yields the equatorial frame
    r1(-OBLIQUITY_J2000_DEG.to_radians()) * ecliptic
}
