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

use crate::cosmic::SimulationSample;
use crate::time::{Duration, Epoch};
use std::fmt;

mod moon;
mod star;

pub use moon::MoonScanner;
pub use star::{StarScanReport, StarScanner};

/// Field of view inclusion criteria of a scan, all angles in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FovParams {
    /// Vertical offset from the optical axis which a target must cross to be sighted
    pub v_offset_deg: f64,
    /// Ideal horizontal offset of the target from the optical axis
    pub h_offset_deg: f64,
    /// Maximum distance from the ideal horizontal offset
    pub h_tolerance_deg: f64,
    /// Maximum distance from the requested vertical offset for a sample to count as inside the field of view.
    /// Only used by the Moon scanner, stars are sighted on the crossing itself.
    pub v_tolerance_deg: f64,
    /// Faintest star (visual magnitude) considered by the star scanner
    pub max_vmag: f64,
}

impl FovParams {
    fn h_within(&self, h_offset_deg: f64) -> bool {
        (h_offset_deg - self.h_offset_deg).abs() <= self.h_tolerance_deg
    }
}

/// Time span and sampling of a scan.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScanWindow {
    pub start: Epoch,
    /// Amount of time to consider after the start
    pub duration: Duration,
    pub timestep: Duration,
    /// Jump taken after every simulated orbit (star scanner only), zero to scan continuously.
    pub time_skip: Duration,
}

impl ScanWindow {
    pub fn end(&self) -> Epoch {
        self.start + self.duration
    }
}

/// A target sighted in the field of view. Never mutated after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityEvent {
    pub epoch: Epoch,
    /// Name of the star or body
    pub target: String,
    pub v_offset_deg: f64,
    pub h_offset_deg: f64,
    /// Visual magnitude of a star, none for the Moon
    pub vmag: Option<f64>,
    pub pointing_ra_deg: f64,
    pub pointing_dec_deg: f64,
    /// Ground track of the satellite at the sighting
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub lp_latitude_deg: f64,
}

impl VisibilityEvent {
    fn from_sample(
        sample: &SimulationSample,
        epoch: Epoch,
        target: &str,
        v_offset_deg: f64,
        h_offset_deg: f64,
        vmag: Option<f64>,
    ) -> Self {
        Self {
            epoch,
            target: target.to_string(),
            v_offset_deg,
            h_offset_deg,
            vmag,
            pointing_ra_deg: sample.optical_axis_ra_deg,
            pointing_dec_deg: sample.optical_axis_dec_deg,
            latitude_deg: sample.geodetic.latitude_deg,
            longitude_deg: sample.geodetic.longitude_deg,
            lp_latitude_deg: sample.lp_latitude_deg,
        }
    }
}

impl fmt::Display for VisibilityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} (V-offset {:.3} deg, H-offset {:.3} deg",
            self.target, self.epoch, self.v_offset_deg, self.h_offset_deg
        )?;
        if let Some(vmag) = self.vmag {
            write!(f, ", Vmag {vmag:.2}")?;
        }
        write!(
            f,
            ", pointing RA {:.2} deg Dec {:.2} deg, lat {:.2} deg long {:.2} deg)",
            self.pointing_ra_deg, self.pointing_dec_deg, self.latitude_deg, self.longitude_deg
        )
    }
}
