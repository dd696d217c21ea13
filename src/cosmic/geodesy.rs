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

use crate::linalg::{Matrix3, Vector3};
use crate::time::Epoch;
use std::f64::consts::TAU;

/// WGS-84 semi-major axis in km
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
/// WGS-84 flattening
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;
/// Mean Earth radius in km, used for first order geometry
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0;
/// Earth gravitational parameter in km^3/s^2
pub const EARTH_GM_KM3_S2: f64 = 398_600.4418;

/// Semi-minor axis of the WGS-84 ellipsoid in km
pub fn earth_polar_radius_km() -> f64 {
    EARTH_EQUATORIAL_RADIUS_KM * (1.0 - EARTH_FLATTENING)
}

/// Geodetic position on the WGS-84 ellipsoid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Geodetic {
    /// Geodetic latitude in degrees
    pub latitude_deg: f64,
    /// Longitude in degrees, in ]-180, 180]
    pub longitude_deg: f64,
    /// Height above the ellipsoid in km
    pub height_km: f64,
}

/// Rotation about the first axis, angle in radians
pub fn r1(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// Rotation about the third axis, angle in radians
pub fn r3(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Active rotation of `v` by `angle_deg` degrees about `axis` (right hand rule, Rodrigues formula).
pub fn rotate_about(v: &Vector3<f64>, axis: &Vector3<f64>, angle_deg: f64) -> Vector3<f64> {
    let k = axis.normalize();
    let (s, c) = angle_deg.to_radians().sin_cos();
    v * c + k.cross(v) * s + k * k.dot(v) * (1.0 - c)
}

/// Angle between two vectors in degrees, in [0, 180]
pub fn angle_between_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let cos = a.dot(b) / (a.norm() * b.norm());
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Wraps an angle in degrees into [0, 360)
pub fn between_0_360(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Greenwich mean sidereal time in radians, UT1 is approximated by UTC.
pub fn gmst_rad(epoch: Epoch) -> f64 {
    let j2000 = Epoch::from_gregorian_utc_hms(2000, 1, 1, 12, 0, 0);
    let days = (epoch - j2000).to_seconds() / 86_400.0;
    let centuries = days / 36_525.0;
    let gmst_s = 67_310.548_41
        + (876_600.0 * 3_600.0 + 8_640_184.812_866) * centuries
        + 0.093_104 * centuries.powi(2)
        - 6.2e-6 * centuries.powi(3);
    (gmst_s / 240.0).to_radians().rem_euclid(TAU)
}

/// Rotates an inertial (TEME) position into the Earth-fixed frame, ignoring polar motion.
pub fn teme_to_ecef(r_teme: &Vector3<f64>, epoch: Epoch) -> Vector3<f64> {
    r3(gmst_rad(epoch)) * r_teme
}

/// Converts an Earth-fixed position in km into geodetic coordinates.
pub fn ecef_to_geodetic(r_ecef: &Vector3<f64>) -> Geodetic {
    let a = EARTH_EQUATORIAL_RADIUS_KM;
    let e2 = EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);
    let rho = (r_ecef.x.powi(2) + r_ecef.y.powi(2)).sqrt();
    let longitude_deg = r_ecef.y.atan2(r_ecef.x).to_degrees();

    let mut latitude = r_ecef.z.atan2(rho * (1.0 - e2));
    let mut height_km = 0.0;
    for _ in 0..10 {
        let sin_lat = latitude.sin();
        let n = a / (1.0 - e2 * sin_lat.powi(2)).sqrt();
        height_km = if latitude.cos().abs() > 1e-10 {
            rho / latitude.cos() - n
        } else {
            r_ecef.z.abs() - n * (1.0 - e2)
        };
        let next = r_ecef.z.atan2(rho * (1.0 - e2 * n / (n + height_km)));
        let converged = (next - latitude).abs() < 1e-12;
        latitude = next;
        if converged {
            break;
        }
    }

    Geodetic {
        latitude_deg: latitude.to_degrees(),
        longitude_deg,
        height_km,
    }
}

/// Geodetic coordinates of an inertial (TEME) position at the provided epoch.
pub fn teme_to_geodetic(r_teme: &Vector3<f64>, epoch: Epoch) -> Geodetic {
    ecef_to_geodetic(&teme_to_ecef(r_teme, epoch))
}

/// Distance from the Earth's center to the WGS-84 surface at the provided geodetic latitude, in km.
pub fn geocentric_radius_km(latitude_deg: f64) -> f64 {
    let a = EARTH_EQUATORIAL_RADIUS_KM;
    let b = earth_polar_radius_km();
    let (s, c) = latitude_deg.to_radians().sin_cos();
    (((a * a * c).powi(2) + (b * b * s).powi(2)) / ((a * c).powi(2) + (b * s).powi(2))).sqrt()
}

/// Declination and right ascension (both in degrees, RA in [0, 360)) of a Cartesian direction.
pub fn dec_ra_deg(v: &Vector3<f64>) -> (f64, f64) {
    let rho = (v.x.powi(2) + v.y.powi(2)).sqrt();
    let dec = (v.z / rho).atan().to_degrees();
    let ra = if rho > 0.0 {
        let ra = (v.x / rho).clamp(-1.0, 1.0).acos().to_degrees();
        if v.y < 0.0 {
            360.0 - ra
        } else {
            ra
        }
    } else {
        0.0
    };
    (dec, between_0_360(ra))
}

/// Unit vector of the provided right ascension and declination, in degrees.
pub fn unit_from_ra_dec(ra_deg: f64, dec_deg: f64) -> Vector3<f64> {
    let (sin_ra, cos_ra) = ra_deg.to_radians().sin_cos();
    let (sin_dec, cos_dec) = dec_deg.to_radians().sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}
