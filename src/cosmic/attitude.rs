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

use super::ephemeris::Ephemeris;
use super::geodesy::{
    angle_between_deg, dec_ra_deg, geocentric_radius_km, rotate_about, teme_to_geodetic,
    Geodetic, EARTH_GM_KM3_S2, EARTH_MEAN_RADIUS_KM,
};
use crate::errors::EphemerisError;
use crate::linalg::Vector3;
use crate::time::{Duration, Epoch, Unit};
use serde_derive::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

/// Yaw compensation applied by the attitude control to counter the Earth's rotation under the line of sight.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YawSettings {
    pub yaw_correction: bool,
    /// Amplitude of the yaw oscillation, in degrees
    pub yaw_amplitude_deg: f64,
    /// Phase of the yaw oscillation relative to the argument of latitude of the look point, in degrees
    pub yaw_phase_deg: f64,
}

impl Default for YawSettings {
    fn default() -> Self {
        Self {
            yaw_correction: true,
            yaw_amplitude_deg: -3.8,
            yaw_phase_deg: -20.0,
        }
    }
}

/// Result of one evaluation of the orbit and attitude model. Vectors are in the TEME frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationSample {
    pub epoch: Epoch,
    /// Position in km
    pub position: Vector3<f64>,
    /// Velocity in km/s
    pub velocity: Vector3<f64>,
    /// Unit normal of the orbital plane (r x v)
    pub orbit_normal: Vector3<f64>,
    /// Osculating two-body period of the orbit
    pub orbital_period: Duration,
    /// Geodetic position of the satellite
    pub geodetic: Geodetic,
    /// Argument of latitude of the satellite, in degrees
    pub arg_of_latitude_deg: f64,
    /// Angle between the zenith and the optical axis, in degrees
    pub pitch_deg: f64,
    /// Yaw rotation applied to the optical axis, in degrees
    pub yaw_deg: f64,
    /// Unit vector of the optical axis
    pub optical_axis: Vector3<f64>,
    pub optical_axis_dec_deg: f64,
    pub optical_axis_ra_deg: f64,
    /// Normal of the plane in which horizontal offsets are measured
    pub h_offset_normal: Vector3<f64>,
    /// Normal of the plane in which vertical offsets are measured
    pub v_offset_normal: Vector3<f64>,
    /// Estimated geodetic latitude of the look point, in degrees
    pub lp_latitude_deg: f64,
}

impl SimulationSample {
    /// Vertical and horizontal offsets (degrees) of a direction relative to the optical axis.
    /// A positive vertical offset is above the optical axis, i.e. further away from the Earth.
    pub fn offsets_deg(&self, direction: &Vector3<f64>) -> (f64, f64) {
        (
            plane_offset_deg(&self.optical_axis, direction, &self.v_offset_normal),
            plane_offset_deg(&self.optical_axis, direction, &self.h_offset_normal),
        )
    }
}

impl fmt::Display for SimulationSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: lat {:.3} deg, long {:.3} deg, alt {:.3} km, pointing RA {:.3} deg Dec {:.3} deg, LP lat {:.3} deg, yaw {:.3} deg",
            self.epoch,
            self.geodetic.latitude_deg,
            self.geodetic.longitude_deg,
            self.geodetic.height_km,
            self.optical_axis_ra_deg,
            self.optical_axis_dec_deg,
            self.lp_latitude_deg,
            self.yaw_deg
        )
    }
}

/// Projects `target` onto the plane normal to `plane_normal` and returns its signed angle from `axis`, in degrees.
pub fn plane_offset_deg(
    axis: &Vector3<f64>,
    target: &Vector3<f64>,
    plane_normal: &Vector3<f64>,
) -> f64 {
    let projected = target - plane_normal * target.dot(plane_normal);
    if projected.norm() < f64::EPSILON {
        return 90.0;
    }
    let angle = angle_between_deg(axis, &projected);
    if axis.cross(&projected).dot(plane_normal) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Target pointing kinematics of a limb imager: the optical axis lies in the orbital plane, looking backwards at a
/// tangential altitude above the ellipsoid, and is optionally yawed to compensate for the Earth's rotation.
#[derive(Debug)]
pub struct OrbitAttitudeSimulator<'a> {
    pub ephemeris: &'a Ephemeris,
    pub yaw: YawSettings,
    /// Logs every intermediate quantity at debug level, keep it off for long simulations.
    pub log_flag: bool,
}

impl<'a> OrbitAttitudeSimulator<'a> {
    pub fn new(ephemeris: &'a Ephemeris, yaw: YawSettings) -> Self {
        Self {
            ephemeris,
            yaw,
            log_flag: false,
        }
    }

    /// Computes the orbit and attitude at `epoch` when pointing at the provided tangential altitude (km).
    pub fn simulate(
        &self,
        epoch: Epoch,
        pointing_altitude_km: f64,
    ) -> Result<SimulationSample, EphemerisError> {
        let (position, velocity) = self.ephemeris.propagate(epoch)?;
        let r_norm = position.norm();
        let r_hat = position / r_norm;
        let orbit_normal = position.cross(&velocity).normalize();
        let orbital_period_s = TAU * (r_norm.powi(3) / EARTH_GM_KM3_S2).sqrt();
        let orbital_period = orbital_period_s * Unit::Second;

        let ascending_node = Vector3::z().cross(&orbit_normal).normalize();
        let mut arg_of_latitude_deg = angle_between_deg(&ascending_node, &position);
        if ascending_node.cross(&position).dot(&orbit_normal) < 0.0 {
            arg_of_latitude_deg = 360.0 - arg_of_latitude_deg;
        }

        // The look point trails the satellite: it lies under the orbit where the satellite was a fraction of a
        // period ago. A spherical Earth is good enough to find that fraction, then the ellipsoid radius at its
        // latitude corrects the pitch.
        let lp_angle_sphere_deg = ((EARTH_MEAN_RADIUS_KM + pointing_altitude_km) / r_norm)
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees();
        let lp_epoch = epoch - (lp_angle_sphere_deg / 360.0 * orbital_period_s) * Unit::Second;
        let (lp_position, _) = self.ephemeris.propagate(lp_epoch)?;
        let lp_latitude_deg = teme_to_geodetic(&lp_position, lp_epoch).latitude_deg;

        let local_radius_km = geocentric_radius_km(lp_latitude_deg);
        let pitch_deg = 90.0
            + ((local_radius_km + pointing_altitude_km) / r_norm)
                .clamp(-1.0, 1.0)
                .acos()
                .to_degrees();

        let yaw_deg = if self.yaw.yaw_correction {
            self.yaw.yaw_amplitude_deg
                * (arg_of_latitude_deg - (pitch_deg - 90.0) - self.yaw.yaw_phase_deg)
                    .to_radians()
                    .cos()
        } else {
            0.0
        };

        let optical_axis = rotate_about(
            &rotate_about(&r_hat, &(-orbit_normal), pitch_deg),
            &(-r_hat),
            yaw_deg,
        );
        let h_offset_normal = rotate_about(
            &rotate_about(&r_hat, &(-orbit_normal), pitch_deg - 90.0),
            &(-r_hat),
            yaw_deg,
        );
        let v_offset_normal = rotate_about(&orbit_normal, &(-r_hat), yaw_deg);

        let (optical_axis_dec_deg, optical_axis_ra_deg) = dec_ra_deg(&optical_axis);
        let geodetic = teme_to_geodetic(&position, epoch);

        if self.log_flag {
            debug!("{epoch}: r = {position} km, v = {velocity} km/s, |r| = {r_norm:.3} km");
            debug!("{epoch}: orbit normal = {orbit_normal}, period = {orbital_period}");
            debug!("{epoch}: ascending node = {ascending_node}, AoL = {arg_of_latitude_deg:.4} deg");
            debug!(
                "{epoch}: LP angle (sphere) = {lp_angle_sphere_deg:.4} deg, LP lat = {lp_latitude_deg:.4} deg, local radius = {local_radius_km:.3} km"
            );
            debug!("{epoch}: pitch = {pitch_deg:.4} deg, yaw = {yaw_deg:.4} deg");
            debug!(
                "{epoch}: optical axis = {optical_axis}, RA = {optical_axis_ra_deg:.4} deg, Dec = {optical_axis_dec_deg:.4} deg"
            );
        }

        Ok(SimulationSample {
            epoch,
            position,
            velocity,
            orbit_normal,
            orbital_period,
            geodetic,
            arg_of_latitude_deg,
            pitch_deg,
            yaw_deg,
            optical_axis,
            optical_axis_dec_deg,
            optical_axis_ra_deg,
            h_offset_normal,
            v_offset_normal,
            lp_latitude_deg,
        })
    }
}

#[cfg(test)]
mod attitude_ut {
    use super::*;
    use crate::cosmic::geodesy::EARTH_EQUATORIAL_RADIUS_KM;
    use crate::cosmic::test_tle;
    use approx::assert_abs_diff_eq;

    fn no_yaw() -> YawSettings {
        YawSettings {
            yaw_correction: false,
            ..Default::default()
        }
    }

    #[test]
    fn optical_axis_is_tangent_at_altitude() {
        let eph = Ephemeris::from_tle(&test_tle()).unwrap();
        let sim = OrbitAttitudeSimulator::new(&eph, no_yaw());
        let epoch = eph.epoch() + 2.0 * Unit::Hour;
        let sample = sim.simulate(epoch, 92.5).unwrap();

        // Distance from the Earth's center to the line of sight
        let closest = sample.position - sample.optical_axis * sample.position.dot(&sample.optical_axis);
        let tangent_height = closest.norm() - geocentric_radius_km(sample.lp_latitude_deg);
        assert_abs_diff_eq!(tangent_height, 92.5, epsilon = 1e-6);

        // Looking backwards and below the local horizontal
        assert!(sample.optical_axis.dot(&sample.velocity) < 0.0);
        assert!(sample.optical_axis.dot(&sample.position) < 0.0);
        assert!(sample.pitch_deg > 90.0 && sample.pitch_deg < 120.0);

        // Without yaw, the axis is in the orbital plane
        assert_abs_diff_eq!(sample.optical_axis.dot(&sample.orbit_normal), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample.yaw_deg, 0.0);

        // Period of a ~590 km orbit
        let period_min = sample.orbital_period.to_unit(Unit::Minute);
        assert!((95.0..98.0).contains(&period_min), "{period_min}");
    }

    #[test]
    fn look_point_latitude_trails_the_satellite() {
        let eph = Ephemeris::from_tle(&test_tle()).unwrap();
        let sim = OrbitAttitudeSimulator::new(&eph, no_yaw());
        let sample = sim.simulate(eph.epoch() + 40.0 * Unit::Minute, 92.5).unwrap();

        // The look point is ~22 deg behind along the track, so the latitudes differ by at most that much
        let lat_diff = (sample.lp_latitude_deg - sample.geodetic.latitude_deg).abs();
        assert!(lat_diff > 0.0 && lat_diff < 25.0, "{lat_diff}");
        assert!(geocentric_radius_km(sample.lp_latitude_deg) <= EARTH_EQUATORIAL_RADIUS_KM);
    }

    #[test]
    fn yaw_rotates_the_frame_rigidly() {
        let eph = Ephemeris::from_tle(&test_tle()).unwrap();
        let epoch = eph.epoch() + 1.0 * Unit::Hour;
        let sample = OrbitAttitudeSimulator::new(&eph, YawSettings::default())
            .simulate(epoch, 92.5)
            .unwrap();

        assert!(sample.yaw_deg.abs() <= 3.8 + 1e-12);
        // The three axes stay orthonormal
        assert_abs_diff_eq!(sample.optical_axis.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample.optical_axis.dot(&sample.h_offset_normal), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample.optical_axis.dot(&sample.v_offset_normal), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample.h_offset_normal.dot(&sample.v_offset_normal), 0.0, epsilon = 1e-12);

        // The optical axis itself has no offset, a direction above it has a positive vertical offset
        let (v, h) = sample.offsets_deg(&sample.optical_axis);
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(h, 0.0, epsilon = 1e-6);
        let above = rotate_about(&sample.optical_axis, &sample.v_offset_normal, 2.0);
        let (v, h) = sample.offsets_deg(&above);
        assert_abs_diff_eq!(v, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(h, 0.0, epsilon = 1e-9);
        let aside = rotate_about(&sample.optical_axis, &sample.h_offset_normal, -1.5);
        let (v, h) = sample.offsets_deg(&aside);
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(h, -1.5, epsilon = 1e-9);
    }

    #[test]
    fn fixed_stars_drift_downwards() {
        let eph = Ephemeris::from_tle(&test_tle()).unwrap();
        let sim = OrbitAttitudeSimulator::new(&eph, no_yaw());
        let epoch = eph.epoch() + 1.0 * Unit::Hour;
        let first = sim.simulate(epoch, 92.5).unwrap();
        let target = first.optical_axis;
        let later = sim.simulate(epoch + 10.0 * Unit::Second, 92.5).unwrap();
        let (v, _) = later.offsets_deg(&target);
        // The axis sweeps the sky at one revolution per orbit, i.e. ~0.6 deg in 10 s
        assert!(v < -0.5 && v > -0.7, "{v}");
    }
}
