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
use crate::cosmic::YawSettings;
use crate::errors::{FreezeTooShortSnafu, InvalidSettingsSnafu, ModeError, SweepSignMismatchSnafu};
use crate::instrument::{CcdSettingsPatch, Channel};
use crate::io::{
    duration_from_str, duration_to_str, epoch_from_str, epoch_to_str, maybe_duration_from_str,
    maybe_duration_to_str, maybe_epoch_from_str, maybe_epoch_to_str,
};
use crate::schedule::Interval;
use crate::time::{Duration, Epoch, Unit};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::collections::BTreeMap;
use typed_builder::TypedBuilder;

/// Handling of a Mode placed (partially) outside of the timeline horizon.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutOfHorizon {
    /// Log an error and keep the Mode
    #[default]
    Warn,
    /// Leave the Mode out of the timeline
    Reject,
}

/// Settings which apply to the whole timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct TimelineSettings {
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    #[builder(default = Epoch::from_gregorian_utc_at_midnight(2023, 1, 1))]
    pub start_date: Epoch,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Day * 1)]
    pub duration: Duration,
    /// Margin appended to the window of every Mode
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 2)]
    pub mode_separation: Duration,
    /// Margin between two successive commands within a Mode
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Millisecond * 100)]
    pub cmd_separation: Duration,
    #[builder(default = true)]
    pub yaw_correction: bool,
    #[builder(default = -3.8)]
    pub yaw_amplitude_deg: f64,
    #[builder(default = -20.0)]
    pub yaw_phase_deg: f64,
    /// Pointing altitude of the operational Modes, in meters
    #[builder(default = 92_500)]
    pub standard_pointing_altitude_m: i64,
    /// Gaps shorter than this are not filled with the operational Mode
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Minute * 5)]
    pub min_operational_duration: Duration,
    #[builder(default = ModeKind::Mode1)]
    pub operational_mode: ModeKind,
    /// Margin after each CCD readout in the synchronization, in milliseconds
    #[builder(default = 50)]
    pub ccd_sync_extra_offset_ms: i64,
    /// Margin added to the shared exposure interval, in milliseconds
    #[builder(default = 100)]
    pub ccd_sync_extra_interval_ms: i64,
    #[builder(default)]
    pub on_out_of_horizon: OutOfHorizon,
    /// Reserve the end of the timeline to hand the instrument over to idle
    #[builder(default = false)]
    pub go_idle: bool,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Minute * 10)]
    pub idle_lead: Duration,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TimelineSettings {
    pub fn end_date(&self) -> Epoch {
        self.start_date + self.duration
    }

    /// The full planning horizon
    pub fn horizon(&self) -> Interval {
        Interval::new(self.start_date, self.end_date())
    }

    /// The window reserved for the idle handover, if enabled
    pub fn idle_window(&self) -> Option<Interval> {
        if self.go_idle {
            let start = if self.idle_lead < self.duration {
                self.end_date() - self.idle_lead
            } else {
                self.start_date
            };
            Some(Interval::new(start, self.end_date()))
        } else {
            None
        }
    }

    pub fn yaw(&self) -> YawSettings {
        YawSettings {
            yaw_correction: self.yaw_correction,
            yaw_amplitude_deg: self.yaw_amplitude_deg,
            yaw_phase_deg: self.yaw_phase_deg,
        }
    }

    /// Applies the overrides of the patch, e.g. the settings recorded in a Science Mode Timeline over those of the
    /// configuration file.
    pub fn merged(&self, patch: &TimelineSettingsPatch) -> Self {
        Self {
            start_date: patch.start_date.unwrap_or(self.start_date),
            duration: patch.duration.unwrap_or(self.duration),
            mode_separation: patch.mode_separation.unwrap_or(self.mode_separation),
            cmd_separation: patch.cmd_separation.unwrap_or(self.cmd_separation),
            yaw_correction: patch.yaw_correction.unwrap_or(self.yaw_correction),
            yaw_amplitude_deg: patch.yaw_amplitude_deg.unwrap_or(self.yaw_amplitude_deg),
            yaw_phase_deg: patch.yaw_phase_deg.unwrap_or(self.yaw_phase_deg),
            standard_pointing_altitude_m: patch
                .standard_pointing_altitude_m
                .unwrap_or(self.standard_pointing_altitude_m),
            min_operational_duration: patch
                .min_operational_duration
                .unwrap_or(self.min_operational_duration),
            operational_mode: patch.operational_mode.unwrap_or(self.operational_mode),
            ccd_sync_extra_offset_ms: patch
                .ccd_sync_extra_offset_ms
                .unwrap_or(self.ccd_sync_extra_offset_ms),
            ccd_sync_extra_interval_ms: patch
                .ccd_sync_extra_interval_ms
                .unwrap_or(self.ccd_sync_extra_interval_ms),
            on_out_of_horizon: patch.on_out_of_horizon.unwrap_or(self.on_out_of_horizon),
            go_idle: patch.go_idle.unwrap_or(self.go_idle),
            idle_lead: patch.idle_lead.unwrap_or(self.idle_lead),
        }
    }
}

/// Field level overrides of the timeline settings, every `Some` field wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettingsPatch {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    pub start_date: Option<Epoch>,
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    pub duration: Option<Duration>,
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    pub mode_separation: Option<Duration>,
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    pub cmd_separation: Option<Duration>,
    pub yaw_correction: Option<bool>,
    pub yaw_amplitude_deg: Option<f64>,
    pub yaw_phase_deg: Option<f64>,
    pub standard_pointing_altitude_m: Option<i64>,
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    pub min_operational_duration: Option<Duration>,
    pub operational_mode: Option<ModeKind>,
    pub ccd_sync_extra_offset_ms: Option<i64>,
    pub ccd_sync_extra_interval_ms: Option<i64>,
    pub on_out_of_horizon: Option<OutOfHorizon>,
    pub go_idle: Option<bool>,
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    pub idle_lead: Option<Duration>,
}

/// Attitude freeze around a celestial target and the snapshots taken during it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct FreezeSettings {
    /// Time between the start of the Mode and the crossing of the target
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 120)]
    pub freeze_start: Duration,
    /// Length of the attitude freeze, zero to fit the snapshots exactly
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Duration::ZERO)]
    pub freeze_duration: Duration,
    /// Time after the start of the freeze when the first snapshot is taken
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 2)]
    pub snapshot_time: Duration,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 3)]
    pub snapshot_spacing: Duration,
    #[builder(default = 5)]
    pub n_snapshots: u32,
}

impl Default for FreezeSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FreezeSettings {
    /// Time needed to take every snapshot with the longest exposure
    pub fn required_duration(&self, max_exposure_ms: u32) -> Duration {
        self.snapshot_time
            + self.snapshot_spacing * i64::from(self.n_snapshots.saturating_sub(1))
            + Unit::Millisecond * i64::from(max_exposure_ms)
    }

    /// The freeze duration in effect: the configured one, or the required one when configured as zero.
    pub fn effective_duration(&self, mode: ModeKind, max_exposure_ms: u32) -> Result<Duration, ModeError> {
        let required = self.required_duration(max_exposure_ms);
        if self.freeze_duration == Duration::ZERO {
            return Ok(required);
        }
        ensure!(
            self.freeze_duration >= required,
            FreezeTooShortSnafu {
                mode,
                freeze: self.freeze_duration,
                required
            }
        );
        Ok(self.freeze_duration)
    }
}

/// A single command sent at the start of the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct StartupCommandSettings {
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 60)]
    pub mode_duration: Duration,
    /// Requested start, defaults to the end of the previous startup command
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
}

impl Default for StartupCommandSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Default duration of each startup command
pub fn default_startup_commands() -> BTreeMap<ModeKind, StartupCommandSettings> {
    [
        (ModeKind::PWRTOGGLE, 30_i64),
        (ModeKind::CCDFlushBadColumns, 200_i64),
        (ModeKind::CCDBadColumn, 60_i64),
        (ModeKind::CCDBIAS, 60_i64),
        (ModeKind::PM, 30_i64),
        (ModeKind::HTR, 30_i64),
        (ModeKind::ArgEnableYawComp, 10_i64),
    ]
    .into_iter()
    .map(|(mode, secs)| {
        (
            mode,
            StartupCommandSettings::builder()
                .mode_duration(Unit::Second * secs)
                .build(),
        )
    })
    .collect()
}

/// Mode100: the pointing altitude is stepped from one altitude to another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct AltitudeStepSweepSettings {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
    #[builder(default = 50_000)]
    pub pointing_altitude_from_m: i64,
    #[builder(default = 130_000)]
    pub pointing_altitude_to_m: i64,
    /// Signed altitude step, in meters
    #[builder(default = 2_000)]
    pub pointing_altitude_interval_m: i64,
    /// Time spent at each altitude
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 60)]
    pub pointing_duration: Duration,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 60)]
    pub pointing_stabilization: Duration,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for AltitudeStepSweepSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AltitudeStepSweepSettings {
    /// Number of altitudes visited, both ends included
    pub fn steps(&self, mode: ModeKind) -> Result<i64, ModeError> {
        let span = self.pointing_altitude_to_m - self.pointing_altitude_from_m;
        let step = self.pointing_altitude_interval_m;
        ensure!(
            step != 0,
            InvalidSettingsSnafu {
                mode,
                reason: "the altitude step is zero"
            }
        );
        ensure!(
            span == 0 || span.signum() == step.signum(),
            SweepSignMismatchSnafu {
                mode,
                from_m: self.pointing_altitude_from_m as f64,
                to_m: self.pointing_altitude_to_m as f64,
                rate: step as f64
            }
        );
        Ok(span / step + 1)
    }

    pub fn mode_duration(&self, mode: ModeKind) -> Result<Duration, ModeError> {
        Ok((self.pointing_duration + self.pointing_stabilization) * self.steps(mode)?)
    }
}

/// Mode110: the pointing altitude sweeps continuously between two altitudes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct PointingSweepSettings {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
    #[builder(default = 50_000)]
    pub pointing_altitude_from_m: i64,
    #[builder(default = 130_000)]
    pub pointing_altitude_to_m: i64,
    /// Signed sweep rate, in meters per second
    #[builder(default = 500.0)]
    pub sweep_rate_m_s: f64,
    /// Stabilization at both ends of the sweep
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 60)]
    pub pointing_stabilization: Duration,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for PointingSweepSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PointingSweepSettings {
    pub fn mode_duration(&self, mode: ModeKind) -> Result<Duration, ModeError> {
        let span = (self.pointing_altitude_to_m - self.pointing_altitude_from_m) as f64;
        let rate = self.sweep_rate_m_s;
        ensure!(
            rate.is_finite() && rate != 0.0,
            InvalidSettingsSnafu {
                mode,
                reason: format!("invalid sweep rate of {rate} m/s")
            }
        );
        ensure!(
            span == 0.0 || span.signum() == rate.signum(),
            SweepSignMismatchSnafu {
                mode,
                from_m: self.pointing_altitude_from_m as f64,
                to_m: self.pointing_altitude_to_m as f64,
                rate
            }
        );
        Ok(self.pointing_stabilization * 2_i64 + Unit::Second * (span / rate).abs())
    }
}

/// Mode120: snapshots of a star crossing the field of view during an attitude freeze.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct StarCalibrationSettings {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
    /// Scanned time after the start, defaults to the rest of the timeline
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub time_to_consider: Option<Duration>,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 2)]
    pub timestep: Duration,
    /// Time skipped after every simulated orbit
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Day * 1)]
    pub time_skip: Duration,
    /// Vertical offsets at which stars are observed, cycled through on successive occurrences of the Mode
    #[builder(default = vec![0.0])]
    pub v_offsets_deg: Vec<f64>,
    #[builder(default = 0.0)]
    pub h_offset_deg: f64,
    #[builder(default = 2.5)]
    pub h_tolerance_deg: f64,
    #[builder(default = 2.0)]
    pub max_vmag: f64,
    #[builder(default = 227_000)]
    pub pointing_altitude_m: i64,
    #[builder(default)]
    pub freeze: FreezeSettings,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for StarCalibrationSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Mode124: snapshots of the Moon crossing the field of view during an attitude freeze.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct MoonCalibrationSettings {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub time_to_consider: Option<Duration>,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 2)]
    pub timestep: Duration,
    #[builder(default = vec![0.0])]
    pub v_offsets_deg: Vec<f64>,
    #[builder(default = 0.0)]
    pub h_offset_deg: f64,
    #[builder(default = 2.5)]
    pub h_tolerance_deg: f64,
    #[builder(default = 1.0)]
    pub v_tolerance_deg: f64,
    #[builder(default = 227_000)]
    pub pointing_altitude_m: i64,
    #[builder(default)]
    pub freeze: FreezeSettings,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for MoonCalibrationSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Mode130: a series of snapshots at a fixed pointing altitude.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct SnapshotSettings {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
    #[builder(default = 92_500)]
    pub pointing_altitude_m: i64,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 60)]
    pub pointing_stabilization: Duration,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 3)]
    pub snapshot_spacing: Duration,
    #[builder(default = 5)]
    pub n_snapshots: u32,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SnapshotSettings {
    pub fn mode_duration(&self) -> Duration {
        self.pointing_stabilization + self.snapshot_spacing * i64::from(self.n_snapshots)
    }
}

/// Mode131: fixed pointing altitude with custom CCD settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct FixedPointingSettings {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
    #[builder(default = 92_500)]
    pub pointing_altitude_m: i64,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Minute * 10)]
    pub mode_duration: Duration,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for FixedPointingSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Mode132: every synchronized channel is exposed with each of the listed exposure times in turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct ExposureSweepSettings {
    #[serde(
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    #[builder(default, setter(strip_option))]
    pub start_date: Option<Epoch>,
    #[builder(default = 92_500)]
    pub pointing_altitude_m: i64,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Second * 60)]
    pub pointing_stabilization: Duration,
    #[builder(default = vec![1000, 2000, 4000, 8000])]
    pub texpms: Vec<u32>,
    /// Time spent at each exposure time
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    #[builder(default = Unit::Minute * 3)]
    pub session_duration: Duration,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for ExposureSweepSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ExposureSweepSettings {
    pub fn mode_duration(&self) -> Duration {
        self.pointing_stabilization + self.session_duration * self.texpms.len() as i64
    }
}

/// Operational Modes which fill the gaps of the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct OperationalSettings {
    /// Defaults to the standard pointing altitude of the timeline
    #[builder(default, setter(strip_option))]
    pub pointing_altitude_m: Option<i64>,
    #[builder(default)]
    pub ccd: BTreeMap<Channel, CcdSettingsPatch>,
}

impl Default for OperationalSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
