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

use super::{ConfigError, ConfigRepr};
use crate::cosmic::Tle;
use crate::instrument::{
    default_channel_settings, max_exposure_ms, merge_channel_settings, CcdSettingsPatch, Channel,
    ChannelSettings,
};
use crate::time::Duration;
use crate::timeline::settings::{
    default_startup_commands, AltitudeStepSweepSettings, ExposureSweepSettings, FixedPointingSettings,
    MoonCalibrationSettings, OperationalSettings, PointingSweepSettings, SnapshotSettings,
    StarCalibrationSettings, StartupCommandSettings,
};
use crate::timeline::{ModeKind, TimelineSettings, TimelineSettingsPatch};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use typed_builder::TypedBuilder;

/// The planning configuration file: timeline settings, the ordered list of Modes to schedule, the orbit, the CCD
/// settings and one settings block per Mode. Any block left out of the file takes its documented defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct Configuration {
    #[builder(default)]
    pub timeline: TimelineSettings,
    /// Modes and startup commands in decreasing priority, a Mode may appear several times
    #[builder(default = vec![
        ModeKind::CCDFlushBadColumns,
        ModeKind::CCDBadColumn,
        ModeKind::CCDBIAS,
        ModeKind::PM,
        ModeKind::ArgEnableYawComp,
        ModeKind::Mode120,
        ModeKind::Mode124,
        ModeKind::Mode130,
    ])]
    pub scheduling_priority: Vec<ModeKind>,
    #[builder(default)]
    pub tle: Tle,
    /// Path to a `name,ra_deg,dec_deg,vmag` CSV star catalog, defaults to the bundled bright stars
    #[builder(default, setter(strip_option))]
    pub star_catalog: Option<String>,
    #[builder(default = default_channel_settings())]
    pub ccd: ChannelSettings,
    #[builder(default = default_startup_commands())]
    pub startup_commands: BTreeMap<ModeKind, StartupCommandSettings>,
    #[builder(default)]
    pub mode100: AltitudeStepSweepSettings,
    #[builder(default)]
    pub mode110: PointingSweepSettings,
    #[builder(default)]
    pub mode120: StarCalibrationSettings,
    #[builder(default)]
    pub mode124: MoonCalibrationSettings,
    #[builder(default)]
    pub mode130: SnapshotSettings,
    #[builder(default)]
    pub mode131: FixedPointingSettings,
    #[builder(default)]
    pub mode132: ExposureSweepSettings,
    #[builder(default)]
    pub operational: OperationalSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for Configuration {}

impl Configuration {
    /// Checks the values the planner relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidConfig { msg });

        if self.scheduling_priority.is_empty() {
            return invalid("the scheduling priority list is empty".to_string());
        }
        if let Some(mode) = self
            .scheduling_priority
            .iter()
            .find(|mode| !mode.is_schedulable())
        {
            return invalid(format!("{mode} cannot be scheduled explicitly"));
        }
        if self.timeline.duration <= Duration::ZERO {
            return invalid(format!("timeline duration of {} is not positive", self.timeline.duration));
        }
        if self.timeline.mode_separation < Duration::ZERO {
            return invalid("the mode separation is negative".to_string());
        }
        if !self.timeline.operational_mode.is_operational() {
            return invalid(format!(
                "{} is not an operational Mode",
                self.timeline.operational_mode
            ));
        }
        for (mode, timestep) in [
            (ModeKind::Mode120, self.mode120.timestep),
            (ModeKind::Mode124, self.mode124.timestep),
        ] {
            if timestep <= Duration::ZERO {
                return invalid(format!("{mode} timestep of {timestep} is not positive"));
            }
        }
        if self.tle.line1.trim().is_empty() || self.tle.line2.trim().is_empty() {
            return invalid("the TLE is missing".to_string());
        }
        Ok(())
    }

    /// Returns a copy where the timeline settings are overridden by the patch.
    pub fn merged_with(&self, patch: &TimelineSettingsPatch) -> Self {
        Self {
            timeline: self.timeline.merged(patch),
            ..self.clone()
        }
    }

    /// Settings of every channel, where channels missing from the file take their defaults.
    pub fn channel_settings(&self) -> ChannelSettings {
        let mut settings = default_channel_settings();
        for (ch, s) in &self.ccd {
            settings.insert(*ch, s.clone());
        }
        settings
    }

    /// Settings of a startup command, commands missing from the file take their defaults.
    pub fn startup_command(&self, mode: ModeKind) -> StartupCommandSettings {
        match self.startup_commands.get(&mode) {
            Some(settings) => settings.clone(),
            None => default_startup_commands().remove(&mode).unwrap_or_default(),
        }
    }

    /// CCD overrides of a Mode
    fn ccd_patches_of(&self, mode: ModeKind) -> Option<&BTreeMap<Channel, CcdSettingsPatch>> {
        match mode {
            ModeKind::Mode100 => Some(&self.mode100.ccd),
            ModeKind::Mode110 => Some(&self.mode110.ccd),
            ModeKind::Mode120 => Some(&self.mode120.ccd),
            ModeKind::Mode124 => Some(&self.mode124.ccd),
            ModeKind::Mode130 => Some(&self.mode130.ccd),
            ModeKind::Mode131 => Some(&self.mode131.ccd),
            ModeKind::Mode132 => Some(&self.mode132.ccd),
            ModeKind::Mode1 | ModeKind::Mode2 | ModeKind::Mode5 => Some(&self.operational.ccd),
            _ => None,
        }
    }

    /// CCD settings in effect during a Mode
    pub fn ccd_of(&self, mode: ModeKind) -> ChannelSettings {
        match self.ccd_patches_of(mode) {
            Some(patches) => merge_channel_settings(&self.channel_settings(), patches),
            None => self.channel_settings(),
        }
    }

    /// Longest exposure commanded by a Mode, in milliseconds
    pub fn exposure_of(&self, mode: ModeKind) -> u32 {
        match mode {
            ModeKind::Mode132 => self.mode132.texpms.iter().copied().max().unwrap_or(0),
            _ if mode.is_startup_command() || mode == ModeKind::Idle => 0,
            _ => max_exposure_ms(&self.ccd_of(mode)),
        }
    }

    /// Pointing altitude a Mode leaves the instrument at, in meters
    pub fn pointing_altitude_of(&self, mode: ModeKind) -> Option<i64> {
        match mode {
            ModeKind::Mode100 => Some(self.mode100.pointing_altitude_to_m),
            ModeKind::Mode110 => Some(self.mode110.pointing_altitude_to_m),
            ModeKind::Mode120 => Some(self.mode120.pointing_altitude_m),
            ModeKind::Mode124 => Some(self.mode124.pointing_altitude_m),
            ModeKind::Mode130 => Some(self.mode130.pointing_altitude_m),
            ModeKind::Mode131 => Some(self.mode131.pointing_altitude_m),
            ModeKind::Mode132 => Some(self.mode132.pointing_altitude_m),
            ModeKind::Mode1 | ModeKind::Mode2 | ModeKind::Mode5 => Some(
                self.operational
                    .pointing_altitude_m
                    .unwrap_or(self.timeline.standard_pointing_altitude_m),
            ),
            _ => None,
        }
    }

    /// The settings recorded with each entry of the Science Mode Timeline.
    pub fn settings_of(&self, mode: ModeKind) -> Result<Value, serde_json::Error> {
        match mode {
            ModeKind::Mode100 => serde_json::to_value(&self.mode100),
            ModeKind::Mode110 => serde_json::to_value(&self.mode110),
            ModeKind::Mode120 => serde_json::to_value(&self.mode120),
            ModeKind::Mode124 => serde_json::to_value(&self.mode124),
            ModeKind::Mode130 => serde_json::to_value(&self.mode130),
            ModeKind::Mode131 => serde_json::to_value(&self.mode131),
            ModeKind::Mode132 => serde_json::to_value(&self.mode132),
            ModeKind::Mode1 | ModeKind::Mode2 | ModeKind::Mode5 => {
                let mut operational = self.operational.clone();
                operational.pointing_altitude_m = self.pointing_altitude_of(mode);
                serde_json::to_value(&operational)
            }
            ModeKind::Idle => Ok(Value::Object(serde_json::Map::new())),
            startup => serde_json::to_value(self.startup_command(startup)),
        }
    }
}
