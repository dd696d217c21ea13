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

use crate::io::ConfigError;
use core::fmt;
use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// The Science Mode Timeline artifact.
pub mod entry;
/// Priority driven placement of all Modes.
pub mod generator;
/// Window computation of each Mode.
pub mod modes;
/// Per-run planning state.
pub mod session;
/// Timeline wide and per-Mode settings.
pub mod settings;

pub use entry::{ScienceModeTimeline, TimelineEntry, TimelineHeader};
pub use generator::{GenerationReport, TimelineGenerator};
pub use modes::{ModeContext, Placement, WindowComputer};
pub use session::PlanningSession;
pub use settings::{OutOfHorizon, TimelineSettings, TimelineSettingsPatch};

/// Every Mode and startup command which can appear in a Science Mode Timeline.
#[allow(clippy::upper_case_acronyms)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize,
)]
pub enum ModeKind {
    PWRTOGGLE,
    CCDFlushBadColumns,
    CCDBadColumn,
    CCDBIAS,
    PM,
    HTR,
    ArgEnableYawComp,
    /// Operational limb pointing
    Mode1,
    /// Operational limb pointing, alternative CCD settings
    Mode2,
    /// Operational fixed pointing
    Mode5,
    /// Altitude step sweep
    Mode100,
    /// Continuous pointing altitude sweep
    Mode110,
    /// Star calibration
    Mode120,
    /// Moon calibration
    Mode124,
    /// Snapshots at fixed pointing
    Mode130,
    /// Fixed pointing with custom CCD settings
    Mode131,
    /// Exposure time sweep
    Mode132,
    /// Hands the instrument over to idle at the end of the timeline
    Idle,
}

impl ModeKind {
    /// Single commands sent at the start of the timeline
    pub fn is_startup_command(self) -> bool {
        matches!(
            self,
            Self::PWRTOGGLE
                | Self::CCDFlushBadColumns
                | Self::CCDBadColumn
                | Self::CCDBIAS
                | Self::PM
                | Self::HTR
                | Self::ArgEnableYawComp
        )
    }

    /// Modes which fill the gaps left by the prioritized Modes
    pub fn is_operational(self) -> bool {
        matches!(self, Self::Mode1 | Self::Mode2 | Self::Mode5)
    }

    /// Whether this Mode may appear in the scheduling priority list
    pub fn is_schedulable(self) -> bool {
        !self.is_operational() && self != Self::Idle
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ModeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PWRTOGGLE" => Ok(Self::PWRTOGGLE),
            "CCDFlushBadColumns" => Ok(Self::CCDFlushBadColumns),
            "CCDBadColumn" => Ok(Self::CCDBadColumn),
            "CCDBIAS" => Ok(Self::CCDBIAS),
            "PM" => Ok(Self::PM),
            "HTR" => Ok(Self::HTR),
            "ArgEnableYawComp" => Ok(Self::ArgEnableYawComp),
            "Mode1" => Ok(Self::Mode1),
            "Mode2" => Ok(Self::Mode2),
            "Mode5" => Ok(Self::Mode5),
            "Mode100" => Ok(Self::Mode100),
            "Mode110" => Ok(Self::Mode110),
            "Mode120" => Ok(Self::Mode120),
            "Mode124" => Ok(Self::Mode124),
            "Mode130" => Ok(Self::Mode130),
            "Mode131" => Ok(Self::Mode131),
            "Mode132" => Ok(Self::Mode132),
            "Idle" => Ok(Self::Idle),
            _ => Err(ConfigError::InvalidConfig {
                msg: format!("unknown Mode `{s}`"),
            }),
        }
    }
}

#[cfg(test)]
mod timeline_ut {
    use super::*;
    use enum_iterator::all;

    #[test]
    fn mode_names_round_trip() {
        for mode in all::<ModeKind>() {
            assert_eq!(mode.to_string().parse::<ModeKind>().unwrap(), mode);
            // Serialized with the same name
            assert_eq!(
                serde_json::to_value(mode).unwrap(),
                serde_json::Value::String(mode.to_string())
            );
        }
        assert!("Mode3".parse::<ModeKind>().is_err());
    }

    #[test]
    fn mode_families() {
        let startup = all::<ModeKind>().filter(|m| m.is_startup_command()).count();
        assert_eq!(startup, 7);
        let operational = all::<ModeKind>().filter(|m| m.is_operational()).collect::<Vec<_>>();
        assert_eq!(operational, vec![ModeKind::Mode1, ModeKind::Mode2, ModeKind::Mode5]);
        assert!(!ModeKind::Idle.is_schedulable());
        assert!(ModeKind::Mode120.is_schedulable());
    }
}
