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
use enum_iterator::{all, Sequence};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use typed_builder::TypedBuilder;

/// Staggering of the channel exposures so that their readouts never overlap.
pub mod sync;
pub use sync::CcdSyncPlan;

/// Duration of the flush of one row, in microseconds
const FLUSH_ROW_US: f64 = 1.0;
/// Duration of a parallel (row) shift, in microseconds
const ROW_SHIFT_US: f64 = 20.0;
/// Duration of a serial (column) shift, in microseconds
const COL_SHIFT_US: f64 = 0.5;
/// Duration of the digitization of one binned pixel, in microseconds
const PIXEL_READ_US: f64 = 20.0;
/// Time to move one output pixel over the shared image transfer bus, in milliseconds
const PIXEL_TRANSFER_MS: f64 = 0.05;
/// Largest FPGA column binning exponent supported by the readout electronics
pub const MAX_NCBIN_FPGA: u32 = 7;

/// The CCD channels of the instrument. The declaration order is the fixed channel order, i.e. ascending selector bit.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize)]
pub enum Channel {
    IR1,
    IR4,
    IR3,
    IR2,
    UV1,
    UV2,
    NADIR,
}

impl Channel {
    /// Channel selector bit used by the CCD commands
    pub const fn bit(self) -> u8 {
        match self {
            Self::IR1 => 1,
            Self::IR4 => 2,
            Self::IR3 => 4,
            Self::IR2 => 8,
            Self::UV1 => 16,
            Self::UV2 => 32,
            Self::NADIR => 64,
        }
    }

    /// Whether the readout of this channel must be synchronized with the others.
    /// The nadir imager does not interfere with the limb channels.
    pub const fn is_synchronized(self) -> bool {
        !matches!(self, Self::NADIR)
    }

    /// Decodes a selector value into the channels it enables, in channel order.
    pub fn from_select_bits(bits: u8) -> Vec<Self> {
        all::<Self>().filter(|ch| bits & ch.bit() != 0).collect()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::IR1 => "IR1",
            Self::IR2 => "IR2",
            Self::IR3 => "IR3",
            Self::IR4 => "IR4",
            Self::UV1 => "UV1",
            Self::UV2 => "UV2",
            Self::NADIR => "NADIR",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Channel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ir1" => Ok(Self::IR1),
            "ir2" => Ok(Self::IR2),
            "ir3" => Ok(Self::IR3),
            "ir4" => Ok(Self::IR4),
            "uv1" => Ok(Self::UV1),
            "uv2" => Ok(Self::UV2),
            "nadir" => Ok(Self::NADIR),
            _ => Err(ConfigError::InvalidConfig {
                msg: format!("unknown CCD channel `{s}`"),
            }),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GainMode {
    #[default]
    High,
    Low,
}

/// Exposure and readout geometry of one CCD channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct CcdSettings {
    /// Exposure time in milliseconds, zero disables the channel
    #[builder(default = 5000)]
    pub texpms: u32,
    /// Number of binned rows read out
    #[builder(default = 511)]
    pub nrow: u32,
    /// Row binning factor
    #[builder(default = 2)]
    pub nrbin: u32,
    /// Rows skipped before the readout
    #[builder(default = 0)]
    pub nrskip: u32,
    /// Number of binned columns read out, minus one
    #[builder(default = 43)]
    pub ncol: u32,
    /// Column binning on the CCD
    #[builder(default = 40)]
    pub ncbin_ccd: u32,
    /// Additional column binning in the FPGA, as a power of two, at most [`MAX_NCBIN_FPGA`]
    #[builder(default = 0)]
    pub ncbin_fpga: u32,
    /// Columns skipped before the readout
    #[builder(default = 0)]
    pub ncskip: u32,
    /// Number of rows flushed before the exposure
    #[builder(default = 1023)]
    pub nflush: u32,
    #[builder(default)]
    pub gain_mode: GainMode,
    #[builder(default = true)]
    pub pwr: bool,
}

impl Default for CcdSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CcdSettings {
    pub fn is_enabled(&self) -> bool {
        self.texpms > 0
    }

    /// Number of binned pixels digitized per row
    fn pixels_per_row(&self) -> f64 {
        (f64::from(self.ncol) + 1.0) * 2.0_f64.powi(self.ncbin_fpga as i32)
    }

    /// Duration of the readout of one image, in milliseconds, from the pixel clock of the CCD.
    pub fn readout_time_ms(&self) -> f64 {
        let per_row_us = f64::from(self.nrbin) * ROW_SHIFT_US
            + f64::from(self.ncskip) * COL_SHIFT_US
            + self.pixels_per_row() * (f64::from(self.ncbin_ccd) * COL_SHIFT_US + PIXEL_READ_US);
        let total_us = f64::from(self.nflush) * FLUSH_ROW_US
            + f64::from(self.nrskip) * ROW_SHIFT_US
            + f64::from(self.nrow) * per_row_us;
        total_us / 1000.0
    }

    /// Estimated duration of the transfer of one image to the payload computer, in milliseconds.
    pub fn transfer_time_ms(&self) -> f64 {
        f64::from(self.nrow) * (f64::from(self.ncol) + 1.0) * PIXEL_TRANSFER_MS
    }

    /// Applies the overrides of the patch, field by field.
    pub fn merged(&self, patch: &CcdSettingsPatch) -> Self {
        Self {
            texpms: patch.texpms.unwrap_or(self.texpms),
            nrow: patch.nrow.unwrap_or(self.nrow),
            nrbin: patch.nrbin.unwrap_or(self.nrbin),
            nrskip: patch.nrskip.unwrap_or(self.nrskip),
            ncol: patch.ncol.unwrap_or(self.ncol),
            ncbin_ccd: patch.ncbin_ccd.unwrap_or(self.ncbin_ccd),
            ncbin_fpga: patch.ncbin_fpga.unwrap_or(self.ncbin_fpga),
            ncskip: patch.ncskip.unwrap_or(self.ncskip),
            nflush: patch.nflush.unwrap_or(self.nflush),
            gain_mode: patch.gain_mode.unwrap_or(self.gain_mode),
            pwr: patch.pwr.unwrap_or(self.pwr),
        }
    }
}

/// Per-Mode overrides of the configured CCD settings, every `Some` field wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcdSettingsPatch {
    pub texpms: Option<u32>,
    pub nrow: Option<u32>,
    pub nrbin: Option<u32>,
    pub nrskip: Option<u32>,
    pub ncol: Option<u32>,
    pub ncbin_ccd: Option<u32>,
    pub ncbin_fpga: Option<u32>,
    pub ncskip: Option<u32>,
    pub nflush: Option<u32>,
    pub gain_mode: Option<GainMode>,
    pub pwr: Option<bool>,
}

/// Settings of every channel of the instrument.
pub type ChannelSettings = BTreeMap<Channel, CcdSettings>;

/// Default settings for every channel. The nadir imager uses a short exposure and a small window.
pub fn default_channel_settings() -> ChannelSettings {
    all::<Channel>()
        .map(|ch| {
            let settings = match ch {
                Channel::NADIR => CcdSettings::builder()
                    .texpms(1500)
                    .nrow(36)
                    .nrbin(36)
                    .ncol(55)
                    .ncbin_ccd(36)
                    .build(),
                Channel::UV1 | Channel::UV2 => CcdSettings::builder().texpms(3000).build(),
                _ => CcdSettings::default(),
            };
            (ch, settings)
        })
        .collect()
}

/// Applies the patches to the channels they name, the other channels are copied.
pub fn merge_channel_settings(
    base: &ChannelSettings,
    patches: &BTreeMap<Channel, CcdSettingsPatch>,
) -> ChannelSettings {
    base.iter()
        .map(|(ch, settings)| match patches.get(ch) {
            Some(patch) => (*ch, settings.merged(patch)),
            None => (*ch, settings.clone()),
        })
        .collect()
}

/// Enabled channels sorted by exposure time, ties in channel order. This is the order of successive snapshot
/// commands, so that the shortest exposures are read out first.
pub fn snapshot_order(settings: &ChannelSettings) -> Vec<Channel> {
    let mut enabled = settings
        .iter()
        .filter(|(_, s)| s.is_enabled())
        .map(|(ch, s)| (*ch, s.texpms))
        .collect::<Vec<_>>();
    // BTreeMap iteration is in channel order and the sort is stable
    enabled.sort_by_key(|(_, texpms)| *texpms);
    enabled.into_iter().map(|(ch, _)| ch).collect()
}

/// Longest exposure of the enabled channels, in milliseconds
pub fn max_exposure_ms(settings: &ChannelSettings) -> u32 {
    settings.values().map(|s| s.texpms).max().unwrap_or(0)
}
