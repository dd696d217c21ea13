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

use super::{CcdSettings, Channel, ChannelSettings, MAX_NCBIN_FPGA};
use crate::errors::{
    BinningOutOfRangeSnafu, MisalignedOffsetSnafu, NoLeadingChannelSnafu, SyncError,
    UnboundedReadoutSnafu, ZeroBinningSnafu,
};
use serde_derive::Serialize;
use snafu::{ensure, OptionExt};
use std::fmt;

/// Longest readout or interval accepted by the solver, one day in milliseconds
const MAX_PLAN_MS: f64 = 86_400_000.0;

/// Staggered exposure plan of the synchronized CCD channels.
///
/// Channels are listed by increasing exposure time, the first one is the leading channel (offset 0). Each channel
/// starts its exposure `offset` ms after the leading one and all channels repeat every `interval_ms`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CcdSyncPlan {
    /// Channel selector bits of the synchronized channels
    pub ccd_select: u8,
    pub channel_count: usize,
    pub channels: Vec<Channel>,
    /// Offset of each channel in milliseconds, in the order of `channels`
    pub offsets_ms: Vec<i64>,
    /// Shared exposure interval in milliseconds
    pub interval_ms: i64,
}

impl CcdSyncPlan {
    /// An empty plan has no channel to synchronize, i.e. there is nothing to schedule.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn leading_channel(&self) -> Option<Channel> {
        self.channels.first().copied()
    }

    pub fn offset_of(&self, channel: Channel) -> Option<i64> {
        self.channels
            .iter()
            .position(|ch| *ch == channel)
            .map(|idx| self.offsets_ms[idx])
    }

    /// Computes the plan of the enabled synchronized channels.
    ///
    /// `extra_offset_ms` is the margin added after every readout before the next channel may read out, and
    /// `extra_interval_ms` is added to the shared interval.
    pub fn compute(
        settings: &ChannelSettings,
        extra_offset_ms: i64,
        extra_interval_ms: i64,
    ) -> Result<Self, SyncError> {
        let mut enabled = settings
            .iter()
            .filter(|(ch, s)| ch.is_synchronized() && s.is_enabled())
            .map(|(ch, s)| (*ch, s))
            .collect::<Vec<(Channel, &CcdSettings)>>();

        if enabled.is_empty() {
            debug!("no enabled channel to synchronize");
            return Ok(Self::default());
        }

        for (channel, s) in &enabled {
            ensure!(s.nrbin > 0, ZeroBinningSnafu { channel: *channel, field: "nrbin" });
            ensure!(
                s.ncbin_ccd > 0,
                ZeroBinningSnafu {
                    channel: *channel,
                    field: "ncbin_ccd"
                }
            );
            ensure!(
                s.ncbin_fpga <= MAX_NCBIN_FPGA,
                BinningOutOfRangeSnafu {
                    channel: *channel,
                    field: "ncbin_fpga",
                    value: s.ncbin_fpga,
                    max: MAX_NCBIN_FPGA
                }
            );
            let readout_ms = s.readout_time_ms();
            ensure!(
                readout_ms.is_finite() && readout_ms < MAX_PLAN_MS,
                UnboundedReadoutSnafu {
                    channel: *channel,
                    readout_ms
                }
            );
        }

        // Stable: channels with the same exposure time keep the channel order
        enabled.sort_by_key(|(_, s)| s.texpms);

        let mut offsets_ms: Vec<i64> = Vec::with_capacity(enabled.len());
        let mut running_ms = 0.0_f64;
        let mut prev_texpms: Option<u32> = None;

        for (channel, s) in &enabled {
            if let Some(prev) = prev_texpms {
                running_ms -= f64::from(s.texpms.saturating_sub(prev));
            }
            let mut offset = round_to(running_ms.max(0.0), 10).context(UnboundedReadoutSnafu {
                channel: *channel,
                readout_ms: running_ms,
            })?;
            if let Some(prev_offset) = offsets_ms.last() {
                // A longer exposure never starts before a shorter one
                if offset <= *prev_offset {
                    offset = prev_offset + 10;
                }
            }
            trace!("{channel}: TEXPMS {} ms, offset {offset} ms", s.texpms);
            offsets_ms.push(offset);
            running_ms = offset as f64 + s.readout_time_ms() + extra_offset_ms as f64;
            prev_texpms = Some(s.texpms);
        }

        let cycle_ms = enabled
            .iter()
            .map(|(_, s)| s.readout_time_ms() + f64::from(s.texpms) + extra_offset_ms as f64)
            .fold(0.0, f64::max);
        let mut interval_ms = cycle_ms + extra_interval_ms as f64;

        // The last readout must be over before the next exposure of the leading channel ends
        let max_offset = offsets_ms.iter().copied().max().unwrap_or(0) as f64;
        let leading_texpms = f64::from(enabled[0].1.texpms);
        if leading_texpms < max_offset {
            interval_ms += max_offset - leading_texpms;
        }

        let transfer_ms = enabled
            .iter()
            .map(|(_, s)| s.transfer_time_ms())
            .sum::<f64>();
        interval_ms = interval_ms.max(transfer_ms);

        let leading = enabled[0].0;
        let mut rounded = round_to(interval_ms, 100).context(UnboundedReadoutSnafu {
            channel: leading,
            readout_ms: interval_ms,
        })?;
        if (rounded as f64) < interval_ms {
            rounded += 100;
        }

        let plan = Self {
            ccd_select: enabled.iter().fold(0, |bits, (ch, _)| bits | ch.bit()),
            channel_count: enabled.len(),
            channels: enabled.iter().map(|(ch, _)| *ch).collect(),
            offsets_ms,
            interval_ms: rounded,
        };
        plan.verify()?;

        debug!("{plan}");
        Ok(plan)
    }

    /// Checks the invariants of a non-empty plan: a single leading channel and offsets on the 10 ms grid.
    pub fn verify(&self) -> Result<(), SyncError> {
        let leading = self.offsets_ms.iter().filter(|offset| **offset == 0).count();
        ensure!(leading == 1, NoLeadingChannelSnafu { count: leading });
        for (channel, offset) in self.channels.iter().zip(&self.offsets_ms) {
            ensure!(
                *offset >= 0 && offset % 10 == 0,
                MisalignedOffsetSnafu {
                    channel: *channel,
                    offset_ms: *offset
                }
            );
        }
        Ok(())
    }
}

impl fmt::Display for CcdSyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty CCD sync plan");
        }
        write!(f, "CCD sync plan (select {}, interval {} ms):", self.ccd_select, self.interval_ms)?;
        for (channel, offset) in self.channels.iter().zip(&self.offsets_ms) {
            write!(f, " {channel}@{offset}ms")?;
        }
        Ok(())
    }
}

/// Rounds to the nearest multiple of `step`, or None if the result does not fit in an i64
fn round_to(value: f64, step: i64) -> Option<i64> {
    let steps = (value / step as f64).round();
    if !steps.is_finite() || steps.abs() >= i64::MAX as f64 {
        return None;
    }
    (steps as i64).checked_mul(step)
}
