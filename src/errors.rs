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

use crate::instrument::Channel;
use crate::time::{Duration, Epoch};
use crate::timeline::ModeKind;
use snafu::prelude::*;

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EphemerisError {
    #[snafu(display("could not parse TLE: {msg}"))]
    TleParsing { msg: String },
    #[snafu(display("could not decode TLE epoch `{field}`"))]
    TleEpoch { field: String },
    #[snafu(display("SGP4 initialization failed: {msg}"))]
    Sgp4Init { msg: String },
    #[snafu(display("SGP4 propagation to {epoch} failed: {msg}"))]
    Propagation { epoch: Epoch, msg: String },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SkyError {
    #[snafu(display("star catalog `{name}` not found"))]
    CatalogNotFound { name: String },
    #[snafu(display("could not read star catalog: {source}"))]
    CatalogCsv { source: csv::Error },
    #[snafu(display("star catalog entry `{name}` is invalid: {reason}"))]
    InvalidStar { name: String, reason: String },
}

/// Failures of a visibility scan. An empty scan is not an error.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScanError {
    #[snafu(display("{source}"))]
    ScanEphemeris { source: EphemerisError },
    #[snafu(display("{source}"))]
    ScanSky { source: SkyError },
}

/// Precondition violations of the CCD synchronization solver. These indicate bad channel settings and abort the
/// computation of the Mode which requested the plan.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SyncError {
    #[snafu(display("CCD sync plan has {count} leading channels (offset 0), expected exactly one"))]
    NoLeadingChannel { count: usize },
    #[snafu(display("offset of {channel} is {offset_ms} ms, not a non-negative multiple of 10 ms"))]
    MisalignedOffset { channel: Channel, offset_ms: i64 },
    #[snafu(display("{channel} has a zero binning factor ({field})"))]
    ZeroBinning {
        channel: Channel,
        field: &'static str,
    },
    #[snafu(display("{channel} has {field} = {value}, the largest supported value is {max}"))]
    BinningOutOfRange {
        channel: Channel,
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[snafu(display("{channel} readout time of {readout_ms} ms cannot be synchronized"))]
    UnboundedReadout { channel: Channel, readout_ms: f64 },
}

/// Errors raised while computing the window of a single Mode. The orchestrator reports them in the Mode's comment
/// and proceeds with the rest of the priority list.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ModeError {
    #[snafu(display(
        "{mode}: freeze duration of {freeze} is shorter than the {required} needed by its snapshots"
    ))]
    FreezeTooShort {
        mode: ModeKind,
        freeze: Duration,
        required: Duration,
    },
    #[snafu(display(
        "{mode}: sweep from {from_m} m to {to_m} m is inconsistent with a signed rate of {rate}"
    ))]
    SweepSignMismatch {
        mode: ModeKind,
        from_m: f64,
        to_m: f64,
        rate: f64,
    },
    #[snafu(display("{mode}: {reason}"))]
    InvalidSettings { mode: ModeKind, reason: String },
    #[snafu(display("{mode}: visibility scan failed: {source}"))]
    ModeScan { mode: ModeKind, source: ScanError },
    #[snafu(display("{mode}: CCD synchronization failed: {source}"))]
    ModeSync { mode: ModeKind, source: SyncError },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TimelineError {
    #[snafu(display("could not read the system clock: {msg}"))]
    Clock { msg: String },
    #[snafu(display("I/O error on science mode timeline {path}: {source}"))]
    TimelineIo {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("science mode timeline JSON error: {source}"))]
    TimelineJson { source: serde_json::Error },
    #[snafu(display("malformed science mode timeline: {reason}"))]
    MalformedTimeline { reason: String },
    #[snafu(display("could not load the ephemeris of the timeline: {source}"))]
    TimelineEphemeris { source: EphemerisError },
    #[snafu(display("could not load the star catalog: {source}"))]
    TimelineSky { source: SkyError },
    #[snafu(display("{source}"))]
    TimelineConfig { source: crate::io::ConfigError },
}
