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

use crate::time::{Duration, Epoch, Unit};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde::{Serialize, Serializer};
use snafu::prelude::*;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

/// The full planning configuration (timeline settings, priority list and one block per Mode).
pub mod config;
pub use config::Configuration;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file: {source}"))]
    ReadError { source: std::io::Error },

    #[snafu(display("failed to parse YAML configuration file: {source}"))]
    ParseError { source: serde_yaml::Error },

    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfig { msg: String },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }
}

/// Formats an epoch the way the downstream command generation expects it: `YYYY/M/D HH:MM:SS` in UTC, rounded to
/// the nearest second.
pub fn fmt_timeline_date(epoch: Epoch) -> String {
    let (y, m, d, hh, mm, ss, _) = (epoch + 0.5 * Unit::Second).to_gregorian_utc();
    format!("{y}/{m}/{d} {hh:02}:{mm:02}:{ss:02}")
}

/// Parses a `YYYY/M/D H:M:S` date (fields may or may not be zero padded, seconds may be fractional).
/// The time of day is optional and defaults to midnight.
pub fn parse_timeline_date(s: &str) -> Result<Epoch, String> {
    let mut parts = s.split_whitespace();
    let date = parts.next().ok_or(format!("empty date `{s}`"))?;
    let time = parts.next().unwrap_or("0:0:0");
    if parts.next().is_some() {
        return Err(format!("trailing data in date `{s}`"));
    }

    let ymd = date
        .split('/')
        .map(|field| field.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid calendar date `{date}`: {e}"))?;
    if ymd.len() != 3 {
        return Err(format!("expected YYYY/M/D, got `{date}`"));
    }

    let hms = time.split(':').map(|field| field.trim()).collect::<Vec<_>>();
    if hms.is_empty() || hms.len() > 3 {
        return Err(format!("expected H:M:S, got `{time}`"));
    }
    let hour = hms[0]
        .parse::<u8>()
        .map_err(|e| format!("invalid hour in `{time}`: {e}"))?;
    let minute = match hms.get(1) {
        Some(field) => field
            .parse::<u8>()
            .map_err(|e| format!("invalid minute in `{time}`: {e}"))?,
        None => 0,
    };
    let seconds = match hms.get(2) {
        Some(field) => field
            .parse::<f64>()
            .map_err(|e| format!("invalid second in `{time}`: {e}"))?,
        None => 0.0,
    };
    if !(0.0..60.0).contains(&seconds) {
        return Err(format!("second out of range in `{time}`"));
    }

    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as u32;

    let year = i32::try_from(ymd[0]).map_err(|_| format!("year out of range in `{date}`"))?;
    let month = u8::try_from(ymd[1]).map_err(|_| format!("month out of range in `{date}`"))?;
    let day = u8::try_from(ymd[2]).map_err(|_| format!("day out of range in `{date}`"))?;

    Epoch::maybe_from_gregorian_utc(
        year,
        month,
        day,
        hour,
        minute,
        whole as u8,
        nanos,
    )
    .map_err(|e| format!("invalid date `{s}`: {e}"))
}

/// Serializes an epoch in the timeline date format
pub(crate) fn epoch_to_str<S>(epoch: &Epoch, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&fmt_timeline_date(*epoch))
}

/// A deserializer from either a timeline date string or a hifitime epoch string
pub(crate) fn epoch_from_str<'de, D>(deserializer: D) -> Result<Epoch, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match parse_timeline_date(&s) {
        Ok(epoch) => Ok(epoch),
        Err(e) => Epoch::from_str(&s).map_err(|_| serde::de::Error::custom(e)),
    }
}

pub(crate) fn maybe_epoch_to_str<S>(epoch: &Option<Epoch>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if let Some(epoch) = epoch {
        epoch_to_str(epoch, serializer)
    } else {
        serializer.serialize_none()
    }
}

pub(crate) fn maybe_epoch_from_str<'de, D>(deserializer: D) -> Result<Option<Epoch>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => match parse_timeline_date(&s) {
            Ok(epoch) => Ok(Some(epoch)),
            Err(e) => Epoch::from_str(&s)
                .map(Some)
                .map_err(|_| serde::de::Error::custom(e)),
        },
        None => Ok(None),
    }
}

pub(crate) fn duration_to_str<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{duration}"))
}

/// A deserializer from Duration string
pub(crate) fn duration_from_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Duration::from_str(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn maybe_duration_to_str<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if let Some(duration) = duration {
        duration_to_str(duration, serializer)
    } else {
        serializer.serialize_none()
    }
}

pub(crate) fn maybe_duration_from_str<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => Duration::from_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
