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

use super::{ModeKind, TimelineSettingsPatch};
use crate::errors::{MalformedTimelineSnafu, TimelineError, TimelineIoSnafu, TimelineJsonSnafu};
use crate::io::{fmt_timeline_date, parse_timeline_date};
use crate::schedule::Interval;
use crate::time::Epoch;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use snafu::{ensure, ResultExt};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Tag of the first element of the artifact
pub const HEADER_TAG: &str = "Timeline_settings";

/// First element of a Science Mode Timeline:
/// `["Timeline_settings", text, text, generation date, version, settings, [TLE line 1, TLE line 2]]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineHeader {
    pub description: String,
    pub note: String,
    pub generated: Epoch,
    pub version: String,
    /// Timeline settings used for the generation
    pub settings: Value,
    pub tle: [String; 2],
}

impl Serialize for TimelineHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (
            HEADER_TAG,
            &self.description,
            &self.note,
            fmt_timeline_date(self.generated),
            &self.version,
            &self.settings,
            &self.tle,
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimelineHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (tag, description, note, generated, version, settings, tle): (
            String,
            String,
            String,
            String,
            String,
            Value,
            [String; 2],
        ) = Deserialize::deserialize(deserializer)?;
        if tag != HEADER_TAG {
            return Err(D::Error::custom(format!(
                "expected `{HEADER_TAG}` as the first element, got `{tag}`"
            )));
        }
        Ok(Self {
            description,
            note,
            generated: parse_timeline_date(&generated).map_err(D::Error::custom)?,
            version,
            settings,
            tle,
        })
    }
}

/// One Mode of a Science Mode Timeline: `[mode, start date, end date, settings, comment]`.
/// The position of each field is the interface of the command generation, it never changes.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineEntry {
    pub mode: ModeKind,
    pub start: Epoch,
    pub end: Epoch,
    pub settings: Value,
    pub comment: String,
}

impl TimelineEntry {
    pub fn new(mode: ModeKind, interval: Interval, settings: Value, comment: String) -> Self {
        Self {
            mode,
            start: interval.start,
            end: interval.end,
            settings,
            comment,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

impl Serialize for TimelineEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (
            self.mode,
            fmt_timeline_date(self.start),
            fmt_timeline_date(self.end),
            &self.settings,
            &self.comment,
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimelineEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (mode, start, end, settings, comment): (ModeKind, String, String, Value, String) =
            Deserialize::deserialize(deserializer)?;
        Ok(Self {
            mode,
            start: parse_timeline_date(&start).map_err(D::Error::custom)?,
            end: parse_timeline_date(&end).map_err(D::Error::custom)?,
            settings,
            comment,
        })
    }
}

/// The Science Mode Timeline: the header followed by the Modes in chronological order.
#[derive(Clone, Debug, PartialEq)]
pub struct ScienceModeTimeline {
    pub header: TimelineHeader,
    pub entries: Vec<TimelineEntry>,
}

impl ScienceModeTimeline {
    /// Entries of one Mode
    pub fn entries_of(&self, mode: ModeKind) -> impl Iterator<Item = &TimelineEntry> + '_ {
        self.entries.iter().filter(move |e| e.mode == mode)
    }

    /// The artifact as a JSON array value
    pub fn to_value(&self) -> Result<Value, TimelineError> {
        let mut items = Vec::with_capacity(self.entries.len() + 1);
        items.push(serde_json::to_value(&self.header).context(TimelineJsonSnafu)?);
        for entry in &self.entries {
            items.push(serde_json::to_value(entry).context(TimelineJsonSnafu)?);
        }
        Ok(Value::Array(items))
    }

    pub fn to_json(&self) -> Result<String, TimelineError> {
        serde_json::to_string_pretty(&self.to_value()?).context(TimelineJsonSnafu)
    }

    pub fn from_json(data: &str) -> Result<Self, TimelineError> {
        let value: Value = serde_json::from_str(data).context(TimelineJsonSnafu)?;
        let Value::Array(mut items) = value else {
            return MalformedTimelineSnafu {
                reason: "the timeline is not a JSON array",
            }
            .fail();
        };
        ensure!(
            !items.is_empty(),
            MalformedTimelineSnafu {
                reason: "the timeline has no settings entry"
            }
        );
        let entries = items.split_off(1);
        let header = items.pop().unwrap_or(Value::Null);
        let header: TimelineHeader = serde_json::from_value(header).map_err(|e| TimelineError::MalformedTimeline {
            reason: format!("invalid settings entry: {e}"),
        })?;
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                serde_json::from_value(item).map_err(|e| TimelineError::MalformedTimeline {
                    reason: format!("invalid entry #{}: {e}", idx + 1),
                })
            })
            .collect::<Result<Vec<TimelineEntry>, _>>()?;
        Ok(Self { header, entries })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TimelineError> {
        let path_str = path.as_ref().display().to_string();
        let file = File::create(path.as_ref()).context(TimelineIoSnafu { path: &path_str })?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(self.to_json()?.as_bytes())
            .and_then(|_| writer.flush())
            .context(TimelineIoSnafu { path: &path_str })?;
        info!("science mode timeline saved to {path_str}");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TimelineError> {
        let path_str = path.as_ref().display().to_string();
        let data = fs::read_to_string(path.as_ref()).context(TimelineIoSnafu { path: &path_str })?;
        Self::from_json(&data)
    }

    /// The timeline settings recorded in the header, to be applied over those of a configuration file.
    pub fn settings_patch(&self) -> Result<TimelineSettingsPatch, TimelineError> {
        serde_json::from_value(self.header.settings.clone()).map_err(|e| TimelineError::MalformedTimeline {
            reason: format!("invalid timeline settings: {e}"),
        })
    }
}

#[cfg(test)]
mod entry_ut {
    use super::*;
    use crate::time::TimeUnits;
    use crate::timeline::TimelineSettings;
    use serde_json::json;

    fn timeline() -> ScienceModeTimeline {
        let t0 = Epoch::from_gregorian_utc_hms(2022, 11, 22, 6, 0, 0);
        let settings = TimelineSettings::builder()
            .start_date(t0)
            .duration(8.hours())
            .build();
        ScienceModeTimeline {
            header: TimelineHeader {
                description: "Science Mode Timeline".to_string(),
                note: String::new(),
                generated: Epoch::from_gregorian_utc_hms(2022, 11, 21, 9, 5, 3),
                version: "0.4.0".to_string(),
                settings: serde_json::to_value(&settings).unwrap(),
                tle: ["1 line".to_string(), "2 line".to_string()],
            },
            entries: vec![
                TimelineEntry::new(
                    ModeKind::CCDBIAS,
                    Interval::from_duration(t0, 62.seconds()),
                    json!({"mode_duration": "1 min"}),
                    String::new(),
                ),
                TimelineEntry::new(
                    ModeKind::Mode1,
                    Interval::new(t0 + 62.seconds(), t0 + 8.hours()),
                    json!({"pointing_altitude_m": 92500}),
                    "gap".to_string(),
                ),
            ],
        }
    }

    #[test]
    fn positional_layout() {
        let value = timeline().to_value().unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 3);

        let header = items[0].as_array().unwrap();
        assert_eq!(header.len(), 7);
        assert_eq!(header[0], "Timeline_settings");
        assert_eq!(header[3], "2022/11/21 09:05:03");
        assert_eq!(header[4], "0.4.0");
        assert_eq!(header[5]["duration"], "8 h");
        assert_eq!(header[6], json!(["1 line", "2 line"]));

        let entry = items[1].as_array().unwrap();
        assert_eq!(entry.len(), 5);
        assert_eq!(entry[0], "CCDBIAS");
        assert_eq!(entry[1], "2022/11/22 06:00:00");
        assert_eq!(entry[2], "2022/11/22 06:01:02");
        assert_eq!(entry[3]["mode_duration"], "1 min");
        assert_eq!(entry[4], "");
    }

    #[test]
    fn reload_and_patch() {
        let smt = timeline();
        let reloaded = ScienceModeTimeline::from_json(&smt.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, smt);
        assert_eq!(reloaded.entries_of(ModeKind::Mode1).count(), 1);

        let patch = reloaded.settings_patch().unwrap();
        assert_eq!(patch.duration, Some(8.hours()));
        assert_eq!(
            patch.start_date,
            Some(Epoch::from_gregorian_utc_hms(2022, 11, 22, 6, 0, 0))
        );
        assert_eq!(TimelineSettings::default().merged(&patch).duration, 8.hours());
    }

    #[test]
    fn malformed_artifacts() {
        for data in [
            "{}",
            "[]",
            r#"[["Settings", "", "", "2022/1/1 00:00:00", "0.4.0", {}, ["a", "b"]]]"#,
            r#"[["Timeline_settings", "", "", "2022/1/1 00:00:00", "0.4.0", {}, ["a", "b"]], ["Mode1", "2022/1/1"]]"#,
        ] {
            assert!(
                matches!(
                    ScienceModeTimeline::from_json(data),
                    Err(TimelineError::MalformedTimeline { .. })
                ),
                "{data}"
            );
        }
        assert!(matches!(
            ScienceModeTimeline::from_json("not json"),
            Err(TimelineError::TimelineJson { .. })
        ));
    }
}
