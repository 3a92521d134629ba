//! Demultiplexing of the high-rate telemetry channels.
//!
//! `CarData` and `Position` share one shape: every frame carries a batch
//! of samples, every sample an absolute UTC stamp and one record per car.
//! [`ChannelTable`] describes where those pieces live so a single routine
//! flattens both into one row per (sample, car).

use std::time::Duration;

use chrono::{DateTime, Utc};
use lapwire_frame::Frame;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wire;

/// Layout of one telemetry channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTable {
    /// Table name, also used as cache key suffix.
    pub name: &'static str,
    /// Key of the sample batch in a frame payload.
    pub samples_key: &'static str,
    /// Key of the UTC stamp in a sample.
    pub date_key: &'static str,
    /// Key of the per-car map in a sample.
    pub cars_key: &'static str,
    /// Key of the code map inside a car record, if nested.
    pub channels_key: Option<&'static str>,
    /// `(wire code, column name)` pairs, in column order.
    pub codes: &'static [(&'static str, &'static str)],
}

/// Engine and driver inputs, ~4 Hz.
pub const CAR_DATA_TABLE: ChannelTable = ChannelTable {
    name: "car_data",
    samples_key: "Entries",
    date_key: "Utc",
    cars_key: "Cars",
    channels_key: Some("Channels"),
    codes: &[
        ("0", "RPM"),
        ("2", "Speed"),
        ("3", "nGear"),
        ("4", "Throttle"),
        ("5", "Brake"),
        ("45", "DRS"),
    ],
};

/// Track coordinates, ~3-5 Hz.
pub const POSITION_TABLE: ChannelTable = ChannelTable {
    name: "position",
    samples_key: "Position",
    date_key: "Timestamp",
    cars_key: "Entries",
    channels_key: None,
    codes: &[("Status", "Status"), ("X", "X"), ("Y", "Y"), ("Z", "Z")],
};

/// One car in one telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TelemetrySample {
    /// Session clock of the frame that carried the sample.
    #[serde(with = "wire::secs")]
    pub time: Duration,
    /// Absolute time of the sample itself.
    pub date: Option<DateTime<Utc>>,
    pub driver: String,
    /// Column name to raw value; codes missing from the record are null.
    #[serde(flatten)]
    pub channels: Map<String, Value>,
}

impl TelemetrySample {
    pub fn channel(&self, name: &str) -> Option<&Value> {
        self.channels.get(name).filter(|value| !value.is_null())
    }
}

/// Flatten a telemetry frame sequence laid out as `table`.
pub fn demultiplex(frames: &[Frame], table: &ChannelTable) -> Vec<TelemetrySample> {
    let mut samples = Vec::new();
    for frame in frames {
        let Some(batch) = frame.payload.get(table.samples_key).and_then(Value::as_array) else {
            if !frame.is_raw() {
                tracing::warn!(
                    table = table.name,
                    time = ?frame.timestamp,
                    "frame has no sample batch"
                );
            }
            continue;
        };

        for sample in batch {
            let date = sample
                .get(table.date_key)
                .and_then(Value::as_str)
                .and_then(|stamp| parse_date(table, stamp));
            let Some(cars) = sample.get(table.cars_key).and_then(Value::as_object) else {
                continue;
            };

            for (driver, record) in cars {
                let record = match table.channels_key {
                    Some(key) => record.get(key).unwrap_or(&Value::Null),
                    None => record,
                };
                let channels = table
                    .codes
                    .iter()
                    .map(|(code, name)| {
                        let value = record.get(*code).cloned().unwrap_or(Value::Null);
                        (name.to_string(), value)
                    })
                    .collect();
                samples.push(TelemetrySample {
                    time: frame.timestamp,
                    date,
                    driver: driver.clone(),
                    channels,
                });
            }
        }
    }
    tracing::debug!(table = table.name, samples = samples.len(), "demultiplexed");
    samples
}

fn parse_date(table: &ChannelTable, stamp: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(stamp) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(err) => {
            tracing::warn!(table = table.name, stamp, error = %err, "unparsable sample date");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn car_data_codes_map_to_columns() {
        let frames = [Frame::new(
            Duration::from_millis(61_250),
            "car_data",
            json!({"Entries": [{
                "Utc": "2021-03-28T15:03:57.352Z",
                "Cars": {
                    "44": {"Channels": {"0": 11021, "2": 287, "3": 7, "4": 100, "5": 0, "45": 12}},
                    "33": {"Channels": {"0": 10880, "2": 285}}
                }
            }]}),
        )];

        let samples = demultiplex(&frames, &CAR_DATA_TABLE);
        assert_eq!(samples.len(), 2);

        let lewis = samples.iter().find(|s| s.driver == "44").unwrap();
        assert_eq!(lewis.time, Duration::from_millis(61_250));
        assert_eq!(
            lewis.date,
            Some(
                Utc.with_ymd_and_hms(2021, 3, 28, 15, 3, 57).unwrap()
                    + chrono::Duration::milliseconds(352)
            )
        );
        assert_eq!(lewis.channel("RPM"), Some(&json!(11021)));
        assert_eq!(lewis.channel("DRS"), Some(&json!(12)));

        let max = samples.iter().find(|s| s.driver == "33").unwrap();
        assert_eq!(max.channel("Speed"), Some(&json!(285)));
        assert_eq!(max.channels.get("nGear"), Some(&Value::Null));
    }

    #[test]
    fn position_records_are_flat() {
        let frames = [Frame::new(
            Duration::from_secs(90),
            "position",
            json!({"Position": [
                {"Timestamp": "2021-03-28T15:04:00.100Z", "Entries": {
                    "1": {"Status": "OnTrack", "X": -1234, "Y": 456, "Z": 78}
                }},
                {"Timestamp": "2021-03-28T15:04:00.400Z", "Entries": {
                    "1": {"Status": "OnTrack", "X": -1200, "Y": 460, "Z": 78}
                }}
            ]}),
        )];

        let samples = demultiplex(&frames, &POSITION_TABLE);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].channel("X"), Some(&json!(-1200)));
        assert_eq!(samples[0].channel("Status"), Some(&json!("OnTrack")));
        assert!(samples[0].date < samples[1].date);
    }

    #[test]
    fn bad_date_keeps_the_sample() {
        let frames = [Frame::new(
            Duration::from_secs(1),
            "position",
            json!({"Position": [{"Timestamp": "yesterday", "Entries": {"5": {"X": 1}}}]}),
        )];
        let samples = demultiplex(&frames, &POSITION_TABLE);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].date, None);
        assert_eq!(samples[0].channel("Y"), None);
    }

    #[test]
    fn raw_and_foreign_frames_are_skipped() {
        let frames = [
            Frame::new(Duration::from_secs(1), "car_data", json!("eJzLSM3JyQcABiwCFQ==")),
            Frame::new(Duration::from_secs(2), "car_data", json!({"Other": []})),
        ];
        assert!(demultiplex(&frames, &CAR_DATA_TABLE).is_empty());
    }

    #[test]
    fn sample_columns_follow_code_order() {
        let frames = [Frame::new(
            Duration::from_secs(3),
            "car_data",
            json!({"Entries": [{"Utc": "2021-03-28T15:00:00Z", "Cars": {"7": {"Channels": {}}}}]}),
        )];
        let samples = demultiplex(&frames, &CAR_DATA_TABLE);
        let row = serde_json::to_value(&samples[0]).unwrap();
        let columns: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec!["Time", "Date", "Driver", "RPM", "Speed", "nGear", "Throttle", "Brake", "DRS"]
        );
    }
}
