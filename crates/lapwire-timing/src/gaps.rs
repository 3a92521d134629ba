//! Position and gap time series from `TimingData`.

use std::collections::BTreeMap;
use std::time::Duration;

use lapwire_frame::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::{self, field, value_field, Field};

/// One change of a driver's position or gap signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GapSample {
    #[serde(with = "wire::secs")]
    pub time: Duration,
    pub driver: String,
    pub position: Option<u32>,
    pub gap_to_leader: Option<String>,
    pub interval_to_position_ahead: Option<String>,
}

/// Incremental gap stream over a `TimingData` frame sequence.
///
/// Fields missing from an update keep the driver's last known value.
#[derive(Debug, Default)]
pub struct GapStreamBuilder {
    drivers: BTreeMap<String, Vec<GapSample>>,
}

impl GapStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next frame. Frames must arrive in timestamp order.
    pub fn push(&mut self, frame: &Frame) {
        let Some(lines) = frame.payload.get("Lines").and_then(Value::as_object) else {
            return;
        };
        for (driver, block) in lines {
            let position = field(block, "Position");
            let gap = field(block, "GapToLeader");
            let interval = value_field(block, "IntervalToPositionAhead");
            if position.is_absent() && gap.is_absent() && interval.is_absent() {
                continue;
            }

            let rows = self.drivers.entry(driver.clone()).or_default();
            let last = rows.last();
            let sample = GapSample {
                time: frame.timestamp,
                driver: driver.clone(),
                position: update(position, last.and_then(|row| row.position), wire::as_u32),
                gap_to_leader: update_text(
                    block.get("GapToLeader"),
                    last.and_then(|row| row.gap_to_leader.clone()),
                ),
                interval_to_position_ahead: update_text(
                    block
                        .get("IntervalToPositionAhead")
                        .and_then(|interval| interval.get("Value")),
                    last.and_then(|row| row.interval_to_position_ahead.clone()),
                ),
            };
            rows.push(sample);
        }
    }

    /// All samples, grouped by driver, in time order within each driver.
    pub fn finish(self) -> Vec<GapSample> {
        let samples: Vec<GapSample> = self.drivers.into_values().flatten().collect();
        tracing::debug!(samples = samples.len(), "gap stream finished");
        samples
    }
}

fn update<T>(field: Field<'_>, last: Option<T>, parse: fn(&Value) -> Option<T>) -> Option<T> {
    match field {
        Field::Absent => last,
        Field::Empty => None,
        Field::Present(value) => parse(value),
    }
}

// Gap strings are kept verbatim, so an empty string stays distinct from null.
fn update_text(raw: Option<&Value>, last: Option<String>) -> Option<String> {
    match raw {
        None => last,
        Some(value) => wire::as_text(value),
    }
}

/// Build the gap stream of a `TimingData` frame sequence.
pub fn build_gaps(frames: &[Frame]) -> Vec<GapSample> {
    let mut builder = GapStreamBuilder::new();
    for frame in frames {
        builder.push(frame);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn frame(ms: u64, lines: Value) -> Frame {
        Frame::new(Duration::from_millis(ms), "timing_data", json!({ "Lines": lines }))
    }

    #[test]
    fn carries_last_known_values_forward() {
        let samples = build_gaps(&[
            frame(1_000, json!({"44": {"Position": "3"}})),
            frame(2_000, json!({"44": {"GapToLeader": "+1.204"}})),
            frame(3_000, json!({"44": {"IntervalToPositionAhead": {"Value": "+0.402"}}})),
            frame(4_000, json!({"44": {"Position": 2}})),
        ]);

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].gap_to_leader, None);
        assert_eq!(samples[1].position, Some(3));
        assert_eq!(samples[1].gap_to_leader.as_deref(), Some("+1.204"));
        assert_eq!(samples[2].position, Some(3));
        assert_eq!(samples[2].interval_to_position_ahead.as_deref(), Some("+0.402"));
        assert_eq!(
            samples[3],
            GapSample {
                time: Duration::from_millis(4_000),
                driver: "44".into(),
                position: Some(2),
                gap_to_leader: Some("+1.204".into()),
                interval_to_position_ahead: Some("+0.402".into()),
            }
        );
    }

    #[test]
    fn unrelated_updates_emit_nothing() {
        let samples = build_gaps(&[
            frame(1_000, json!({"1": {"Sectors": {"0": {"Value": "30.1"}}}})),
            frame(2_000, json!({"1": {"IntervalToPositionAhead": {"Catching": true}}})),
            Frame::new(Duration::from_secs(3), "timing_data", json!({"Withheld": false})),
        ]);
        assert!(samples.is_empty());
    }

    #[test]
    fn empty_gap_strings_are_kept_verbatim() {
        let samples = build_gaps(&[
            frame(1_000, json!({"16": {"GapToLeader": "LAP 12", "Position": "2"}})),
            frame(
                2_000,
                json!({"16": {"Position": "1", "GapToLeader": "", "IntervalToPositionAhead": {"Value": ""}}}),
            ),
            frame(3_000, json!({"16": {"GapToLeader": null}})),
        ]);
        assert_eq!(samples[0].gap_to_leader.as_deref(), Some("LAP 12"));
        assert_eq!(samples[1].gap_to_leader.as_deref(), Some(""));
        assert_eq!(samples[1].interval_to_position_ahead.as_deref(), Some(""));
        assert_eq!(
            serde_json::to_value(&samples[1]).unwrap(),
            json!({
                "Time": 2.0,
                "Driver": "16",
                "Position": 1,
                "GapToLeader": "",
                "IntervalToPositionAhead": "",
            })
        );
        assert_eq!(samples[2].gap_to_leader, None);
        assert_eq!(samples[2].interval_to_position_ahead.as_deref(), Some(""));
    }

    #[test]
    fn drivers_are_grouped() {
        let samples = build_gaps(&[
            frame(1_000, json!({"44": {"Position": "1"}, "1": {"Position": "2"}})),
            frame(2_000, json!({"44": {"Position": "2"}, "1": {"Position": "1"}})),
        ]);
        let order: Vec<(&str, Option<u32>)> = samples
            .iter()
            .map(|sample| (sample.driver.as_str(), sample.position))
            .collect();
        assert_eq!(
            order,
            vec![("1", Some(2)), ("1", Some(1)), ("44", Some(1)), ("44", Some(2))]
        );
    }

    #[test]
    fn gap_table_columns() {
        let sample = GapSample {
            time: Duration::from_millis(1_500),
            driver: "4".into(),
            position: Some(7),
            gap_to_leader: None,
            interval_to_position_ahead: Some("+0.9".into()),
        };
        let row = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            row,
            json!({
                "Time": 1.5,
                "Driver": "4",
                "Position": 7,
                "GapToLeader": null,
                "IntervalToPositionAhead": "+0.9",
            })
        );
    }
}
