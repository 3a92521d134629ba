//! Tyre stint rows from `TimingAppData`.
//!
//! Each update of a driver's `Stints` collection becomes one row per entry,
//! stamped with the frame time. Rows are deliberately not merged: the
//! summary join relies on seeing when a compound was first logged.

use std::time::Duration;

use lapwire_frame::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::{self, field, indexed};

const RECOGNIZED: [&str; 10] = [
    "LapNumber",
    "LapTime",
    "TotalLaps",
    "Compound",
    "New",
    "TyresNotChanged",
    "LapFlags",
    "LapCountTime",
    "StartLaps",
    "Outlap",
];

// Carried by the frame or the entry position instead.
const IMPLIED: [&str; 3] = ["Time", "Driver", "Stint"];

/// One logged update of one tyre stint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TyreStint {
    #[serde(with = "wire::secs")]
    pub time: Duration,
    pub driver: String,
    /// Zero-based stint index within the session.
    pub stint: u32,
    pub lap_number: Option<u32>,
    #[serde(with = "wire::opt_secs")]
    pub lap_time: Option<Duration>,
    /// Laps already on the tyre set when the stint started.
    pub total_laps: Option<u32>,
    pub compound: Option<String>,
    pub new: Option<bool>,
    pub tyres_not_changed: Option<bool>,
    pub lap_flags: Option<u32>,
    pub lap_count_time: Option<String>,
    pub start_laps: Option<u32>,
    pub outlap: Option<bool>,
}

/// A stint field the extractor does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDrift {
    pub time: Duration,
    pub driver: String,
    pub field: String,
}

/// Extracted stint rows plus any unknown fields seen on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StintTable {
    pub rows: Vec<TyreStint>,
    pub drift: Vec<SchemaDrift>,
}

/// Incremental stint extraction over a `TimingAppData` frame sequence.
#[derive(Debug, Default)]
pub struct StintExtractor {
    table: StintTable,
}

impl StintExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: &Frame) {
        let Some(lines) = frame.payload.get("Lines").and_then(Value::as_object) else {
            return;
        };
        for (driver, block) in lines {
            let Some(stints) = block.get("Stints") else {
                continue;
            };
            for (index, entry) in indexed(stints) {
                let Some(fields) = entry.as_object() else {
                    tracing::warn!(driver = %driver, index, "stint entry is not an object");
                    continue;
                };
                for key in fields.keys() {
                    if !RECOGNIZED.contains(&key.as_str()) && !IMPLIED.contains(&key.as_str()) {
                        tracing::warn!(driver = %driver, field = %key, "unknown stint field");
                        self.table.drift.push(SchemaDrift {
                            time: frame.timestamp,
                            driver: driver.clone(),
                            field: key.clone(),
                        });
                    }
                }
                self.table
                    .rows
                    .push(stint_row(frame.timestamp, driver, index, entry));
            }
        }
    }

    pub fn finish(self) -> StintTable {
        tracing::debug!(
            rows = self.table.rows.len(),
            drift = self.table.drift.len(),
            "stint extraction finished"
        );
        self.table
    }
}

fn stint_row(time: Duration, driver: &str, index: usize, entry: &Value) -> TyreStint {
    let get = |key: &str| field(entry, key).value();
    TyreStint {
        time,
        driver: driver.to_string(),
        stint: u32::try_from(index).unwrap_or(u32::MAX),
        lap_number: get("LapNumber").and_then(wire::as_u32),
        lap_time: get("LapTime").and_then(wire::as_duration),
        total_laps: get("TotalLaps").and_then(wire::as_u32),
        compound: get("Compound").and_then(wire::as_text),
        new: get("New").and_then(wire::as_bool),
        tyres_not_changed: get("TyresNotChanged").and_then(wire::as_bool),
        lap_flags: get("LapFlags").and_then(wire::as_u32),
        lap_count_time: get("LapCountTime").and_then(wire::as_text),
        start_laps: get("StartLaps").and_then(wire::as_u32),
        outlap: get("Outlap").and_then(wire::as_bool),
    }
}

/// Extract all stint rows of a `TimingAppData` frame sequence.
pub fn extract_stints(frames: &[Frame]) -> StintTable {
    let mut extractor = StintExtractor::new();
    for frame in frames {
        extractor.push(frame);
    }
    extractor.finish()
}
