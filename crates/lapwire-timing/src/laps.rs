//! Per-driver lap assembly from `TimingData` frames.
//!
//! Lap fields trickle in over several packets and the packet that closes a
//! lap (`NumberOfLaps`) usually arrives before the last fields of that lap.
//! Every driver therefore keeps two writable laps: the `open` one and the
//! `previous` one, which still accepts updates for a short grace window
//! after its last update.
//!
//! Lap start times are not transmitted. They are inferred from sector
//! times: each sector boundary gives a candidate start (`arrival - elapsed
//! sector time`) and, since transmission delay only ever makes a candidate
//! late, the earliest candidate wins. `LastLapTime` freezes the estimate.

use std::collections::BTreeMap;
use std::time::Duration;

use lapwire_frame::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ReconstructConfig;
use crate::wire::{self, field, indexed, value_field, Field};

/// Speed trap names, in column order.
pub const KNOWN_TRAPS: [&str; 4] = ["I1", "I2", "FL", "ST"];

/// Speeds measured at the known traps of a lap, in km/h.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedTraps {
    speeds: [Option<f64>; 4],
}

impl SpeedTraps {
    /// Speed at a trap; `None` when unset or the trap is unknown.
    pub fn get(&self, trap: &str) -> Option<f64> {
        trap_index(trap).and_then(|i| self.speeds[i])
    }

    /// Set a trap speed. Returns `false` when the trap is unknown.
    pub fn set(&mut self, trap: &str, speed: Option<f64>) -> bool {
        match trap_index(trap) {
            Some(i) => {
                self.speeds[i] = speed;
                true
            }
            None => false,
        }
    }

    /// `(trap, speed)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> + '_ {
        KNOWN_TRAPS.iter().copied().zip(self.speeds.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.speeds.iter().all(Option::is_none)
    }
}

fn trap_index(trap: &str) -> Option<usize> {
    KNOWN_TRAPS.iter().position(|known| *known == trap)
}

/// One finalized lap of one driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "LapRow", into = "LapRow")]
pub struct LapRecord {
    /// Last known timestamp of the lap; the lap end once locked.
    pub time: Option<Duration>,
    pub driver: String,
    /// Inferred session time at which the lap started.
    pub lap_start_time: Option<Duration>,
    pub last_lap_time: Option<Duration>,
    pub number_of_laps: Option<u32>,
    /// Stops completed before this lap started.
    pub pit_stop_count: u32,
    pub pit_out_time: Option<Duration>,
    pub pit_in_time: Option<Duration>,
    pub sector_times: [Option<Duration>; 3],
    pub speed_traps: SpeedTraps,
}

impl LapRecord {
    fn empty(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            ..Self::default()
        }
    }
}

// Column layout of the laps table.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LapRow {
    #[serde(with = "wire::opt_secs")]
    time: Option<Duration>,
    driver: String,
    #[serde(with = "wire::opt_secs")]
    lap_start_time: Option<Duration>,
    #[serde(with = "wire::opt_secs")]
    last_lap_time: Option<Duration>,
    number_of_laps: Option<u32>,
    number_of_pit_stops: u32,
    #[serde(with = "wire::opt_secs")]
    pit_out_time: Option<Duration>,
    #[serde(with = "wire::opt_secs")]
    pit_in_time: Option<Duration>,
    #[serde(with = "wire::opt_secs")]
    sector1_time: Option<Duration>,
    #[serde(with = "wire::opt_secs")]
    sector2_time: Option<Duration>,
    #[serde(with = "wire::opt_secs")]
    sector3_time: Option<Duration>,
    #[serde(rename = "SpeedI1")]
    speed_i1: Option<f64>,
    #[serde(rename = "SpeedI2")]
    speed_i2: Option<f64>,
    #[serde(rename = "SpeedFL")]
    speed_fl: Option<f64>,
    #[serde(rename = "SpeedST")]
    speed_st: Option<f64>,
}

impl From<LapRecord> for LapRow {
    fn from(lap: LapRecord) -> Self {
        let [sector1_time, sector2_time, sector3_time] = lap.sector_times;
        let [speed_i1, speed_i2, speed_fl, speed_st] = lap.speed_traps.speeds;
        Self {
            time: lap.time,
            driver: lap.driver,
            lap_start_time: lap.lap_start_time,
            last_lap_time: lap.last_lap_time,
            number_of_laps: lap.number_of_laps,
            number_of_pit_stops: lap.pit_stop_count,
            pit_out_time: lap.pit_out_time,
            pit_in_time: lap.pit_in_time,
            sector1_time,
            sector2_time,
            sector3_time,
            speed_i1,
            speed_i2,
            speed_fl,
            speed_st,
        }
    }
}

impl From<LapRow> for LapRecord {
    fn from(row: LapRow) -> Self {
        Self {
            time: row.time,
            driver: row.driver,
            lap_start_time: row.lap_start_time,
            last_lap_time: row.last_lap_time,
            number_of_laps: row.number_of_laps,
            pit_stop_count: row.number_of_pit_stops,
            pit_out_time: row.pit_out_time,
            pit_in_time: row.pit_in_time,
            sector_times: [row.sector1_time, row.sector2_time, row.sector3_time],
            speed_traps: SpeedTraps {
                speeds: [row.speed_i1, row.speed_i2, row.speed_fl, row.speed_st],
            },
        }
    }
}

/// Best known lap start: `base - delta`, where `base` is the arrival time
/// of a sector boundary and `delta` the lap time elapsed at that boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimeReference {
    base: Duration,
    delta: Duration,
    ts0: Duration,
    ts1: Option<Duration>,
}

impl TimeReference {
    fn start(&self) -> Duration {
        self.base.saturating_sub(self.delta)
    }

    fn adopt_if_earlier(&mut self, arrival: Duration, delta: Duration) {
        if arrival.saturating_sub(delta) < self.start() {
            self.base = arrival;
            self.delta = delta;
        }
    }
}

/// A lap still accepting updates.
#[derive(Debug, Clone)]
struct LapDraft {
    record: LapRecord,
    raw_pit_stops: Option<u32>,
    reference: Option<TimeReference>,
    locked: bool,
}

impl LapDraft {
    fn new(driver: &str) -> Self {
        Self {
            record: LapRecord::empty(driver),
            raw_pit_stops: None,
            reference: None,
            locked: false,
        }
    }

    /// True when nothing but bookkeeping fields was ever set.
    fn is_empty(&self) -> bool {
        let lap = &self.record;
        lap.last_lap_time.is_none()
            && lap.number_of_laps.is_none()
            && self.raw_pit_stops.is_none()
            && lap.pit_out_time.is_none()
            && lap.pit_in_time.is_none()
            && lap.sector_times.iter().all(Option::is_none)
            && lap.speed_traps.is_empty()
    }

    fn apply(&mut self, at: Duration, block: &Value) {
        if !self.locked {
            self.record.time = Some(at);
        }

        if let Some(count) = field(block, "NumberOfPitStops").value().and_then(wire::as_u32) {
            self.raw_pit_stops = Some(count);
        }

        if let Some(sectors) = block.get("Sectors") {
            for (index, sector) in indexed(sectors) {
                let Some(elapsed) = field(sector, "Value").value().and_then(wire::as_duration)
                else {
                    continue;
                };
                if index >= self.record.sector_times.len() {
                    tracing::warn!(
                        driver = %self.record.driver,
                        index,
                        "sector index out of range"
                    );
                    continue;
                }
                self.record.sector_times[index] = Some(elapsed);
                if !self.locked {
                    self.refine_start(at, index, elapsed);
                }
            }
        }

        if let Some(speeds) = block.get("Speeds").and_then(Value::as_object) {
            for (trap, entry) in speeds {
                let Some(speed) = field(entry, "Value").value().and_then(wire::as_f64) else {
                    continue;
                };
                if !self.record.speed_traps.set(trap, Some(speed)) {
                    tracing::warn!(
                        driver = %self.record.driver,
                        trap = %trap,
                        "unknown speed trap"
                    );
                }
            }
        }

        if let Field::Present(flag) = field(block, "PitOut") {
            if wire::as_bool(flag) == Some(false) {
                self.record.pit_out_time = Some(at);
            }
        }
        if let Field::Present(flag) = field(block, "InPit") {
            if wire::as_bool(flag) == Some(true) {
                self.record.pit_in_time = Some(at);
            }
        }

        if let Some(lap_time) = value_field(block, "LastLapTime")
            .value()
            .and_then(wire::as_duration)
        {
            self.record.last_lap_time = Some(lap_time);
            if let Some(reference) = self.reference {
                let start = reference.start();
                self.record.lap_start_time = Some(start);
                self.record.time = Some(start + lap_time);
                self.locked = true;
            }
        }
    }

    fn refine_start(&mut self, at: Duration, index: usize, elapsed: Duration) {
        if let Some(reference) = self.reference.as_mut() {
            match index {
                1 => {
                    reference.adopt_if_earlier(at, elapsed + reference.ts0);
                    reference.ts1 = Some(elapsed);
                }
                2 => {
                    if let Some(ts1) = reference.ts1 {
                        reference.adopt_if_earlier(at, elapsed + ts1 + reference.ts0);
                    }
                }
                _ => {}
            }
        } else if index == 0 {
            self.reference = Some(TimeReference {
                base: at,
                delta: elapsed,
                ts0: elapsed,
                ts1: None,
            });
        }

        if let Some(reference) = self.reference {
            self.record.lap_start_time = Some(reference.start());
        }
    }
}

/// Reconstruction state of one driver.
#[derive(Debug)]
struct DriverLaps {
    driver: String,
    closed: Vec<LapDraft>,
    previous: Option<LapDraft>,
    open: LapDraft,
}

impl DriverLaps {
    fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            closed: Vec::new(),
            previous: None,
            open: LapDraft::new(driver),
        }
    }

    fn push(&mut self, at: Duration, block: &Value, grace_window: Duration) {
        let target = match self.previous.as_mut() {
            Some(previous)
                if previous
                    .record
                    .time
                    .is_some_and(|last| at < last + grace_window) =>
            {
                previous
            }
            _ => &mut self.open,
        };
        target.apply(at, block);

        if !field(block, "NumberOfLaps").is_absent() {
            self.open.record.number_of_laps =
                field(block, "NumberOfLaps").value().and_then(wire::as_u32);
            self.promote();
        }
    }

    /// open -> previous -> closed, then open a fresh lap.
    fn promote(&mut self) {
        let finished = std::mem::replace(&mut self.open, LapDraft::new(&self.driver));
        if let Some(previous) = self.previous.replace(finished) {
            self.closed.push(previous);
        }
    }

    fn finish(self) -> Vec<LapRecord> {
        let mut drafts = self.closed;
        drafts.extend(self.previous);
        drafts.push(self.open);

        if drafts.last().is_some_and(LapDraft::is_empty) {
            drafts.pop();
        }

        let raw: Vec<Option<u32>> = drafts.iter().map(|draft| draft.raw_pit_stops).collect();
        drafts
            .into_iter()
            .zip(correct_pit_stops(&raw))
            .map(|(draft, pit_stops)| LapRecord {
                pit_stop_count: pit_stops,
                ..draft.record
            })
            .collect()
    }
}

/// Attribute pit stops to the lap after the one where they were logged.
///
/// `raw` holds the count logged during each lap, if any. Walking backwards
/// from the highest count, every lap whose logged count rose above the
/// previously logged one is a boundary: it and all earlier laps get the
/// count from before the rise. The first lap therefore always ends at 0.
pub fn correct_pit_stops(raw: &[Option<u32>]) -> Vec<u32> {
    let mut before_rise = vec![None; raw.len()];
    let mut highest = 0;
    for (lap, count) in raw.iter().enumerate() {
        if let Some(count) = *count {
            if count > highest {
                before_rise[lap] = Some(highest);
                highest = count;
            }
        }
    }

    let mut current = highest;
    let mut corrected = vec![0; raw.len()];
    for lap in (0..raw.len()).rev() {
        if let Some(count) = before_rise[lap] {
            current = count;
        }
        corrected[lap] = current;
    }
    corrected
}

/// Incremental lap reconstruction over a `TimingData` frame sequence.
#[derive(Debug, Default)]
pub struct LapReconstructor {
    config: ReconstructConfig,
    drivers: BTreeMap<String, DriverLaps>,
}

impl LapReconstructor {
    pub fn new(config: ReconstructConfig) -> Self {
        Self {
            config,
            drivers: BTreeMap::new(),
        }
    }

    /// Feed the next frame. Frames must arrive in timestamp order.
    pub fn push(&mut self, frame: &Frame) {
        let Some(lines) = frame.payload.get("Lines").and_then(Value::as_object) else {
            return;
        };
        for (driver, block) in lines {
            self.drivers
                .entry(driver.clone())
                .or_insert_with(|| DriverLaps::new(driver))
                .push(frame.timestamp, block, self.config.grace_window);
        }
    }

    /// Finalize all drivers: laps grouped by driver, in lap order.
    pub fn finish(self) -> Vec<LapRecord> {
        let laps: Vec<LapRecord> = self
            .drivers
            .into_values()
            .flat_map(DriverLaps::finish)
            .collect();
        tracing::debug!(laps = laps.len(), "lap reconstruction finished");
        laps
    }
}

/// Reconstruct all laps of a `TimingData` frame sequence.
pub fn reconstruct_laps(frames: &[Frame], config: ReconstructConfig) -> Vec<LapRecord> {
    let mut reconstructor = LapReconstructor::new(config);
    for frame in frames {
        reconstructor.push(frame);
    }
    reconstructor.finish()
}
