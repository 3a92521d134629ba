//! Lap table joined with tyre information.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::laps::LapRecord;
use crate::stints::TyreStint;

/// A lap with the tyre it was driven on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalLapRow {
    #[serde(flatten)]
    pub lap: LapRecord,
    /// One-based stint number: pit stops before the lap plus one.
    #[serde(rename = "Stint")]
    pub stint: u32,
    #[serde(rename = "Compound")]
    pub compound: Option<String>,
    /// Laps on the tyre set at the end of this lap.
    #[serde(rename = "TyreLife")]
    pub tyre_life: Option<u32>,
    #[serde(rename = "FreshTyre")]
    pub fresh_tyre: Option<bool>,
}

fn join_key(lap: &LapRecord) -> Option<Duration> {
    lap.lap_start_time.or(lap.time)
}

/// Attach to every lap the latest stint row with a compound logged at or
/// before the lap start.
///
/// Tyre life counts laps within each matched stint row, starting from the
/// laps the set already had. Laps with no usable time or no earlier stint
/// row keep empty tyre columns. Output is grouped by driver and ordered by
/// lap start.
pub fn assemble(laps: &[LapRecord], stints: &[TyreStint]) -> Vec<FinalLapRow> {
    let mut by_driver: BTreeMap<&str, (Vec<&LapRecord>, Vec<&TyreStint>)> = BTreeMap::new();
    for lap in laps {
        by_driver.entry(lap.driver.as_str()).or_default().0.push(lap);
    }
    for stint in stints.iter().filter(|stint| stint.compound.is_some()) {
        if let Some((_, rows)) = by_driver.get_mut(stint.driver.as_str()) {
            rows.push(stint);
        }
    }

    let mut rows = Vec::with_capacity(laps.len());
    for (_, (mut driver_laps, mut driver_stints)) in by_driver {
        driver_laps.sort_by_key(|lap| (join_key(lap).is_none(), join_key(lap)));
        driver_stints.sort_by_key(|stint| stint.time);

        let mut laps_on_set: HashMap<usize, u32> = HashMap::new();
        for lap in driver_laps {
            let matched = join_key(lap).and_then(|key| {
                driver_stints
                    .partition_point(|stint| stint.time <= key)
                    .checked_sub(1)
            });

            let (compound, tyre_life, fresh_tyre) = match matched {
                Some(index) => {
                    let stint = driver_stints[index];
                    let count = laps_on_set.entry(index).or_insert(0);
                    *count += 1;
                    (
                        stint.compound.clone(),
                        Some(stint.total_laps.unwrap_or(0) + *count),
                        stint.new,
                    )
                }
                None => (None, None, None),
            };

            rows.push(FinalLapRow {
                lap: lap.clone(),
                stint: lap.pit_stop_count + 1,
                compound,
                tyre_life,
                fresh_tyre,
            });
        }
    }
    tracing::debug!(rows = rows.len(), "summary assembled");
    rows
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn lap(driver: &str, start: u64) -> LapRecord {
        LapRecord {
            driver: driver.into(),
            lap_start_time: Some(Duration::from_secs(start)),
            time: Some(Duration::from_secs(start + 9)),
            ..LapRecord::default()
        }
    }

    fn stint(driver: &str, at: u64, compound: Option<&str>, total_laps: Option<u32>) -> TyreStint {
        TyreStint {
            time: Duration::from_secs(at),
            driver: driver.into(),
            stint: 0,
            lap_number: None,
            lap_time: None,
            total_laps,
            compound: compound.map(str::to_string),
            new: Some(true),
            tyres_not_changed: None,
            lap_flags: None,
            lap_count_time: None,
            start_laps: None,
            outlap: None,
        }
    }

    #[test]
    fn tyre_life_counts_within_matched_stint() {
        let laps: Vec<LapRecord> = [10, 20, 30, 40].iter().map(|s| lap("44", *s)).collect();
        let stints = [
            stint("44", 5, Some("SOFT"), Some(0)),
            stint("44", 25, Some("HARD"), Some(0)),
        ];

        let rows = assemble(&laps, &stints);
        let life: Vec<Option<u32>> = rows.iter().map(|row| row.tyre_life).collect();
        assert_eq!(life, vec![Some(1), Some(2), Some(1), Some(2)]);
        let compounds: Vec<Option<&str>> = rows.iter().map(|row| row.compound.as_deref()).collect();
        assert_eq!(compounds, vec![Some("SOFT"), Some("SOFT"), Some("HARD"), Some("HARD")]);
    }

    #[test]
    fn used_set_seeds_tyre_life() {
        let rows = assemble(
            &[lap("1", 100), lap("1", 190)],
            &[stint("1", 50, Some("MEDIUM"), Some(3))],
        );
        assert_eq!(rows[0].tyre_life, Some(4));
        assert_eq!(rows[1].tyre_life, Some(5));
    }

    #[test]
    fn rows_without_compound_are_not_joined() {
        let rows = assemble(
            &[lap("16", 100)],
            &[
                stint("16", 10, Some("SOFT"), None),
                stint("16", 60, None, Some(9)),
            ],
        );
        assert_eq!(rows[0].compound.as_deref(), Some("SOFT"));
        assert_eq!(rows[0].tyre_life, Some(1));
    }

    #[test]
    fn unmatched_and_keyless_laps_have_empty_tyre_columns() {
        let keyless = LapRecord {
            driver: "4".into(),
            ..LapRecord::default()
        };
        let rows = assemble(
            &[keyless, lap("4", 10)],
            &[stint("4", 20, Some("SOFT"), Some(0)), stint("55", 1, Some("HARD"), Some(0))],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].lap.lap_start_time, Some(Duration::from_secs(10)));
        assert_eq!(rows[0].compound, None);
        assert_eq!(rows[1].lap.time, None);
        assert_eq!(rows[1].tyre_life, None);
    }

    #[test]
    fn stint_number_follows_pit_stops() {
        let mut second = lap("63", 200);
        second.pit_stop_count = 1;
        let rows = assemble(&[lap("63", 100), second], &[]);
        let stints: Vec<u32> = rows.iter().map(|row| row.stint).collect();
        assert_eq!(stints, vec![1, 2]);
    }

    #[test]
    fn summary_columns_extend_lap_columns() {
        let rows = assemble(&[lap("44", 10)], &[stint("44", 5, Some("SOFT"), Some(0))]);
        let row = serde_json::to_value(&rows[0]).unwrap();
        let object = row.as_object().unwrap();

        let columns: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(columns[0], "Time");
        assert_eq!(&columns[columns.len() - 4..], ["Stint", "Compound", "TyreLife", "FreshTyre"]);
        assert_eq!(object["LapStartTime"], json!(10.0));
        assert_eq!(object["FreshTyre"], json!(true));
    }
}
