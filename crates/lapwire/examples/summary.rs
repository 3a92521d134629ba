//! Build the lap summary of a tiny in-memory session.
//!
//! Run with: `cargo run --example summary`

use lapwire::frame::{TIMING_APP_DATA, TIMING_DATA};
use lapwire::source::MemorySource;
use lapwire::timing::{Session, TimingError};

const TIMING: &str = concat!(
    "00:01:00.000{\"Lines\":{\"1\":{\"Sectors\":[{\"Value\":\"30.000\"}]}}}\r\n",
    "00:01:29.000{\"Lines\":{\"1\":{\"Sectors\":{\"1\":{\"Value\":\"29.000\"}}}}}\r\n",
    "00:02:00.000{\"Lines\":{\"1\":{\"Sectors\":{\"2\":{\"Value\":\"31.000\"}},\"NumberOfLaps\":1}}}\r\n",
    "00:02:00.800{\"Lines\":{\"1\":{\"LastLapTime\":{\"Value\":\"1:30.000\"},\"Speeds\":{\"ST\":{\"Value\":\"318\"}}}}}\r\n",
    "00:03:28.000{\"Lines\":{\"1\":{\"Sectors\":{\"0\":{\"Value\":\"28.100\"}}}}}\r\n",
);

const TIMING_APP: &str =
    "00:00:05.000{\"Lines\":{\"1\":{\"Stints\":[{\"Compound\":\"MEDIUM\",\"New\":\"true\",\"TotalLaps\":0}]}}}\r\n";

fn main() -> Result<(), TimingError> {
    let source = MemorySource::new()
        .with_channel(&TIMING_DATA, TIMING)
        .with_channel(&TIMING_APP_DATA, TIMING_APP);
    let session = Session::new("demo", source);

    for row in session.summary()? {
        println!(
            "driver {} lap {:?}: start {:?} lap time {:?} speed trap {:?} on {} (life {:?})",
            row.lap.driver,
            row.lap.number_of_laps,
            row.lap.lap_start_time,
            row.lap.last_lap_time,
            row.lap.speed_traps.get("ST"),
            row.compound.as_deref().unwrap_or("?"),
            row.tyre_life,
        );
    }
    Ok(())
}
