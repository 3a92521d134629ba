//! Timing reconstruction from decoded live-timing frames.
//!
//! Each component is an independent, strictly sequential pass over the
//! frames of one channel:
//! - [`laps`]: per-driver lap records from `TimingData`
//! - [`gaps`]: position and gap time series from `TimingData`
//! - [`stints`]: tyre stints from `TimingAppData`
//! - [`telemetry`]: car telemetry and position samples
//! - [`summary`]: laps joined with stints
//!
//! [`Session`] wires the passes to a [`lapwire_source::FeedSource`] and an
//! optional [`lapwire_source::TableCache`].

pub mod config;
pub mod error;
pub mod gaps;
pub mod laps;
pub mod session;
pub mod stints;
pub mod summary;
pub mod telemetry;
pub mod wire;

pub use config::{ReconstructConfig, SessionConfig, DEFAULT_GRACE_WINDOW};
pub use error::{Result, TimingError};
pub use gaps::{build_gaps, GapSample, GapStreamBuilder};
pub use laps::{correct_pit_stops, reconstruct_laps, LapReconstructor, LapRecord, SpeedTraps};
pub use session::{channel, Session};
pub use stints::{extract_stints, SchemaDrift, StintExtractor, StintTable, TyreStint};
pub use summary::{assemble, FinalLapRow};
pub use telemetry::{demultiplex, ChannelTable, TelemetrySample, CAR_DATA_TABLE, POSITION_TABLE};
