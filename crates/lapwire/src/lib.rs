//! Decoder and timing reconstruction for recorded live-timing sessions.
//!
//! A session capture is a set of channel files, most of them line-oriented
//! streams of `HH:MM:SS.mmm<payload>` records. lapwire splits and decodes
//! those records and rebuilds the tables a timing screen shows: laps with
//! sector and speed trap data, position and gap history, tyre stints, car
//! telemetry and track positions, and a per-lap summary with tyre life.
//!
//! # Crate Structure
//!
//! - [`frame`]: Record splitting, payload decoding, channel catalog
//! - [`source`]: Capture sources and table caches
//! - [`timing`]: Reconstruction passes and the [`timing::Session`] facade

/// Re-export frame types.
pub mod frame {
    pub use lapwire_frame::*;
}

/// Re-export source and cache types.
pub mod source {
    pub use lapwire_source::*;
}

/// Re-export reconstruction types.
pub mod timing {
    pub use lapwire_timing::*;
}
