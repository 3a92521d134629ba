//! Channel catalog.
//!
//! Every live-timing feed is published under a fixed endpoint suffix. The
//! suffix alone decides how the body is framed: `jsonStream` endpoints are
//! clock-prefixed record streams, and `.z.` endpoints carry compressed
//! payloads.

/// Static description of one live-timing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Logical channel name.
    pub name: &'static str,
    /// File name appended to the session path.
    pub endpoint_suffix: &'static str,
    /// Body is a clock-prefixed record stream.
    pub is_stream: bool,
    /// Payloads are base64 + raw deflate.
    pub is_compressed: bool,
}

impl ChannelSpec {
    /// Build a spec, deriving the framing flags from the endpoint suffix.
    pub const fn new(name: &'static str, endpoint_suffix: &'static str) -> Self {
        Self {
            name,
            endpoint_suffix,
            is_stream: contains(endpoint_suffix.as_bytes(), b"jsonStream"),
            is_compressed: contains(endpoint_suffix.as_bytes(), b".z."),
        }
    }
}

/// Lap, sector and gap updates.
pub const TIMING_DATA: ChannelSpec = ChannelSpec::new("timing_data", "TimingData.jsonStream");

/// Tyre stints.
pub const TIMING_APP_DATA: ChannelSpec =
    ChannelSpec::new("timing_app_data", "TimingAppData.jsonStream");

/// High-rate car telemetry.
pub const CAR_DATA: ChannelSpec = ChannelSpec::new("car_data", "CarData.z.jsonStream");

/// High-rate car coordinates.
pub const POSITION: ChannelSpec = ChannelSpec::new("position", "Position.z.jsonStream");

/// All known channels.
pub const CATALOG: &[ChannelSpec] = &[
    ChannelSpec::new("session_info", "SessionInfo.json"),
    ChannelSpec::new("archive_status", "ArchiveStatus.json"),
    ChannelSpec::new("heartbeat", "Heartbeat.jsonStream"),
    ChannelSpec::new("audio_streams", "AudioStreams.jsonStream"),
    ChannelSpec::new("driver_list", "DriverList.jsonStream"),
    ChannelSpec::new("extrapolated_clock", "ExtrapolatedClock.jsonStream"),
    ChannelSpec::new("race_control_messages", "RaceControlMessages.json"),
    ChannelSpec::new("session_status", "SessionStatus.jsonStream"),
    ChannelSpec::new("team_radio", "TeamRadio.jsonStream"),
    TIMING_APP_DATA,
    ChannelSpec::new("timing_stats", "TimingStats.jsonStream"),
    ChannelSpec::new("track_status", "TrackStatus.jsonStream"),
    ChannelSpec::new("weather_data", "WeatherData.jsonStream"),
    POSITION,
    CAR_DATA,
    ChannelSpec::new("content_streams", "ContentStreams.jsonStream"),
    TIMING_DATA,
    ChannelSpec::new("lap_count", "LapCount.jsonStream"),
    ChannelSpec::new("championship_prediction", "ChampionshipPrediction.jsonStream"),
];

/// Look up a channel by logical name.
pub fn lookup(name: &str) -> Option<&'static ChannelSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

const fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        let mut i = 0;
        while i < needle.len() && haystack[start + i] == needle[i] {
            i += 1;
        }
        if i == needle.len() {
            return true;
        }
        start += 1;
    }
    false
}
