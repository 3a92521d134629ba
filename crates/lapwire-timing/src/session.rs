//! One recorded session: a feed source, an optional table cache, and the
//! reconstruction passes wired to both.

use bytes::Bytes;
use lapwire_frame::{
    decode_response, decode_stream, lookup, ChannelSpec, Decoded, Frame, CAR_DATA, POSITION,
    TIMING_APP_DATA, TIMING_DATA,
};
use lapwire_source::{cache_key, FeedSource, TableCache};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::{Result, TimingError};
use crate::gaps::{GapSample, GapStreamBuilder};
use crate::laps::{LapReconstructor, LapRecord};
use crate::stints::{extract_stints, StintTable, TyreStint};
use crate::summary::{assemble, FinalLapRow};
use crate::telemetry::{demultiplex, ChannelTable, TelemetrySample, CAR_DATA_TABLE, POSITION_TABLE};

const LAPS: &str = "laps";
const GAPS: &str = "gaps";
const STINTS: &str = "stints";
const SUMMARY: &str = "summary";

/// Resolve a channel name against the catalog.
pub fn channel(name: &str) -> Result<&'static ChannelSpec> {
    lookup(name).ok_or_else(|| TimingError::UnknownChannel(name.to_string()))
}

/// Tables of one recorded session.
///
/// Table operations consult the cache first, under `"{identity}/{table}"`,
/// and store what they build. Lap-derived tables carry the grace window in
/// their table name, so sessions with different windows never share them.
/// A cache that fails to load or store is logged and bypassed.
pub struct Session<S> {
    identity: String,
    source: S,
    cache: Option<Box<dyn TableCache>>,
    config: SessionConfig,
}

impl<S: FeedSource> Session<S> {
    pub fn new(identity: impl Into<String>, source: S) -> Self {
        Self {
            identity: identity.into(),
            source,
            cache: None,
            config: SessionConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: impl TableCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Session identity, used as the cache key prefix.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetch and decode any catalog channel.
    pub fn decode(&self, name: &str) -> Result<Decoded> {
        let spec = channel(name)?;
        let body = self.fetch(spec)?;
        Ok(decode_response(&body, spec, self.config.frame.clone())?)
    }

    /// Fetch and decode a stream channel.
    pub fn frames(&self, name: &str) -> Result<Vec<Frame>> {
        let spec = channel(name)?;
        if !spec.is_stream {
            return Err(TimingError::NotAStream {
                channel: spec.name.to_string(),
            });
        }
        self.stream(spec)
    }

    /// Cache table name of a table built from reconstructed laps.
    fn lap_table(&self, table: &str) -> String {
        format!(
            "{table}@grace={}ms",
            self.config.reconstruct.grace_window.as_millis()
        )
    }

    fn fetch(&self, spec: &ChannelSpec) -> Result<Bytes> {
        tracing::info!(session = %self.identity, channel = spec.name, "fetching channel");
        Ok(self.source.fetch(spec)?)
    }

    fn stream(&self, spec: &ChannelSpec) -> Result<Vec<Frame>> {
        let body = self.fetch(spec)?;
        Ok(decode_stream(&body, spec, self.config.frame.clone())?)
    }

    /// Reconstructed laps of every driver.
    pub fn laps(&self) -> Result<Vec<LapRecord>> {
        if let Some(laps) = self.load_cached(&self.lap_table(LAPS)) {
            return Ok(laps);
        }
        Ok(self.timing_data()?.0)
    }

    /// Position and gap samples of every driver.
    pub fn gaps(&self) -> Result<Vec<GapSample>> {
        if let Some(gaps) = self.load_cached(GAPS) {
            return Ok(gaps);
        }
        Ok(self.timing_data()?.1)
    }

    /// Laps and gaps from a single pass over `TimingData`.
    pub fn timing_data(&self) -> Result<(Vec<LapRecord>, Vec<GapSample>)> {
        let laps = self.load_cached::<Vec<LapRecord>>(&self.lap_table(LAPS));
        let gaps = self.load_cached::<Vec<GapSample>>(GAPS);
        if let (Some(laps), Some(gaps)) = (laps, gaps) {
            return Ok((laps, gaps));
        }

        let frames = self.stream(&TIMING_DATA)?;
        let mut reconstructor = LapReconstructor::new(self.config.reconstruct);
        let mut gap_stream = GapStreamBuilder::new();
        for frame in &frames {
            reconstructor.push(frame);
            gap_stream.push(frame);
        }
        let laps = reconstructor.finish();
        let gaps = gap_stream.finish();

        self.store_cached(&self.lap_table(LAPS), &laps);
        self.store_cached(GAPS, &gaps);
        Ok((laps, gaps))
    }

    /// Tyre stint rows. Schema drift is only reported on a fresh build.
    pub fn stints(&self) -> Result<StintTable> {
        if let Some(rows) = self.load_cached::<Vec<TyreStint>>(STINTS) {
            return Ok(StintTable {
                rows,
                drift: Vec::new(),
            });
        }

        let table = extract_stints(&self.stream(&TIMING_APP_DATA)?);
        self.store_cached(STINTS, &table.rows);
        Ok(table)
    }

    /// Car telemetry samples.
    pub fn car_data(&self) -> Result<Vec<TelemetrySample>> {
        self.telemetry(&CAR_DATA, &CAR_DATA_TABLE)
    }

    /// Car position samples.
    pub fn position(&self) -> Result<Vec<TelemetrySample>> {
        self.telemetry(&POSITION, &POSITION_TABLE)
    }

    fn telemetry(&self, spec: &ChannelSpec, table: &ChannelTable) -> Result<Vec<TelemetrySample>> {
        if let Some(samples) = self.load_cached(table.name) {
            return Ok(samples);
        }
        let samples = demultiplex(&self.stream(spec)?, table);
        self.store_cached(table.name, &samples);
        Ok(samples)
    }

    /// Laps joined with tyre information.
    ///
    /// The lap and stint passes read different channels and run
    /// concurrently.
    pub fn summary(&self) -> Result<Vec<FinalLapRow>> {
        if let Some(rows) = self.load_cached(&self.lap_table(SUMMARY)) {
            return Ok(rows);
        }

        let (laps, stints) = std::thread::scope(|scope| {
            let laps = scope.spawn(|| self.laps());
            let stints = self.stints();
            let laps = laps
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (laps, stints)
        });

        let rows = assemble(&laps?, &stints?.rows);
        self.store_cached(&self.lap_table(SUMMARY), &rows);
        Ok(rows)
    }

    fn load_cached<T: DeserializeOwned>(&self, table: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let key = cache_key(&self.identity, table);
        let bytes = match cache.load(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache load failed, rebuilding");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(rows) => {
                tracing::debug!(key = %key, "cache hit");
                Some(rows)
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cached table unreadable, rebuilding");
                None
            }
        }
    }

    fn store_cached<T: Serialize + ?Sized>(&self, table: &str, rows: &T) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let key = cache_key(&self.identity, table);
        let result = serde_json::to_vec(rows)
            .map_err(|err| err.to_string())
            .and_then(|bytes| cache.store(&key, &bytes).map_err(|err| err.to_string()));
        if let Err(err) = result {
            tracing::warn!(key = %key, error = %err, "cache store failed");
        }
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("cached", &self.cache.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
