use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use lapwire_frame::ChannelSpec;

use crate::error::{Result, SourceError};
use crate::traits::{FeedSource, TableCache};

/// Channel bodies held in memory, keyed by channel name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    bodies: HashMap<String, Bytes>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the body of a channel.
    pub fn with_channel(mut self, channel: &ChannelSpec, body: impl Into<Bytes>) -> Self {
        self.insert(channel, body);
        self
    }

    /// Add (or replace) the body of a channel.
    pub fn insert(&mut self, channel: &ChannelSpec, body: impl Into<Bytes>) {
        self.bodies.insert(channel.name.to_string(), body.into());
    }
}

impl FeedSource for MemorySource {
    fn fetch(&self, channel: &ChannelSpec) -> Result<Bytes> {
        self.bodies
            .get(channel.name)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable {
                channel: channel.name.to_string(),
            })
    }
}

/// Unbounded in-memory table cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    tables: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tables.
    pub fn len(&self) -> usize {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TableCache for MemoryCache {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.get(key).cloned())
    }

    fn store(&self, key: &str, table: &[u8]) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.insert(key.to_string(), table.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lapwire_frame::{POSITION, TIMING_DATA};

    use super::*;

    #[test]
    fn memory_source_serves_registered_channels() {
        let source = MemorySource::new().with_channel(&TIMING_DATA, "00:00:00.000{}\r\n");

        assert_eq!(
            source.fetch(&TIMING_DATA).unwrap().as_ref(),
            b"00:00:00.000{}\r\n"
        );
        let err = source.fetch(&POSITION).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { channel } if channel == "position"));
    }

    #[test]
    fn memory_cache_replaces_entries() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());

        cache.store("s/laps", b"[1]").unwrap();
        cache.store("s/laps", b"[2]").unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.load("s/laps").unwrap(), Some(b"[2]".to_vec()));
        assert_eq!(cache.load("s/gaps").unwrap(), None);
    }
}
