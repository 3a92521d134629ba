use std::sync::Arc;

use bytes::Bytes;
use lapwire_frame::ChannelSpec;

use crate::error::Result;

/// Supplies raw channel bodies.
///
/// A body is either returned complete or not at all: implementations must
/// report [`SourceError::Unavailable`](crate::SourceError::Unavailable)
/// instead of a truncated success.
pub trait FeedSource: Send + Sync {
    /// Fetch the full body of a channel.
    fn fetch(&self, channel: &ChannelSpec) -> Result<Bytes>;
}

impl<S: FeedSource + ?Sized> FeedSource for &S {
    fn fetch(&self, channel: &ChannelSpec) -> Result<Bytes> {
        (**self).fetch(channel)
    }
}

/// Stores materialized tables.
///
/// Eviction and invalidation are the implementation's business.
pub trait TableCache: Send + Sync {
    /// Return a stored table, or `None` on a miss.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a table under `key`, replacing any previous entry.
    fn store(&self, key: &str, table: &[u8]) -> Result<()>;
}

impl<C: TableCache + ?Sized> TableCache for &C {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn store(&self, key: &str, table: &[u8]) -> Result<()> {
        (**self).store(key, table)
    }
}

impl<C: TableCache + ?Sized> TableCache for Arc<C> {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn store(&self, key: &str, table: &[u8]) -> Result<()> {
        (**self).store(key, table)
    }
}

/// Stable cache key for a table of a session.
pub fn cache_key(session: &str, table: &str) -> String {
    format!("{session}/{table}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_joins_session_and_table() {
        assert_eq!(
            cache_key("2021/bahrain/race", "laps"),
            "2021/bahrain/race/laps"
        );
    }
}
