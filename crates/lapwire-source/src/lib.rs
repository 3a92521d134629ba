//! Capture sources and table caches.
//!
//! The reconstruction engine never fetches or stores anything itself. It
//! talks to two seams:
//! - [`FeedSource`] supplies the complete raw body of a channel, or a
//!   definite "unavailable"
//! - [`TableCache`] stores and returns materialized tables by key
//!
//! Local implementations are provided for capture directories and for
//! in-memory use.

pub mod dir;
pub mod error;
pub mod memory;
pub mod traits;

pub use dir::{DirCache, DirSource};
pub use error::{Result, SourceError};
pub use memory::{MemoryCache, MemorySource};
pub use traits::{cache_key, FeedSource, TableCache};
