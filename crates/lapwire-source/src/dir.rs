use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use lapwire_frame::ChannelSpec;

use crate::error::{Result, SourceError};
use crate::traits::{FeedSource, TableCache};

/// A capture directory holding one file per channel endpoint.
///
/// The layout mirrors the live-timing archive: `<root>/TimingData.jsonStream`,
/// `<root>/CarData.z.jsonStream`, and so on.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Create a source rooted at a capture directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The capture directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing a channel.
    pub fn path_for(&self, channel: &ChannelSpec) -> PathBuf {
        self.root.join(channel.endpoint_suffix)
    }
}

impl FeedSource for DirSource {
    fn fetch(&self, channel: &ChannelSpec) -> Result<Bytes> {
        let path = self.path_for(channel);
        match std::fs::read(&path) {
            Ok(body) if body.is_empty() => {
                tracing::debug!(path = %path.display(), "empty capture file");
                Err(SourceError::Unavailable {
                    channel: channel.name.to_string(),
                })
            }
            Ok(body) => Ok(Bytes::from(body)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(SourceError::Unavailable {
                channel: channel.name.to_string(),
            }),
            Err(source) => Err(SourceError::Read { path, source }),
        }
    }
}

/// Table cache storing one JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct DirCache {
    root: PathBuf,
}

impl DirCache {
    /// Create a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(SourceError::InvalidKey(key.to_string()));
        }

        let mut path = self.root.join(relative);
        let file_name = match path.file_name() {
            Some(name) => format!("{}.json", name.to_string_lossy()),
            None => return Err(SourceError::InvalidKey(key.to_string())),
        };
        path.set_file_name(file_name);
        Ok(path)
    }
}

impl TableCache for DirCache {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(table) => {
                tracing::debug!(key, path = %path.display(), "cache hit");
                Ok(Some(table))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SourceError::Read { path, source }),
        }
    }

    fn store(&self, key: &str, table: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SourceError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Readers must never observe a half-written table.
        let staging = path.with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&staging, table).map_err(|source| SourceError::Write {
            path: staging.clone(),
            source,
        })?;
        std::fs::rename(&staging, &path).map_err(|source| SourceError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(key, path = %path.display(), bytes = table.len(), "cache store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lapwire_frame::{CAR_DATA, TIMING_DATA};

    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lapwire-source-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[test]
    fn fetches_capture_file() {
        let dir = unique_temp_dir("fetch");
        std::fs::write(dir.join("TimingData.jsonStream"), b"00:00:00.000{}\r\n").unwrap();

        let source = DirSource::new(&dir);
        let body = source.fetch(&TIMING_DATA).unwrap();
        assert_eq!(body.as_ref(), b"00:00:00.000{}\r\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_or_empty_file_is_unavailable() {
        let dir = unique_temp_dir("missing");
        std::fs::write(dir.join("CarData.z.jsonStream"), b"").unwrap();

        let source = DirSource::new(&dir);
        assert!(source.fetch(&TIMING_DATA).unwrap_err().is_unavailable());
        assert!(source.fetch(&CAR_DATA).unwrap_err().is_unavailable());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cache_round_trip() {
        let dir = unique_temp_dir("cache");
        let cache = DirCache::new(dir.join("cache"));

        assert!(cache.load("monza/race/laps").unwrap().is_none());
        cache.store("monza/race/laps", b"[]").unwrap();
        assert_eq!(cache.load("monza/race/laps").unwrap().as_deref(), Some(&b"[]"[..]));
        assert!(dir.join("cache/monza/race/laps.json").is_file());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cache_rejects_escaping_keys() {
        let cache = DirCache::new("/tmp/lapwire-never-written");
        for key in ["", "../laps", "/etc/laps", "a\\b"] {
            let err = cache.load(key).unwrap_err();
            assert!(matches!(err, SourceError::InvalidKey(_)), "{key}");
        }
    }
}
