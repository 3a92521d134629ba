use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lapwire_source::{DirCache, DirSource};
use lapwire_timing::{Session, SessionConfig};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod channels;
pub mod decode;
pub mod gaps;
pub mod laps;
pub mod stints;
pub mod summary;
pub mod telemetry;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the channel catalog.
    Channels(ChannelsArgs),
    /// Decode one channel of a capture.
    Decode(DecodeArgs),
    /// Reconstruct laps.
    Laps(LapArgs),
    /// Position and gap history.
    Gaps(CaptureArgs),
    /// Tyre stint updates.
    Stints(CaptureArgs),
    /// Car telemetry samples.
    CarData(CaptureArgs),
    /// Car position samples.
    Position(CaptureArgs),
    /// Laps joined with tyre information.
    Summary(LapArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, cache_dir: Option<PathBuf>) -> CliResult<i32> {
    let cache_dir = cache_dir.as_deref();
    match command {
        Command::Channels(args) => channels::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Laps(args) => laps::run(args, format, cache_dir),
        Command::Gaps(args) => gaps::run(args, format, cache_dir),
        Command::Stints(args) => stints::run(args, format, cache_dir),
        Command::CarData(args) => telemetry::run_car_data(args, format, cache_dir),
        Command::Position(args) => telemetry::run_position(args, format, cache_dir),
        Command::Summary(args) => summary::run(args, format, cache_dir),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct ChannelsArgs {
    /// Only list stream channels.
    #[arg(long)]
    pub streams: bool,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Capture directory holding the channel files.
    pub dir: PathBuf,
    /// Session identity used for cache keys. Default: the directory name.
    #[arg(long)]
    pub session: Option<String>,
}

#[derive(Args, Debug)]
pub struct LapArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,
    /// Window after a lap's last update during which late fields still
    /// belong to it, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub grace_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture directory holding the channel files.
    pub dir: PathBuf,
    /// Channel name (see `lapwire channels`).
    #[arg(long, short = 'c')]
    pub channel: String,
    /// Print at most N frames.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl CaptureArgs {
    /// Cache identity of the capture.
    pub fn identity(&self) -> String {
        if let Some(session) = &self.session {
            return session.clone();
        }
        self.dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string())
    }

    pub fn open(&self, cache_dir: Option<&Path>) -> Session<DirSource> {
        self.open_with(cache_dir, SessionConfig::default())
    }

    pub fn open_with(&self, cache_dir: Option<&Path>, config: SessionConfig) -> Session<DirSource> {
        let session = Session::new(self.identity(), DirSource::new(&self.dir)).with_config(config);
        match cache_dir {
            Some(dir) => session.with_cache(DirCache::new(dir)),
            None => session,
        }
    }
}

impl LapArgs {
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::default();
        if let Some(ms) = self.grace_ms {
            config.reconstruct.grace_window = Duration::from_millis(ms);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults_to_directory_name() {
        let args = CaptureArgs {
            dir: PathBuf::from("/captures/2021-03-28_Race"),
            session: None,
        };
        assert_eq!(args.identity(), "2021-03-28_Race");

        let named = CaptureArgs {
            dir: PathBuf::from("/captures/x"),
            session: Some("2021/bahrain/race".into()),
        };
        assert_eq!(named.identity(), "2021/bahrain/race");
    }

    #[test]
    fn grace_override() {
        let args = LapArgs {
            capture: CaptureArgs {
                dir: PathBuf::from("/tmp"),
                session: None,
            },
            grace_ms: Some(1500),
        };
        assert_eq!(
            args.session_config().reconstruct.grace_window,
            Duration::from_millis(1500)
        );
    }
}
