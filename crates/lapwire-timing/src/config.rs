use std::time::Duration;

use lapwire_frame::FrameConfig;

/// Window after a lap closes during which updates still belong to it.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(5);

/// Controls lap reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconstructConfig {
    /// Updates arriving before the previous lap's last timestamp plus this
    /// window are merged into the previous lap.
    pub grace_window: Duration,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
        }
    }
}

/// Everything a [`Session`](crate::Session) needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub frame: FrameConfig,
    pub reconstruct: ReconstructConfig,
}
