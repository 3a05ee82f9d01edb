//! Multi-camera dashcam archive review.
//!
//! [`archive`] turns a flat list of files into validated [`Clip`]s,
//! [`duration`] replaces the parse-time duration estimate with measured
//! fragment lengths, [`timeline`] maps a virtual position onto each camera's
//! fragment and [`playback`] drives that position over time.

pub mod archive;
pub mod duration;
pub mod models;
pub mod playback;
pub mod settings;
pub mod timeline;
pub mod utils;

pub use archive::{parse_archive, parse_archive_with_report, scan_directory, ParseReport};
pub use duration::{DurationEstimator, DurationProbe, FfprobeProbe, Mp4HeaderProbe};
pub use models::{CameraId, Clip, ClipKind, ContentHandle, DurationUpdate, FileEntry};
pub use playback::{ClipSession, PlaybackClock, PlaybackController};
pub use settings::{SettingsStore, ViewerSettings};
pub use timeline::{resolve, resolve_all, RenderTarget, SourceRef};

/// Installs `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
