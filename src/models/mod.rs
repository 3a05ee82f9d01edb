pub mod camera;
pub mod clip;
pub mod content;

pub use camera::CameraId;
pub use clip::{
    estimate_duration, ArchiveKind, Clip, ClipKind, DurationSource, DurationUpdate,
    EventMetadata, Segment, SegmentFile, FALLBACK_SEGMENT_SECS,
};
pub use content::{ContentHandle, FileEntry};
