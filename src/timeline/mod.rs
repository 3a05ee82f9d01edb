pub mod render;
pub mod sync;

pub use render::RenderTarget;
pub use sync::{
    resolve, resolve_all, segment_index_at, SourceRef, SourceTracker, DRIFT_TOLERANCE_SECS,
    EMPTY_SOURCE_KEY,
};
