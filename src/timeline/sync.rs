use serde::Serialize;
use std::collections::HashMap;

use crate::models::{CameraId, Clip, ContentHandle};

/// Renderers re-seek only when their own position strays further than this
/// from the resolved offset.
pub const DRIFT_TOLERANCE_SECS: f64 = 0.4;

/// Key reported when no fragment covers a camera.
pub const EMPTY_SOURCE_KEY: &str = "empty";

/// What a renderer needs to show one camera at one instant.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub content: Option<ContentHandle>,
    pub offset_secs: f64,
    /// Changes exactly when the underlying fragment changes.
    pub key: String,
}

impl SourceRef {
    pub fn empty(offset_secs: f64) -> Self {
        Self {
            content: None,
            offset_secs,
            key: EMPTY_SOURCE_KEY.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    /// True when a renderer sitting at `actual_secs` should seek.
    pub fn needs_resync(&self, actual_secs: f64) -> bool {
        (actual_secs - self.offset_secs).abs() > DRIFT_TOLERANCE_SECS
    }
}

/// Index of the segment active at `virtual_secs`: the last one starting at
/// or before it, the first one for earlier times. Time gaps between
/// segments belong to the segment before the gap.
pub fn segment_index_at(clip: &Clip, virtual_secs: f64) -> Option<usize> {
    if clip.segments.is_empty() {
        return None;
    }

    let position = clamp_position(virtual_secs);
    let starts = clip.segment_offsets();
    let after = starts.partition_point(|&start| start <= position);
    Some(after.saturating_sub(1))
}

/// Maps a virtual position and camera to a fragment plus the offset inside it.
pub fn resolve(clip: &Clip, virtual_secs: f64, camera: CameraId) -> SourceRef {
    let Some(index) = segment_index_at(clip, virtual_secs) else {
        return SourceRef::empty(0.0);
    };

    let segment = &clip.segments[index];
    let offset_secs = (clamp_position(virtual_secs) - clip.offset_of(segment.timestamp)).max(0.0);

    match segment.camera(camera) {
        Some(file) => SourceRef {
            content: Some(file.content.clone()),
            offset_secs,
            key: file.content.identity(),
        },
        None => SourceRef::empty(offset_secs),
    }
}

/// Every camera in grid order.
pub fn resolve_all(clip: &Clip, virtual_secs: f64) -> Vec<(CameraId, SourceRef)> {
    CameraId::grid_order()
        .map(|camera| (camera, resolve(clip, virtual_secs, camera)))
        .collect()
}

fn clamp_position(virtual_secs: f64) -> f64 {
    if virtual_secs.is_nan() {
        0.0
    } else {
        virtual_secs.max(0.0)
    }
}

/// Remembers the last key shown per camera so callers can tell a real
/// fragment switch from an offset update.
#[derive(Debug, Default)]
pub struct SourceTracker {
    shown: HashMap<CameraId, String>,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `source` for `camera`; returns true when its key differs
    /// from the previous one.
    pub fn observe(&mut self, camera: CameraId, source: &SourceRef) -> bool {
        match self.shown.get(&camera) {
            Some(key) if *key == source.key => false,
            _ => {
                self.shown.insert(camera, source.key.clone());
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.shown.clear();
    }
}
