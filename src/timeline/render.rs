use crate::models::CameraId;

use super::sync::SourceRef;

/// The collaborator that decodes and paints video. The engine only tells it
/// which source to play, from which offset, at which rate.
pub trait RenderTarget {
    fn present(&mut self, camera: CameraId, source: &SourceRef, playing: bool, rate: f64);
}
