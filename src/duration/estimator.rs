use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{Clip, DurationUpdate, FALLBACK_SEGMENT_SECS};

use super::probe::DurationProbe;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Replaces a clip's heuristic duration with the sum of measured fragment
/// lengths.
pub struct DurationEstimator<P> {
    probe: Arc<P>,
}

impl<P> Clone for DurationEstimator<P> {
    fn clone(&self) -> Self {
        Self {
            probe: Arc::clone(&self.probe),
        }
    }
}

impl<P: DurationProbe + 'static> DurationEstimator<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
        }
    }

    /// Probes one representative fragment per segment, in timeline order.
    /// A failed probe counts as [`FALLBACK_SEGMENT_SECS`], so when every probe
    /// fails the result equals the parse-time estimate.
    pub async fn refine(&self, clip: &Clip) -> DurationUpdate {
        let mut total = 0.0;

        for (index, segment) in clip.segments.iter().enumerate() {
            let Some(file) = segment.representative() else {
                continue;
            };

            match self.probe.probe(&file.content).await {
                Ok(secs) if secs.is_finite() && secs > 0.0 => {
                    log_debug!("[Duration] {} part {}: {:.3}s", clip.id, index, secs);
                    total += secs;
                }
                Ok(secs) => {
                    log_warn!(
                        "[Duration] {} part {}: implausible length {}; assuming {}s",
                        clip.id,
                        index,
                        secs,
                        FALLBACK_SEGMENT_SECS
                    );
                    total += FALLBACK_SEGMENT_SECS;
                }
                Err(err) => {
                    log_warn!(
                        "[Duration] {} part {} probe failed ({:#}); assuming {}s",
                        clip.id,
                        index,
                        err,
                        FALLBACK_SEGMENT_SECS
                    );
                    total += FALLBACK_SEGMENT_SECS;
                }
            }
        }

        log_info!("[Duration] {} total: {:.3}s", clip.id, total);

        DurationUpdate {
            clip_id: clip.id.clone(),
            duration_secs: total,
        }
    }

    /// Runs [`refine`](Self::refine) on the tokio runtime. The pass works on
    /// its own copy of the clip; the result is addressed by clip id.
    pub fn spawn(&self, clip: Clip) -> DurationTask {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let estimator = self.clone();
        let clip_id = clip.id.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                update = estimator.refine(&clip) => Some(update),
                _ = token.cancelled() => {
                    log_debug!("[Duration] pass for {} cancelled", clip.id);
                    None
                }
            }
        });

        DurationTask {
            clip_id,
            handle,
            cancel_token,
        }
    }
}

/// Handle to an in-flight probe pass.
pub struct DurationTask {
    clip_id: String,
    handle: JoinHandle<Option<DurationUpdate>>,
    cancel_token: CancellationToken,
}

impl DurationTask {
    pub fn clip_id(&self) -> &str {
        &self.clip_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops probing. A pass that already finished still yields its result.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Waits for the pass. `None` when it was cancelled or the task died.
    pub async fn join(self) -> Option<DurationUpdate> {
        match self.handle.await {
            Ok(update) => update,
            Err(err) => {
                log_warn!("[Duration] pass for {} did not complete: {}", self.clip_id, err);
                None
            }
        }
    }
}
