use anyhow::Result;

use crate::{
    duration::{DurationEstimator, DurationProbe, DurationTask},
    models::{CameraId, Clip, DurationUpdate},
    settings::PlaybackSettings,
    timeline::{resolve, resolve_all, RenderTarget, SourceRef},
};

use super::controller::{ClockSnapshot, PlaybackController};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// One opened clip: its playback clock plus at most one duration probe pass.
pub struct ClipSession {
    clip: Clip,
    controller: PlaybackController,
    settings: PlaybackSettings,
    refinement: Option<DurationTask>,
    refinement_started: bool,
}

impl ClipSession {
    /// Positions the clock a little before the recorded event (or at the
    /// start when there is none) and starts playing if autoplay is on.
    pub async fn open(clip: Clip, settings: &PlaybackSettings) -> Result<Self> {
        let controller = PlaybackController::new(clip.duration_secs, settings)?;

        let start = clip
            .event_offset()
            .map(|event| (event - settings.event_lead_secs).max(0.0))
            .unwrap_or(0.0);
        controller.seek(start).await;
        if settings.autoplay {
            controller.play().await;
        }

        log_info!("Opened clip {} at {:.1}s", clip.id, start);

        Ok(Self {
            clip,
            controller,
            settings: settings.clone(),
            refinement: None,
            refinement_started: false,
        })
    }

    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// True while a probe pass is running for this session.
    pub fn is_calculating(&self) -> bool {
        self.refinement
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Starts the probe pass. Runs at most once per session; returns false
    /// when it already ran or the duration is already measured.
    pub fn start_refinement<P: DurationProbe + 'static>(
        &mut self,
        estimator: &DurationEstimator<P>,
    ) -> bool {
        if self.refinement_started || self.clip.is_measured() {
            return false;
        }
        self.refinement_started = true;
        self.refinement = Some(estimator.spawn(self.clip.clone()));
        true
    }

    /// Waits for the probe pass started by [`start_refinement`](Self::start_refinement)
    /// and applies its result.
    pub async fn finish_refinement(&mut self) -> Option<DurationUpdate> {
        let task = self.refinement.take()?;
        let update = task.join().await?;
        self.apply_duration(&update).await;
        Some(update)
    }

    /// Applies a deferred duration. Results addressed to another clip are
    /// dropped.
    pub async fn apply_duration(&mut self, update: &DurationUpdate) -> bool {
        if update.clip_id != self.clip.id {
            log_warn!(
                "Dropping duration for {} while {} is open",
                update.clip_id,
                self.clip.id
            );
            return false;
        }
        if !self.clip.apply_duration(update) {
            return false;
        }
        self.controller.set_duration(self.clip.duration_secs).await;
        true
    }

    pub async fn snapshot(&self) -> ClockSnapshot {
        self.controller.snapshot().await
    }

    pub async fn goto_event(&self) -> Option<ClockSnapshot> {
        let event = self.clip.event_offset()?;
        let target = (event - self.settings.goto_event_lead_secs).max(0.0);
        Some(self.controller.seek(target).await)
    }

    pub async fn jump_forward(&self) -> ClockSnapshot {
        self.controller.jump(self.settings.jump_secs).await
    }

    pub async fn jump_back(&self) -> ClockSnapshot {
        self.controller.jump(-self.settings.jump_secs).await
    }

    pub async fn source(&self, camera: CameraId) -> SourceRef {
        resolve(&self.clip, self.controller.position().await, camera)
    }

    pub async fn sources(&self) -> Vec<(CameraId, SourceRef)> {
        resolve_all(&self.clip, self.controller.position().await)
    }

    /// Hands every camera's current source to `target`.
    pub async fn render<R: RenderTarget>(&self, target: &mut R) {
        let snapshot = self.controller.snapshot().await;
        let playing = snapshot.status == super::PlaybackStatus::Playing;
        for (camera, source) in resolve_all(&self.clip, snapshot.position_secs) {
            target.present(camera, &source, playing, snapshot.rate);
        }
    }

    /// Stops playback and any probe pass still running, and hands the clip
    /// back.
    pub async fn close(mut self) -> Clip {
        if let Some(task) = self.refinement.take() {
            task.cancel();
        }
        self.controller.shutdown().await;
        self.clip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        estimate_duration, ClipKind, ContentHandle, DurationSource, EventMetadata, Segment,
        SegmentFile,
    };
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(10, minute, second)
            .unwrap()
    }

    fn clip(event: Option<&str>) -> Clip {
        let segments: Vec<Segment> = [0, 1, 2]
            .into_iter()
            .map(|minute| {
                let start = ts(minute, 0);
                let mut segment = Segment::new(start);
                for camera in CameraId::ALL {
                    segment.cameras.insert(
                        camera,
                        SegmentFile {
                            camera,
                            start,
                            content: ContentHandle::from_bytes(format!("{minute}-{camera}"), Vec::new()),
                        },
                    );
                }
                segment
            })
            .collect();

        let mut metadata = EventMetadata::default();
        metadata.timestamp = event.map(str::to_string);

        Clip {
            id: "evt".into(),
            name: "evt".into(),
            classification: ClipKind::Sentry,
            event_timestamp: ts(2, 0),
            thumbnail: ContentHandle::from_bytes("thumb.png", Vec::new()),
            metadata,
            duration_secs: estimate_duration(&segments),
            duration_source: DurationSource::Estimated,
            segments,
        }
    }

    fn paused_settings() -> PlaybackSettings {
        PlaybackSettings {
            autoplay: false,
            ..PlaybackSettings::default()
        }
    }

    struct FixedProbe(f64);

    impl DurationProbe for FixedProbe {
        async fn probe(&self, _content: &ContentHandle) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingTarget {
        presented: Vec<(CameraId, SourceRef, bool)>,
    }

    impl RenderTarget for RecordingTarget {
        fn present(&mut self, camera: CameraId, source: &SourceRef, playing: bool, _rate: f64) {
            self.presented.push((camera, source.clone(), playing));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn opens_before_the_event() {
        let session = ClipSession::open(clip(Some("2023-01-01T10:01:10")), &paused_settings()).await.unwrap();
        assert_eq!(session.snapshot().await.position_secs, 50.0);

        let at_event = session.goto_event().await.unwrap();
        assert_eq!(at_event.position_secs, 65.0);

        let source = session.source(CameraId::Front).await;
        assert_eq!(source.offset_secs, 5.0);
        assert_eq!(source.key, "memory:1-front");
    }

    #[tokio::test(start_paused = true)]
    async fn opens_at_zero_without_event_time() {
        let session = ClipSession::open(clip(None), &paused_settings()).await.unwrap();
        assert_eq!(session.snapshot().await.position_secs, 0.0);
        assert!(session.goto_event().await.is_none());

        let session = ClipSession::open(clip(Some("2023-01-01T10:00:05")), &paused_settings()).await.unwrap();
        assert_eq!(session.snapshot().await.position_secs, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn autoplay_starts_the_clock() {
        let session = ClipSession::open(clip(None), &PlaybackSettings::default()).await.unwrap();
        assert!(session.snapshot().await.status == crate::playback::PlaybackStatus::Playing);
        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refinement_runs_once_and_updates_clock() {
        let mut session = ClipSession::open(clip(None), &paused_settings()).await.unwrap();
        let estimator = DurationEstimator::new(FixedProbe(59.0));

        assert!(session.start_refinement(&estimator));
        assert!(!session.start_refinement(&estimator));

        let update = session.finish_refinement().await.unwrap();
        assert_eq!(update.duration_secs, 177.0);
        assert!(session.clip().is_measured());
        assert_eq!(session.snapshot().await.duration_secs, 177.0);
        assert!(!session.start_refinement(&estimator));
        assert!(!session.is_calculating());
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_duration_is_ignored() {
        let mut session = ClipSession::open(clip(None), &paused_settings()).await.unwrap();
        let stale = DurationUpdate {
            clip_id: "another".into(),
            duration_secs: 5.0,
        };
        assert!(!session.apply_duration(&stale).await);
        assert_eq!(session.snapshot().await.duration_secs, 180.0);
    }

    #[tokio::test(start_paused = true)]
    async fn jumps_use_configured_step() {
        let session = ClipSession::open(clip(None), &paused_settings()).await.unwrap();
        assert_eq!(session.jump_forward().await.position_secs, 5.0);
        assert_eq!(session.jump_forward().await.position_secs, 10.0);
        assert_eq!(session.jump_back().await.position_secs, 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn render_presents_every_camera() {
        let session = ClipSession::open(clip(None), &paused_settings()).await.unwrap();
        session.controller().seek(125.0).await;

        let mut target = RecordingTarget::default();
        session.render(&mut target).await;

        assert_eq!(target.presented.len(), 6);
        for (camera, source, playing) in &target.presented {
            assert!(!playing);
            assert_eq!(source.offset_secs, 5.0);
            assert_eq!(source.key, format!("memory:2-{camera}"));
        }

        let sources = session.sources().await;
        assert_eq!(sources.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_settings_fail_to_open() {
        let settings = PlaybackSettings {
            tick_interval_ms: 0,
            ..paused_settings()
        };
        assert!(ClipSession::open(clip(None), &settings).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn close_returns_the_clip() {
        let mut session = ClipSession::open(clip(None), &paused_settings()).await.unwrap();
        session.start_refinement(&DurationEstimator::new(FixedProbe(30.0)));
        let clip = session.close().await;
        assert_eq!(clip.id, "evt");
    }
}
