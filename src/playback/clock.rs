use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::settings::PlaybackSettings;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
}

/// Virtual playback position advanced by wall-clock time times a rate.
/// Independent of any camera.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackClock {
    pub status: PlaybackStatus,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub rate: f64,
    /// Wall-clock instant the position was last brought up to date.
    #[serde(skip)]
    last_tick: Option<Instant>,
    #[serde(skip)]
    min_rate: f64,
    #[serde(skip)]
    max_rate: f64,
}

impl PlaybackClock {
    pub fn new(duration_secs: f64) -> Self {
        Self::with_bounds(duration_secs, &PlaybackSettings::default())
    }

    /// Rejects settings whose rate bounds or tick interval make no sense.
    pub fn from_settings(duration_secs: f64, settings: &PlaybackSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::with_bounds(duration_secs, settings))
    }

    fn with_bounds(duration_secs: f64, settings: &PlaybackSettings) -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            position_secs: 0.0,
            duration_secs: sanitize_duration(duration_secs),
            rate: 1.0_f64.clamp(settings.min_rate, settings.max_rate),
            last_tick: None,
            min_rate: settings.min_rate,
            max_rate: settings.max_rate,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Reaching the end is not a transition; consumers check this.
    pub fn is_at_end(&self) -> bool {
        self.position_secs >= self.duration_secs
    }

    pub fn play(&mut self, now: Instant) {
        if self.is_playing() {
            return;
        }
        self.status = PlaybackStatus::Playing;
        self.last_tick = Some(now);
    }

    pub fn pause(&mut self, now: Instant) {
        if !self.is_playing() {
            return;
        }
        self.tick(now);
        self.status = PlaybackStatus::Stopped;
        self.last_tick = None;
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_playing() {
            self.pause(now);
        } else {
            self.play(now);
        }
    }

    /// Works in either state; the position is clamped to `[0, duration]`.
    pub fn seek(&mut self, position_secs: f64) {
        self.position_secs = if position_secs.is_nan() {
            0.0
        } else {
            position_secs.clamp(0.0, self.duration_secs)
        };
    }

    pub fn jump(&mut self, delta_secs: f64) {
        self.seek(self.position_secs + delta_secs);
    }

    /// Time already played at the old rate is accounted for before the
    /// change. Rates outside the configured bounds are clamped; non-positive
    /// or non-finite rates are rejected.
    pub fn set_rate(&mut self, rate: f64, now: Instant) -> Result<f64> {
        if !rate.is_finite() || rate <= 0.0 {
            bail!("playback rate must be a positive number, got {rate}");
        }
        self.tick(now);
        self.rate = rate.clamp(self.min_rate, self.max_rate);
        Ok(self.rate)
    }

    pub fn set_duration(&mut self, duration_secs: f64) {
        self.duration_secs = sanitize_duration(duration_secs);
        self.seek(self.position_secs);
    }

    /// Brings the position up to `now`. Returns the new position.
    pub fn tick(&mut self, now: Instant) -> f64 {
        if let (PlaybackStatus::Playing, Some(anchor)) = (self.status, self.last_tick) {
            let elapsed = now.saturating_duration_since(anchor).as_secs_f64();
            self.position_secs = (self.position_secs + elapsed * self.rate).min(self.duration_secs);
            self.last_tick = Some(now);
        }
        self.position_secs
    }
}

fn sanitize_duration(duration_secs: f64) -> f64 {
    if duration_secs.is_finite() {
        duration_secs.max(0.0)
    } else {
        0.0
    }
}

/// `m:ss`, the way the timeline label shows positions.
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0).floor() as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}
