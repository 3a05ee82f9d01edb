use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::settings::{self, PlaybackSettings};

use super::clock::{PlaybackClock, PlaybackStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub status: PlaybackStatus,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub rate: f64,
    pub at_end: bool,
}

impl From<&PlaybackClock> for ClockSnapshot {
    fn from(clock: &PlaybackClock) -> Self {
        Self {
            status: clock.status,
            position_secs: clock.position_secs,
            duration_secs: clock.duration_secs,
            rate: clock.rate,
            at_end: clock.is_at_end(),
        }
    }
}

/// Drives a [`PlaybackClock`] on the tokio runtime. While playing, a ticker
/// re-arms every `tick_interval` and publishes the position; pausing stops
/// re-arming.
#[derive(Clone)]
pub struct PlaybackController {
    clock: Arc<Mutex<PlaybackClock>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    debug_ticks: bool,
    updates: Arc<watch::Sender<ClockSnapshot>>,
}

impl PlaybackController {
    /// Fails on settings the ticker could not run with, such as a zero
    /// tick interval or inverted rate bounds.
    pub fn new(duration_secs: f64, config: &PlaybackSettings) -> Result<Self> {
        let clock = PlaybackClock::from_settings(duration_secs, config)
            .context("Invalid playback settings")?;
        let (updates, _) = watch::channel(ClockSnapshot::from(&clock));

        Ok(Self {
            clock: Arc::new(Mutex::new(clock)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: config.tick_interval(),
            debug_ticks: settings::debug_mode(),
            updates: Arc::new(updates),
        })
    }

    /// Receives a snapshot after every tick and every state change.
    pub fn subscribe(&self) -> watch::Receiver<ClockSnapshot> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> ClockSnapshot {
        let mut guard = self.clock.lock().await;
        guard.tick(Instant::now());
        ClockSnapshot::from(&*guard)
    }

    pub async fn position(&self) -> f64 {
        self.snapshot().await.position_secs
    }

    pub async fn play(&self) -> ClockSnapshot {
        let snapshot = {
            let mut guard = self.clock.lock().await;
            guard.play(Instant::now());
            ClockSnapshot::from(&*guard)
        };
        self.spawn_ticker().await;
        self.publish(snapshot)
    }

    pub async fn pause(&self) -> ClockSnapshot {
        self.cancel_ticker().await;
        let snapshot = {
            let mut guard = self.clock.lock().await;
            guard.pause(Instant::now());
            ClockSnapshot::from(&*guard)
        };
        self.publish(snapshot)
    }

    pub async fn toggle(&self) -> ClockSnapshot {
        let playing = self.clock.lock().await.is_playing();
        if playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    pub async fn seek(&self, position_secs: f64) -> ClockSnapshot {
        self.update(|clock, now| {
            clock.tick(now);
            clock.seek(position_secs);
        })
        .await
    }

    pub async fn jump(&self, delta_secs: f64) -> ClockSnapshot {
        self.update(|clock, now| {
            clock.tick(now);
            clock.jump(delta_secs);
        })
        .await
    }

    pub async fn set_rate(&self, rate: f64) -> Result<ClockSnapshot> {
        let snapshot = {
            let mut guard = self.clock.lock().await;
            guard.set_rate(rate, Instant::now())?;
            ClockSnapshot::from(&*guard)
        };
        Ok(self.publish(snapshot))
    }

    pub async fn set_duration(&self, duration_secs: f64) -> ClockSnapshot {
        self.update(|clock, now| {
            clock.tick(now);
            clock.set_duration(duration_secs);
        })
        .await
    }

    /// Stops the ticker for good; the clock keeps its last position.
    pub async fn shutdown(&self) {
        self.pause().await;
    }

    async fn update<F>(&self, change: F) -> ClockSnapshot
    where
        F: FnOnce(&mut PlaybackClock, Instant),
    {
        let snapshot = {
            let mut guard = self.clock.lock().await;
            change(&mut *guard, Instant::now());
            ClockSnapshot::from(&*guard)
        };
        self.publish(snapshot)
    }

    fn publish(&self, snapshot: ClockSnapshot) -> ClockSnapshot {
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let clock = self.clock.clone();
        let updates = self.updates.clone();
        let tick_interval = self.tick_interval;
        let debug_ticks = self.debug_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let snapshot = {
                    let mut guard = clock.lock().await;
                    if !guard.is_playing() {
                        break;
                    }
                    guard.tick(Instant::now());
                    ClockSnapshot::from(&*guard)
                };

                if debug_ticks {
                    log_debug!(
                        "tick: {:.3}s / {:.3}s at {}x",
                        snapshot.position_secs,
                        snapshot.duration_secs,
                        snapshot.rate
                    );
                }

                updates.send_replace(snapshot);
            }

            log_info!("playback ticker stopped");
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
