use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// How often a playing clock is re-armed.
    pub tick_interval_ms: u64,
    pub min_rate: f64,
    pub max_rate: f64,
    /// Step used by jump forward/back.
    pub jump_secs: f64,
    /// Opening a clip starts this far before the recorded event.
    pub event_lead_secs: f64,
    /// "Go to event" lands this far before the recorded event.
    pub goto_event_lead_secs: f64,
    pub autoplay: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            min_rate: 0.25,
            max_rate: 5.0,
            jump_secs: 5.0,
            event_lead_secs: 20.0,
            goto_event_lead_secs: 5.0,
            autoplay: true,
        }
    }
}

impl PlaybackSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than zero");
        }
        if !(self.min_rate.is_finite() && self.min_rate > 0.0) {
            bail!("min_rate must be a positive number, got {}", self.min_rate);
        }
        if !(self.max_rate.is_finite() && self.max_rate >= self.min_rate) {
            bail!(
                "max_rate must be a number no smaller than min_rate ({}), got {}",
                self.min_rate,
                self.max_rate
            );
        }
        for (name, value) in [
            ("jump_secs", self.jump_secs),
            ("event_lead_secs", self.event_lead_secs),
            ("goto_event_lead_secs", self.goto_event_lead_secs),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("{name} must be a non-negative number, got {value}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub ffprobe_path: String,
    pub timeout_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            ffprobe_path: "ffprobe".into(),
            timeout_ms: 10_000,
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub playback: PlaybackSettings,
    pub probe: ProbeSettings,
}

/// Read-only settings loaded from a JSON file. Nothing is ever written back.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ViewerSettings>,
}

impl SettingsStore {
    /// Missing file means defaults. A file that does not parse is reported
    /// and replaced by defaults; values that parse but make no sense are an
    /// error.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = load(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> ViewerSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn playback(&self) -> PlaybackSettings {
        self.settings().playback
    }

    pub fn probe(&self) -> ProbeSettings {
        self.settings().probe
    }

    pub fn reload(&self) -> Result<()> {
        let data = load(&self.path)?;
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = data;
        Ok(())
    }
}

fn load(path: &Path) -> Result<ViewerSettings> {
    let data = if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents).unwrap_or_else(|err| {
            log_warn!("Ignoring malformed settings {}: {}", path.display(), err);
            ViewerSettings::default()
        })
    } else {
        ViewerSettings::default()
    };

    data.playback
        .validate()
        .with_context(|| format!("Invalid playback settings in {}", path.display()))?;
    Ok(data)
}

/// `DASHCAM_DEBUG=1` (or `true`) turns on per-tick logging.
pub fn debug_mode() -> bool {
    std::env::var("DASHCAM_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
