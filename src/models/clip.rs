use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{CameraId, ContentHandle};

/// Assumed length of a fragment whose real length is not known (yet).
pub const FALLBACK_SEGMENT_SECS: f64 = 60.0;

/// Which archive directory a clip folder was found under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArchiveKind {
    SavedClips,
    SentryClips,
}

impl ArchiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::SavedClips => "SavedClips",
            ArchiveKind::SentryClips => "SentryClips",
        }
    }

    pub fn from_dir_name(value: &str) -> Option<Self> {
        match value {
            "SavedClips" => Some(ArchiveKind::SavedClips),
            "SentryClips" => Some(ArchiveKind::SentryClips),
            _ => None,
        }
    }

    /// Classification implied by the directory alone.
    pub fn default_kind(&self) -> ClipKind {
        match self {
            ArchiveKind::SavedClips => ClipKind::Saved,
            ArchiveKind::SentryClips => ClipKind::Sentry,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Saved,
    Sentry,
}

impl ClipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipKind::Saved => "saved",
            ClipKind::Sentry => "sentry",
        }
    }
}

/// One camera's recording fragment.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFile {
    #[serde(rename = "cameraId")]
    pub camera: CameraId,
    pub start: NaiveDateTime,
    #[serde(rename = "contentRef")]
    pub content: ContentHandle,
}

/// A time-aligned group of fragments, one per camera, sharing a start time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub timestamp: NaiveDateTime,
    pub cameras: BTreeMap<CameraId, SegmentFile>,
}

impl Segment {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            cameras: BTreeMap::new(),
        }
    }

    pub fn camera(&self, camera: CameraId) -> Option<&SegmentFile> {
        self.cameras.get(&camera)
    }

    pub fn missing_cameras(&self) -> Vec<CameraId> {
        CameraId::ALL
            .into_iter()
            .filter(|camera| !self.cameras.contains_key(camera))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        CameraId::ALL
            .iter()
            .all(|camera| self.cameras.contains_key(camera))
    }

    /// Any one fragment; all cameras of a segment cover the same window, so
    /// the first in camera order stands in for the rest.
    pub fn representative(&self) -> Option<&SegmentFile> {
        self.cameras.values().next()
    }
}

/// Contents of a clip's `event.json`. Known fields are typed; anything else
/// is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EventMetadata {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub est_lat: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub est_lon: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    /// Translation key for a recognized reason, or the raw reason string.
    #[serde(default, rename = "displayReason", skip_serializing_if = "Option::is_none")]
    pub display_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventMetadata {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Event instant, when the `timestamp` field holds a recognizable date.
    pub fn event_time(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?.trim();

        const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d_%H-%M-%S"];
        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    /// `city, street` with empty parts left out.
    pub fn location_label(&self) -> Option<String> {
        let parts: Vec<&str> = [self.city.as_deref(), self.street.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    Estimated,
    Measured,
}

/// Result of one probe pass, addressed to a specific clip.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DurationUpdate {
    pub clip_id: String,
    pub duration_secs: f64,
}

/// One recording event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    pub name: String,
    pub classification: ClipKind,
    pub event_timestamp: NaiveDateTime,
    #[serde(rename = "thumbnailRef")]
    pub thumbnail: ContentHandle,
    pub metadata: EventMetadata,
    pub segments: Vec<Segment>,
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    #[serde(skip)]
    pub duration_source: DurationSource,
}

impl Clip {
    pub fn first_start(&self) -> Option<NaiveDateTime> {
        self.segments.first().map(|segment| segment.timestamp)
    }

    /// Seconds between the first segment's start and `at`.
    pub fn offset_of(&self, at: NaiveDateTime) -> f64 {
        match self.first_start() {
            Some(first) => seconds_between(first, at),
            None => 0.0,
        }
    }

    /// Start of each segment on the virtual timeline, in seconds.
    pub fn segment_offsets(&self) -> Vec<f64> {
        self.segments
            .iter()
            .map(|segment| self.offset_of(segment.timestamp))
            .collect()
    }

    /// Position of the recorded event on the virtual timeline.
    pub fn event_offset(&self) -> Option<f64> {
        self.metadata
            .event_time()
            .map(|event_time| self.offset_of(event_time))
    }

    pub fn is_measured(&self) -> bool {
        self.duration_source == DurationSource::Measured
    }

    /// Applies a deferred probe result. Returns false (and leaves the clip
    /// untouched) when the update targets another clip or the duration was
    /// already measured.
    pub fn apply_duration(&mut self, update: &DurationUpdate) -> bool {
        if update.clip_id != self.id || self.is_measured() {
            return false;
        }
        self.duration_secs = update.duration_secs;
        self.duration_source = DurationSource::Measured;
        true
    }
}

/// Heuristic duration: span between first and last segment start plus one
/// fallback-length segment for the last part.
pub fn estimate_duration(segments: &[Segment]) -> f64 {
    match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => {
            seconds_between(first.timestamp, last.timestamp) + FALLBACK_SEGMENT_SECS
        }
        _ => 0.0,
    }
}

pub(crate) fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}
