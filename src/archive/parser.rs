use chrono::NaiveDateTime;
use std::{collections::BTreeMap, fmt};

use crate::models::{
    estimate_duration, ArchiveKind, CameraId, Clip, DurationSource, EventMetadata, FileEntry,
    Segment, SegmentFile,
};

use super::decoder::{
    decode_camera, decode_group_folder, decode_timestamp, is_event_metadata, is_thumbnail,
    is_video_fragment,
};
use super::reasons::classify;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Why a clip folder did not make it into the output.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingThumbnail,
    MissingMetadata,
    UnreadableMetadata(String),
    InvalidMetadata(String),
    IncompleteSegment {
        timestamp: NaiveDateTime,
        missing: Vec<CameraId>,
    },
    NoSegments,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingThumbnail => write!(f, "missing thumb.png"),
            SkipReason::MissingMetadata => write!(f, "missing event.json"),
            SkipReason::UnreadableMetadata(err) => write!(f, "could not read event.json: {err}"),
            SkipReason::InvalidMetadata(err) => write!(f, "could not parse event.json: {err}"),
            SkipReason::IncompleteSegment { timestamp, missing } => {
                let names: Vec<&str> = missing.iter().map(CameraId::as_str).collect();
                write!(f, "part {timestamp} missing cameras: {}", names.join(", "))
            }
            SkipReason::NoSegments => write!(f, "no video parts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedClip {
    pub kind: ArchiveKind,
    pub folder: String,
    pub reason: SkipReason,
}

/// Everything one parse pass produced: the clips plus what was excluded.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub clips: Vec<Clip>,
    pub skipped: Vec<SkippedClip>,
    /// Entries outside any `SavedClips/<folder>/` or `SentryClips/<folder>/`.
    pub ignored_entries: usize,
    /// Ids carried by more than one clip (same folder name under both
    /// archive kinds). Duration updates cannot tell such clips apart.
    pub duplicate_ids: Vec<String>,
}

/// Turns an unordered file list into validated clips, most recent first.
/// Never fails: anything unusable is logged and left out.
pub async fn parse_archive(entries: Vec<FileEntry>) -> Vec<Clip> {
    parse_archive_with_report(entries).await.clips
}

pub async fn parse_archive_with_report(entries: Vec<FileEntry>) -> ParseReport {
    let mut report = ParseReport::default();

    // Step 1: Group entries by clip folder
    let (groups, ignored) = group_entries(entries);
    report.ignored_entries = ignored;

    // Step 2: Validate and build each group on its own
    for ((kind, folder), files) in groups {
        match build_clip(kind, &folder, files).await {
            Ok(clip) => report.clips.push(clip),
            Err(reason) => {
                match &reason {
                    SkipReason::UnreadableMetadata(_)
                    | SkipReason::InvalidMetadata(_)
                    | SkipReason::IncompleteSegment { .. } => {
                        log_error!("[Skipped] Clip {} ({}): {}", folder, kind.as_str(), reason)
                    }
                    _ => log_warn!("[Skipped] Clip {} ({}): {}", folder, kind.as_str(), reason),
                }
                report.skipped.push(SkippedClip {
                    kind,
                    folder,
                    reason,
                });
            }
        }
    }

    // Step 3: Flag ids shared across archive kinds
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for clip in &report.clips {
        *seen.entry(clip.id.as_str()).or_default() += 1;
    }
    report.duplicate_ids = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id.to_string())
        .collect();
    for id in &report.duplicate_ids {
        log_warn!("[Parse] Clip id {} is used by more than one archive folder", id);
    }

    // Step 4: Most recent first; id breaks ties so repeated parses agree
    report.clips.sort_by(|a, b| {
        b.event_timestamp
            .cmp(&a.event_timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });

    log_info!(
        "Parsed {} clips ({} skipped, {} unrelated files ignored)",
        report.clips.len(),
        report.skipped.len(),
        report.ignored_entries
    );

    report
}

type Groups = BTreeMap<(ArchiveKind, String), Vec<FileEntry>>;

/// Groups entries by `(kind, folder)`. Returns the groups and the number of
/// entries that belong to no group.
fn group_entries(entries: Vec<FileEntry>) -> (Groups, usize) {
    let mut groups = Groups::new();
    let mut ignored = 0;

    for entry in entries {
        match decode_group_folder(&entry.path) {
            Some(key) => groups.entry(key).or_default().push(entry),
            None => {
                log_debug!("Ignoring {} (not inside a clip folder)", entry.path);
                ignored += 1;
            }
        }
    }

    for files in groups.values_mut() {
        files.sort_by(|a, b| a.path.cmp(&b.path));
    }

    (groups, ignored)
}

async fn build_clip(
    kind: ArchiveKind,
    folder: &str,
    files: Vec<FileEntry>,
) -> Result<Clip, SkipReason> {
    // Companion files are a hard gate
    let thumbnail = find_single(folder, &files, is_thumbnail).ok_or(SkipReason::MissingThumbnail)?;
    let event_file = find_single(folder, &files, is_event_metadata).ok_or(SkipReason::MissingMetadata)?;

    let text = event_file
        .content
        .read_text()
        .await
        .map_err(|err| SkipReason::UnreadableMetadata(format!("{err:#}")))?;
    let mut metadata =
        EventMetadata::from_json(&text).map_err(|err| SkipReason::InvalidMetadata(err.to_string()))?;

    let classification = classify(metadata.reason.as_deref(), kind.default_kind());
    if classification.unrecognized {
        log_warn!(
            "Clip {} has unrecognized reason {:?}; keeping {} classification",
            folder,
            metadata.reason.as_deref().unwrap_or_default(),
            classification.kind.as_str()
        );
    }
    metadata.display_reason = classification.display_reason;

    let segments = collect_segments(folder, &files)?;
    let Some(last) = segments.last() else {
        return Err(SkipReason::NoSegments);
    };

    let event_timestamp = metadata.event_time().unwrap_or(last.timestamp);
    let duration_secs = estimate_duration(&segments);

    Ok(Clip {
        id: folder.to_string(),
        name: folder.to_string(),
        classification: classification.kind,
        event_timestamp,
        thumbnail: thumbnail.content.clone(),
        metadata,
        segments,
        duration_secs,
        duration_source: DurationSource::Estimated,
    })
}

fn find_single<'a>(
    folder: &str,
    files: &'a [FileEntry],
    predicate: fn(&str) -> bool,
) -> Option<&'a FileEntry> {
    let mut matches = files.iter().filter(|file| predicate(file.name()));
    let first = matches.next()?;
    if matches.next().is_some() {
        log_debug!("Clip {} has several {} files; using {}", folder, first.name(), first.path);
    }
    Some(first)
}

/// Buckets fragments by start time and validates each bucket in ascending
/// order. The first bucket without full camera coverage rejects the clip.
fn collect_segments(folder: &str, files: &[FileEntry]) -> Result<Vec<Segment>, SkipReason> {
    let mut buckets: BTreeMap<NaiveDateTime, Segment> = BTreeMap::new();

    for file in files.iter().filter(|file| is_video_fragment(file.name())) {
        let name = file.name();
        let Some(start) = decode_timestamp(name) else {
            log_debug!("Clip {}: dropping {} (no timestamp in name)", folder, name);
            continue;
        };

        let segment = buckets.entry(start).or_insert_with(|| Segment::new(start));

        let Some(camera) = decode_camera(name) else {
            log_debug!("Clip {}: {} is not from a known camera", folder, name);
            continue;
        };

        if segment.cameras.contains_key(&camera) {
            log_debug!("Clip {}: duplicate {} fragment {} ignored", folder, camera, file.path);
            continue;
        }

        segment.cameras.insert(
            camera,
            SegmentFile {
                camera,
                start,
                content: file.content.clone(),
            },
        );
    }

    let mut segments = Vec::with_capacity(buckets.len());
    for (timestamp, segment) in buckets {
        let missing = segment.missing_cameras();
        if !missing.is_empty() {
            return Err(SkipReason::IncompleteSegment { timestamp, missing });
        }
        segments.push(segment);
    }

    Ok(segments)
}
