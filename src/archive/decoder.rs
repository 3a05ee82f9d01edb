//! Pure decoding of archive paths and file names. Nothing here fails loudly:
//! a name that does not match simply yields `None`.

use chrono::NaiveDateTime;

use crate::models::{ArchiveKind, CameraId};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
/// Shape of `YYYY-MM-DD_HH-MM-SS`; `d` is any ASCII digit.
const TIMESTAMP_SHAPE: &[u8; 19] = b"dddd-dd-dd_dd-dd-dd";

/// First `YYYY-MM-DD_HH-MM-SS` occurrence in `name` that is a real date.
pub fn decode_timestamp(name: &str) -> Option<NaiveDateTime> {
    let bytes = name.as_bytes();
    if bytes.len() < TIMESTAMP_SHAPE.len() {
        return None;
    }

    (0..=bytes.len() - TIMESTAMP_SHAPE.len())
        .filter(|&start| matches_shape(&bytes[start..start + TIMESTAMP_SHAPE.len()]))
        .find_map(|start| {
            // Shape matched, so the window is pure ASCII and slicing is safe.
            let candidate = &name[start..start + TIMESTAMP_SHAPE.len()];
            NaiveDateTime::parse_from_str(candidate, TIMESTAMP_FORMAT).ok()
        })
}

fn matches_shape(window: &[u8]) -> bool {
    window
        .iter()
        .zip(TIMESTAMP_SHAPE.iter())
        .all(|(&byte, &expected)| match expected {
            b'd' => byte.is_ascii_digit(),
            other => byte == other,
        })
}

/// Camera from a `...-<camera>.<ext>` file name.
pub fn decode_camera(name: &str) -> Option<CameraId> {
    let (stem, _extension) = name.rsplit_once('.')?;
    let (_, suffix) = stem.rsplit_once('-')?;
    CameraId::from_name(suffix)
}

/// `(kind, folder)` for paths shaped like `.../SavedClips/<folder>/<file>`.
pub fn decode_group_folder(path: &str) -> Option<(ArchiveKind, String)> {
    let normalized = path.replace('\\', "/");
    let components: Vec<&str> = normalized.split('/').collect();

    components.windows(3).find_map(|window| {
        let kind = ArchiveKind::from_dir_name(window[0])?;
        let folder = window[1];
        if folder.is_empty() {
            return None;
        }
        Some((kind, folder.to_string()))
    })
}

pub fn is_thumbnail(name: &str) -> bool {
    ends_with_ignore_case(name, "thumb.png")
}

pub fn is_event_metadata(name: &str) -> bool {
    ends_with_ignore_case(name, "event.json")
}

pub fn is_video_fragment(name: &str) -> bool {
    ends_with_ignore_case(name, ".mp4")
}

fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn timestamp_found_anywhere_in_name() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(decode_timestamp("2023-01-01_10-00-00-front.mp4"), Some(expected));
        assert_eq!(decode_timestamp("clip 2023-01-01_10-00-00.mp4"), Some(expected));
    }

    #[test]
    fn timestamp_rejects_malformed_names() {
        assert_eq!(decode_timestamp("front.mp4"), None);
        assert_eq!(decode_timestamp("2023-01-01 10-00-00-front.mp4"), None);
        assert_eq!(decode_timestamp("2023-13-01_10-00-00-front.mp4"), None);
        assert_eq!(decode_timestamp("2023-02-30_10-00-00-front.mp4"), None);
        assert_eq!(decode_timestamp(""), None);
    }

    #[test]
    fn timestamp_skips_invalid_match_for_later_valid_one() {
        let decoded = decode_timestamp("9999-99-99_99-99-99_2024-05-06_07-08-09.mp4");
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        assert_eq!(decoded, Some(expected));
    }

    #[test]
    fn timestamp_tolerates_multibyte_names() {
        assert!(decode_timestamp("é2023-01-01_10-00-00ü-back.mp4").is_some());
        assert_eq!(decode_timestamp("ééééééééééééééééééééé"), None);
    }

    #[test]
    fn camera_from_suffix() {
        assert_eq!(decode_camera("2023-01-01_10-00-00-front.mp4"), Some(CameraId::Front));
        assert_eq!(
            decode_camera("2023-01-01_10-00-00-left_repeater.mp4"),
            Some(CameraId::LeftRepeater)
        );
        assert_eq!(decode_camera("2023-01-01_10-00-00-rear.mp4"), None);
        assert_eq!(decode_camera("2023-01-01_10-00-00-front"), None);
        assert_eq!(decode_camera("front.mp4"), None);
    }

    #[test]
    fn group_folder_requires_archive_dir_and_file() {
        assert_eq!(
            decode_group_folder("TeslaCam/SavedClips/2023-01-01_10-00-00/event.json"),
            Some((ArchiveKind::SavedClips, "2023-01-01_10-00-00".to_string()))
        );
        assert_eq!(
            decode_group_folder("SentryClips\\abc\\thumb.png"),
            Some((ArchiveKind::SentryClips, "abc".to_string()))
        );
        assert_eq!(decode_group_folder("TeslaCam/RecentClips/x/a.mp4"), None);
        assert_eq!(decode_group_folder("TeslaCam/SavedClips/loose.mp4"), None);
        assert_eq!(decode_group_folder("SavedClips//event.json"), None);
    }

    #[test]
    fn companion_predicates_ignore_case() {
        assert!(is_thumbnail("THUMB.PNG"));
        assert!(is_event_metadata("Event.Json"));
        assert!(is_video_fragment("x-front.MP4"));
        assert!(!is_thumbnail("thumb.jpg"));
        assert!(!is_event_metadata("json"));
    }
}
