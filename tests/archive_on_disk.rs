use std::{fs, path::Path};

use dashcam_review::{
    archive::{parse_archive_with_report, scan_directory, SkipReason},
    duration::{DurationEstimator, Mp4HeaderProbe},
    models::{CameraId, ClipKind, DurationSource},
    playback::ClipSession,
    settings::PlaybackSettings,
    timeline::resolve,
};

fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// Smallest file the header probe accepts: `ftyp` then `moov/mvhd`.
fn mp4_with_duration(timescale: u32, duration: u32) -> Vec<u8> {
    let mut mvhd = vec![0u8; 4];
    mvhd.extend_from_slice(&[0u8; 8]);
    mvhd.extend_from_slice(&timescale.to_be_bytes());
    mvhd.extend_from_slice(&duration.to_be_bytes());
    mvhd.extend_from_slice(&[0u8; 80]);

    let mut file = mp4_box(b"ftyp", b"isom\0\0\0\0");
    file.extend(mp4_box(b"moov", &mp4_box(b"mvhd", &mvhd)));
    file
}

fn write_clip(dir: &Path, event_json: &str, stamps: &[&str], cameras: &[CameraId]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("thumb.png"), b"png").unwrap();
    fs::write(dir.join("event.json"), event_json).unwrap();
    for stamp in stamps {
        for camera in cameras {
            fs::write(
                dir.join(format!("{stamp}-{camera}.mp4")),
                mp4_with_duration(1000, 59_500),
            )
            .unwrap();
        }
    }
}

fn build_archive(root: &Path) {
    write_clip(
        &root.join("SavedClips/2023-01-01_10-02-00"),
        r#"{"timestamp":"2023-01-01T10:01:10","reason":"user_interaction_honk","city":"Oslo","est_lat":59.91}"#,
        &["2023-01-01_10-00-00", "2023-01-01_10-01-00"],
        &CameraId::ALL,
    );

    let without_repeater: Vec<CameraId> = CameraId::ALL
        .into_iter()
        .filter(|camera| *camera != CameraId::RightRepeater)
        .collect();
    write_clip(
        &root.join("SentryClips/2023-01-02_08-00-00"),
        r#"{"timestamp":"2023-01-02T08:00:30","reason":"sentry_aware_object_detection"}"#,
        &["2023-01-02_08-00-00"],
        &without_repeater,
    );

    write_clip(
        &root.join("SentryClips/2023-01-03_09-00-00"),
        r#"{"reason":"sentry_aware_object_detection"}"#,
        &["2023-01-03_09-00-00"],
        &CameraId::ALL,
    );

    fs::write(root.join("README.txt"), b"not part of any clip").unwrap();
}

#[tokio::test]
async fn scans_and_parses_a_real_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("TeslaCam");
    build_archive(&root);

    let entries = scan_directory(&root).await.unwrap();
    assert!(entries.iter().all(|entry| entry.path.starts_with("TeslaCam/")));

    let report = parse_archive_with_report(entries).await;
    let ids: Vec<&str> = report.clips.iter().map(|clip| clip.id.as_str()).collect();
    assert_eq!(ids, ["2023-01-03_09-00-00", "2023-01-01_10-02-00"]);

    let sentry = &report.clips[0];
    assert_eq!(sentry.classification, ClipKind::Sentry);
    assert_eq!(sentry.duration_secs, 60.0);

    let saved = &report.clips[1];
    assert_eq!(saved.classification, ClipKind::Saved);
    assert_eq!(saved.metadata.display_reason.as_deref(), Some("reason_honk"));
    assert_eq!(saved.metadata.est_lat.as_deref(), Some("59.91"));
    assert_eq!(saved.segments.len(), 2);
    assert_eq!(saved.duration_secs, 120.0);
    assert_eq!(saved.duration_source, DurationSource::Estimated);

    assert_eq!(report.skipped.len(), 1);
    let skipped = &report.skipped[0];
    assert_eq!(skipped.folder, "2023-01-02_08-00-00");
    match &skipped.reason {
        SkipReason::IncompleteSegment { missing, .. } => {
            assert_eq!(missing, &vec![CameraId::RightRepeater])
        }
        other => panic!("unexpected skip reason {other:?}"),
    }
}

#[tokio::test]
async fn measured_durations_replace_estimates() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("TeslaCam");
    build_archive(&root);

    let report = parse_archive_with_report(scan_directory(&root).await.unwrap()).await;
    let mut saved = report
        .clips
        .into_iter()
        .find(|clip| clip.id == "2023-01-01_10-02-00")
        .unwrap();

    let update = DurationEstimator::new(Mp4HeaderProbe).refine(&saved).await;
    assert_eq!(update.clip_id, saved.id);
    assert!((update.duration_secs - 119.0).abs() < 1e-9);
    assert!(saved.apply_duration(&update));
    assert!(!saved.apply_duration(&update));
    assert!(saved.is_measured());
}

#[tokio::test]
async fn session_opens_near_the_event_and_resolves_disk_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("TeslaCam");
    build_archive(&root);

    let report = parse_archive_with_report(scan_directory(&root).await.unwrap()).await;
    let saved = report
        .clips
        .into_iter()
        .find(|clip| clip.id == "2023-01-01_10-02-00")
        .unwrap();

    let direct = resolve(&saved, 65.0, CameraId::Back);
    assert_eq!(direct.offset_secs, 5.0);
    let path = direct.content.as_ref().and_then(|content| content.disk_path()).unwrap();
    assert!(path.ends_with("2023-01-01_10-01-00-back.mp4"));

    let settings = PlaybackSettings {
        autoplay: false,
        ..PlaybackSettings::default()
    };
    let mut session = ClipSession::open(saved, &settings).await.unwrap();
    assert_eq!(session.snapshot().await.position_secs, 50.0);

    assert!(session.start_refinement(&DurationEstimator::new(Mp4HeaderProbe)));
    let update = session.finish_refinement().await.unwrap();
    assert!((update.duration_secs - 119.0).abs() < 1e-9);
    assert!((session.snapshot().await.duration_secs - 119.0).abs() < 1e-9);

    let front = session.source(CameraId::Front).await;
    assert!(front.key.ends_with("2023-01-01_10-00-00-front.mp4"));
    assert_eq!(front.offset_secs, 50.0);

    session.close().await;
}
