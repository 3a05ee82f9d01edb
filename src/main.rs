use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use dashcam_review::{
    archive::{parse_archive_with_report, scan_directory},
    duration::{DurationEstimator, DurationProbe, FfprobeProbe, Mp4HeaderProbe},
    models::Clip,
    playback::format_time,
    settings::{ProbeSettings, SettingsStore, ViewerSettings},
    timeline::{resolve_all, SourceRef},
    CameraId,
};

#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, PartialEq, Eq)]
enum ProbeMode {
    /// Read the `mvhd` box of each fragment
    #[default]
    Mp4,
    /// Ask an external ffprobe binary
    Ffprobe,
    /// Keep the 60 s per segment estimate
    None,
}

/// Lists the clips of a dashcam archive
#[derive(Parser, Debug)]
#[command(name = "dashcam-review", version)]
struct Cli {
    /// Archive root containing SavedClips/ and/or SentryClips/
    archive_dir: PathBuf,

    /// How clip durations are measured
    #[arg(short, long, default_value_t, value_enum)]
    probe: ProbeMode,

    /// Viewer settings file (JSON)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Print clips as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Also resolve every camera of every clip at this position (seconds)
    #[arg(long)]
    at: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output<'a> {
    clips: &'a [Clip],
    skipped: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<ClipSources>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClipSources {
    clip_id: String,
    position_secs: f64,
    cameras: Vec<(CameraId, SourceRef)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dashcam_review::init_logging();
    let args = Cli::parse();

    let settings = match &args.settings {
        Some(path) => SettingsStore::new(path.clone())?.settings(),
        None => ViewerSettings::default(),
    };

    let entries = scan_directory(&args.archive_dir)
        .await
        .with_context(|| format!("Failed to scan {}", args.archive_dir.display()))?;

    let mut report = parse_archive_with_report(entries).await;

    match args.probe {
        ProbeMode::Mp4 => refine_all(&mut report.clips, Mp4HeaderProbe).await,
        ProbeMode::Ffprobe => refine_all(&mut report.clips, ffprobe(&settings.probe)).await,
        ProbeMode::None => {}
    }

    let sources: Vec<ClipSources> = match args.at {
        Some(position_secs) => report
            .clips
            .iter()
            .map(|clip| ClipSources {
                clip_id: clip.id.clone(),
                position_secs,
                cameras: resolve_all(clip, position_secs),
            })
            .collect(),
        None => Vec::new(),
    };

    let skipped: Vec<String> = report
        .skipped
        .iter()
        .map(|skip| format!("{}/{}: {}", skip.kind.as_str(), skip.folder, skip.reason))
        .collect();

    if args.json {
        let output = Output {
            clips: &report.clips,
            skipped,
            sources,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for clip in &report.clips {
        println!(
            "{}  {:<6}  {:<28}  {} segment(s)  {} ({})",
            clip.name,
            clip.classification.as_str(),
            clip.metadata.display_reason.as_deref().unwrap_or("-"),
            clip.segments.len(),
            format_time(clip.duration_secs),
            if clip.is_measured() { "measured" } else { "estimated" },
        );
        if let Some(location) = clip.metadata.location_label() {
            println!("    {location}");
        }
    }
    for line in &skipped {
        println!("skipped {line}");
    }
    for clip_sources in &sources {
        println!("{} @ {}", clip_sources.clip_id, format_time(clip_sources.position_secs));
        for (camera, source) in &clip_sources.cameras {
            println!("    {:<15} {} +{:.1}s", camera.as_str(), source.key, source.offset_secs);
        }
    }
    println!(
        "{} clip(s), {} skipped, {} file(s) ignored",
        report.clips.len(),
        report.skipped.len(),
        report.ignored_entries
    );

    Ok(())
}

fn ffprobe(settings: &ProbeSettings) -> FfprobeProbe {
    FfprobeProbe::new(settings.ffprobe_path.clone(), settings.timeout())
}

async fn refine_all<P: DurationProbe + 'static>(clips: &mut [Clip], probe: P) {
    let estimator = DurationEstimator::new(probe);
    for clip in clips.iter_mut() {
        let update = estimator.refine(clip).await;
        clip.apply_duration(&update);
    }
}
