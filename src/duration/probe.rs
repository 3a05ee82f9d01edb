use anyhow::{anyhow, bail, Context, Result};
use std::{future::Future, time::Duration};
use tokio::process::Command;

use crate::models::ContentHandle;

/// Measures the playable length of one video fragment, in seconds.
pub trait DurationProbe: Send + Sync {
    fn probe(&self, content: &ContentHandle) -> impl Future<Output = Result<f64>> + Send;
}

const BOX_HEADER_LEN: usize = 16;
/// Upper bound on boxes visited per level, so a corrupt file cannot spin us.
const MAX_BOXES_PER_LEVEL: usize = 4096;

/// Reads the duration straight from the MP4 `moov/mvhd` box without
/// decoding anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp4HeaderProbe;

impl DurationProbe for Mp4HeaderProbe {
    async fn probe(&self, content: &ContentHandle) -> Result<f64> {
        let size = content.size().await?;

        let (moov_start, moov_end) = find_box(content, 0, size, b"moov")
            .await?
            .ok_or_else(|| anyhow!("{} has no moov box", content.identity()))?;
        let (mvhd_start, mvhd_end) = find_box(content, moov_start, moov_end, b"mvhd")
            .await?
            .ok_or_else(|| anyhow!("{} has no mvhd box", content.identity()))?;

        let body_len = usize::try_from(mvhd_end - mvhd_start).unwrap_or(usize::MAX).min(32);
        let body = content.read_range(mvhd_start, body_len).await?;
        parse_mvhd(&body)
    }
}

/// Finds the first child box named `kind` in `[start, end)`. Returns the
/// payload range (header excluded).
async fn find_box(
    content: &ContentHandle,
    start: u64,
    end: u64,
    kind: &[u8; 4],
) -> Result<Option<(u64, u64)>> {
    let mut offset = start;

    for _ in 0..MAX_BOXES_PER_LEVEL {
        if offset.saturating_add(8) > end {
            return Ok(None);
        }

        let header = content.read_range(offset, BOX_HEADER_LEN).await?;
        if header.len() < 8 {
            return Ok(None);
        }

        let size32 = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let (box_len, header_len) = match size32 {
            0 => (end - offset, 8),
            1 => {
                if header.len() < 16 {
                    bail!("truncated 64-bit box header at {offset}");
                }
                let mut large = [0u8; 8];
                large.copy_from_slice(&header[8..16]);
                (u64::from_be_bytes(large), 16)
            }
            n => (n, 8),
        };

        if box_len < header_len {
            bail!("invalid box size {box_len} at {offset}");
        }

        let box_end = offset.saturating_add(box_len).min(end);
        if &header[4..8] == kind {
            return Ok(Some((offset + header_len, box_end)));
        }
        offset = box_end;
    }

    bail!("too many boxes while looking for {}", String::from_utf8_lossy(kind))
}

fn parse_mvhd(body: &[u8]) -> Result<f64> {
    let version = *body.first().ok_or_else(|| anyhow!("empty mvhd box"))?;

    let (timescale, duration) = match version {
        0 => {
            if body.len() < 20 {
                bail!("truncated mvhd v0");
            }
            (read_u32(&body[12..16]) as u64, read_u32(&body[16..20]) as u64)
        }
        1 => {
            if body.len() < 32 {
                bail!("truncated mvhd v1");
            }
            let mut duration = [0u8; 8];
            duration.copy_from_slice(&body[24..32]);
            (read_u32(&body[20..24]) as u64, u64::from_be_bytes(duration))
        }
        other => bail!("unsupported mvhd version {other}"),
    };

    if timescale == 0 {
        bail!("mvhd timescale is zero");
    }
    Ok(duration as f64 / timescale as f64)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Asks an external `ffprobe` binary. Only works for files on disk.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(10))
    }
}

impl DurationProbe for FfprobeProbe {
    async fn probe(&self, content: &ContentHandle) -> Result<f64> {
        let path = content
            .disk_path()
            .ok_or_else(|| anyhow!("ffprobe needs a file on disk, got {}", content.identity()))?;

        let run = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| anyhow!("ffprobe timed out after {:?} on {}", self.timeout, path.display()))?
            .with_context(|| format!("failed to run {}", self.binary))?;

        if !output.status.success() {
            bail!("ffprobe exited with {} for {}", output.status, path.display());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .with_context(|| format!("unexpected ffprobe output {:?}", text.trim()))
    }
}
