use std::path::Path;

use crate::contract::{FrameRate, Invocation, Resolution, SweepError};
use crate::runner::ToolRunner;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub resolution: Resolution,
    pub pix_fmt: String,
    pub framerate: FrameRate,
    /// `None` when the container does not report a duration.
    pub duration_secs: Option<f64>,
}

pub fn probe_source<R: ToolRunner>(
    runner: &R,
    ffprobe: &Path,
    path: &Path,
) -> Result<SourceInfo, SweepError> {
    let failed = |reason: String| SweepError::ProbeFailed {
        path: path.to_path_buf(),
        reason,
    };

    let resolution = probe_entry(runner, ffprobe, "stream=width,height", path)?
        .parse::<Resolution>()
        .map_err(|err| failed(err.to_string()))?;
    let pix_fmt = probe_entry(runner, ffprobe, "stream=pix_fmt", path)?;
    if pix_fmt.is_empty() {
        return Err(failed("empty pix_fmt".to_string()));
    }
    let framerate = probe_entry(runner, ffprobe, "stream=r_frame_rate", path)?
        .parse::<FrameRate>()
        .map_err(failed)?;
    // stream durations are missing for webm; the container one is not
    let duration_secs = parse_duration(&probe_entry(runner, ffprobe, "format=duration", path)?);

    Ok(SourceInfo {
        resolution,
        pix_fmt,
        framerate,
        duration_secs,
    })
}

fn probe_entry<R: ToolRunner>(
    runner: &R,
    ffprobe: &Path,
    entries: &str,
    path: &Path,
) -> Result<String, SweepError> {
    let invocation = Invocation::new(
        ffprobe,
        vec![
            "-v".to_string(),
            "0".to_string(),
            "-of".to_string(),
            "csv=s=x:p=0".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-show_entries".to_string(),
            entries.to_string(),
            path.to_string_lossy().to_string(),
        ],
    );
    let output = runner.run(&invocation).map_err(|err| SweepError::ProbeFailed {
        path: path.to_path_buf(),
        reason: format!("spawn {}: {err}", ffprobe.display()),
    })?;
    if !output.success() {
        return Err(SweepError::ProbeFailed {
            path: path.to_path_buf(),
            reason: format!("{} ({})", invocation.command_line(), output.status_text()),
        });
    }
    Ok(first_value(&output.stdout))
}

/// ffprobe may repeat the entry per program; the first non-empty line wins.
/// Trailing separators left by absent entries are dropped.
fn first_value(stdout: &str) -> String {
    stdout
        .lines()
        .map(|line| line.trim().trim_end_matches('x'))
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}
