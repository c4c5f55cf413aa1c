use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::SweepConfig;
use crate::contract::{Invocation, ReferenceSample, Resolution, SweepError, source_stem};
use crate::probe::probe_source;
use crate::runner::ToolRunner;

/// Location of the cached raw reference for `input` at `resolution`. The
/// name is keyed on the full input path, not just its file name.
#[must_use]
pub fn reference_path(
    tmp_dir: &Path,
    input: &Path,
    resolution: Resolution,
    pix_fmt: &str,
) -> PathBuf {
    tmp_dir.join(format!(
        "{}.ref_{resolution}.{pix_fmt}.yuv",
        source_stem(input)
    ))
}

/// Decodes `input` once into raw video at the reference geometry. An
/// existing file under the cache name is reused as is.
pub fn prepare_reference<R: ToolRunner>(
    runner: &R,
    config: &SweepConfig,
    input: &Path,
) -> Result<ReferenceSample, SweepError> {
    let source = probe_source(runner, &config.tools.ffprobe, input)?;
    debug!(
        "[ref] {}: {} {} @ {} fps, duration={:?}",
        input.display(),
        source.resolution,
        source.pix_fmt,
        source.framerate,
        source.duration_secs
    );

    let resolution = config.ref_resolution.unwrap_or(source.resolution);
    let path = reference_path(&config.tmp_dir, input, resolution, &config.ref_pix_fmt);
    let sample = ReferenceSample {
        source: input.to_path_buf(),
        path,
        resolution,
        pix_fmt: config.ref_pix_fmt.clone(),
        framerate: source.framerate,
        duration_secs: source.duration_secs,
    };

    if sample.path.is_file() {
        info!("[ref] reusing {}", sample.path.display());
        return Ok(sample);
    }

    // written under a scratch name so an interrupted run never leaves a
    // truncated file that a later run would reuse
    let partial = sample.path.with_extension("yuv.partial");
    let invocation = Invocation::new(
        &config.tools.ffmpeg,
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-s".to_string(),
            resolution.to_string(),
            "-pix_fmt".to_string(),
            sample.pix_fmt.clone(),
            "-f".to_string(),
            "rawvideo".to_string(),
            partial.to_string_lossy().to_string(),
        ],
    );
    info!("[ref] normalizing {} -> {}", input.display(), sample.path.display());
    let failed = |status: String| SweepError::ReferenceFailed {
        command: invocation.command_line(),
        status,
    };
    let output = runner
        .run(&invocation)
        .map_err(|err| failed(format!("spawn error: {err}")))?;
    if !output.success() {
        return Err(failed(output.status_text()));
    }
    fs::rename(&partial, &sample.path).map_err(|source| SweepError::Io {
        path: sample.path.clone(),
        source,
    })?;
    Ok(sample)
}
