use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::{fmt, fmt::Display};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::ToolPaths;
use crate::contract::{DecodeSpec, Invocation, ReferenceSample, SweepError, raw_input_args};
use crate::runner::ToolRunner;

static PSNR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PSNR\s.*?\by:\s*([0-9]+(?:\.[0-9]*)?|inf)").unwrap());
static SSIM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SSIM\s.*?\bY:\s*([0-9]+(?:\.[0-9]*)?)").unwrap());
static VMAF_FILTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VMAF score:\s*([0-9]+(?:\.[0-9]*)?)").unwrap());
static VMAF_RUNNER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Aggregate.*\bVMAF_score:\s*([0-9]+(?:\.[0-9]*)?)").unwrap());

/// Scaler used for every rescale so results stay comparable across runs.
const SCALE_FLAGS: &str = "bicubic";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityScores {
    pub psnr: Option<f64>,
    pub ssim: Option<f64>,
    pub vmaf: Option<f64>,
}

/// How VMAF is computed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmafPath {
    /// The transcoder's own `libvmaf` filter.
    Integrated { model: Option<PathBuf> },
    /// A separate runner fed the two raw files.
    Standalone {
        runner: PathBuf,
        model: Option<PathBuf>,
    },
}

impl Display for VmafPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integrated { model } => write!(f, "integrated(model={model:?})"),
            Self::Standalone { runner, model } => {
                write!(f, "standalone(runner={}, model={model:?})", runner.display())
            }
        }
    }
}

impl VmafPath {
    /// Prefers the transcoder's filter; falls back to the standalone runner.
    pub fn detect<R: ToolRunner>(runner: &R, tools: &ToolPaths) -> Result<Self, SweepError> {
        let invocation = Invocation::new(
            &tools.ffmpeg,
            vec!["-hide_banner".to_string(), "-filters".to_string()],
        );
        let output = runner
            .run(&invocation)
            .map_err(|_| SweepError::MissingExternalTool {
                tool: "ffmpeg",
                path: tools.ffmpeg.clone(),
            })?;

        if output.success() && lists_vmaf_filter(&output.stdout) {
            return Ok(Self::Integrated {
                model: tools.vmaf_model.clone(),
            });
        }
        debug!("ffmpeg build has no libvmaf filter");

        match tools.vmaf_runner() {
            Some(path) if path.is_file() => Ok(Self::Standalone {
                runner: path,
                model: tools.vmaf_model.clone(),
            }),
            Some(path) => Err(SweepError::MissingExternalTool {
                tool: "vmaf runner",
                path,
            }),
            None => Err(SweepError::MissingExternalTool {
                tool: "vmaf runner",
                path: PathBuf::from("$VMAF_DIR"),
            }),
        }
    }
}

fn lists_vmaf_filter(filters: &str) -> bool {
    filters.lines().any(|line| {
        line.split_whitespace()
            .nth(1)
            .is_some_and(|name| name == "libvmaf")
    })
}

/// Rescales decoded output to the reference layout and scores it.
#[derive(Debug, Clone)]
pub struct QualityAssessor {
    ffmpeg: PathBuf,
    vmaf: VmafPath,
}

impl QualityAssessor {
    #[must_use]
    pub fn new(ffmpeg: PathBuf, vmaf: VmafPath) -> Self {
        Self { ffmpeg, vmaf }
    }

    #[must_use]
    pub fn vmaf_path(&self) -> &VmafPath {
        &self.vmaf
    }

    /// Metric failures only blank their own field.
    pub fn assess<R: ToolRunner>(
        &self,
        runner: &R,
        reference: &ReferenceSample,
        decoded: &DecodeSpec,
        scaled: &Path,
    ) -> QualityScores {
        if let Err(err) = self.rescale(runner, reference, decoded, scaled) {
            warn!("rescale failed, no quality scores: {err}");
            return QualityScores::default();
        }

        let psnr = self.score(runner, "psnr", self.compare(reference, scaled, "psnr"), parse_psnr);
        let ssim = self.score(runner, "ssim", self.compare(reference, scaled, "ssim"), parse_ssim);
        let vmaf = match &self.vmaf {
            VmafPath::Integrated { model } => {
                let filter = match model {
                    Some(path) => format!("libvmaf=model=path={}", escape_filter_value(path)),
                    None => "libvmaf".to_string(),
                };
                self.score(
                    runner,
                    "vmaf",
                    self.compare(reference, scaled, &filter),
                    parse_vmaf_filter,
                )
            }
            VmafPath::Standalone {
                runner: program,
                model,
            } => {
                let mut args = vec![
                    reference.pix_fmt.clone(),
                    reference.resolution.width.to_string(),
                    reference.resolution.height.to_string(),
                    reference.path.to_string_lossy().to_string(),
                    scaled.to_string_lossy().to_string(),
                ];
                if let Some(path) = model {
                    args.push("--model".to_string());
                    args.push(path.to_string_lossy().to_string());
                }
                self.score(
                    runner,
                    "vmaf",
                    Invocation::new(program, args),
                    parse_vmaf_runner,
                )
            }
        };

        QualityScores { psnr, ssim, vmaf }
    }

    fn rescale<R: ToolRunner>(
        &self,
        runner: &R,
        reference: &ReferenceSample,
        decoded: &DecodeSpec,
        scaled: &Path,
    ) -> Result<(), String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostats".to_string(),
        ];
        args.extend(raw_input_args(
            &reference.pix_fmt,
            decoded.resolution,
            reference.framerate,
            &decoded.output,
        ));
        args.extend([
            "-vf".to_string(),
            format!(
                "scale={}:{}:flags={SCALE_FLAGS}",
                reference.resolution.width, reference.resolution.height
            ),
            "-pix_fmt".to_string(),
            reference.pix_fmt.clone(),
            "-f".to_string(),
            "rawvideo".to_string(),
            scaled.to_string_lossy().to_string(),
        ]);
        let invocation = Invocation::new(&self.ffmpeg, args);
        debug!("scaling {} -> {}", decoded.output.display(), scaled.display());
        match runner.run(&invocation) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(format!("{} ({})", invocation.command_line(), output.status_text())),
            Err(err) => Err(format!("{}: {err}", invocation.command_line())),
        }
    }

    /// Filter graph run over (distorted, reference); libvmaf expects that order.
    fn compare(&self, reference: &ReferenceSample, scaled: &Path, filter: &str) -> Invocation {
        let mut args = vec!["-hide_banner".to_string(), "-nostats".to_string()];
        args.extend(reference.raw_input_args(scaled));
        args.extend(reference.raw_input_args(&reference.path));
        args.extend([
            "-filter_complex".to_string(),
            format!("[0:v][1:v]{filter}"),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]);
        Invocation::new(&self.ffmpeg, args)
    }

    fn score<R: ToolRunner>(
        &self,
        runner: &R,
        metric: &'static str,
        invocation: Invocation,
        parse: fn(&str) -> Result<f64, SweepError>,
    ) -> Option<f64> {
        let output = match runner.run(&invocation) {
            Ok(output) => output,
            Err(err) => {
                warn!("{metric}: cannot run {}: {err}", invocation.program.display());
                return None;
            }
        };
        if !output.success() {
            debug!("{metric}: {} ({})", invocation.command_line(), output.status_text());
        }
        match parse(&output.text()) {
            Ok(value) => {
                info!("{metric} = {value}");
                Some(value)
            }
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }
}

fn last_capture(pattern: &Regex, metric: &'static str, text: &str) -> Result<f64, SweepError> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .last()
        .ok_or(SweepError::MetricParseFailure { metric })
}

/// Luma PSNR from the filter summary (`PSNR y:41.25 u:... average:...`).
pub fn parse_psnr(text: &str) -> Result<f64, SweepError> {
    last_capture(&PSNR_LINE, "psnr", text)
}

/// Luma SSIM from the filter summary (`SSIM Y:0.985 (18.2) U:... All:...`).
pub fn parse_ssim(text: &str) -> Result<f64, SweepError> {
    last_capture(&SSIM_LINE, "ssim", text)
}

pub fn parse_vmaf_filter(text: &str) -> Result<f64, SweepError> {
    last_capture(&VMAF_FILTER_LINE, "vmaf", text)
}

pub fn parse_vmaf_runner(text: &str) -> Result<f64, SweepError> {
    last_capture(&VMAF_RUNNER_LINE, "vmaf", text)
}

fn escape_filter_value(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}
