use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fmt, fmt::Display};

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
}

impl Resolution {
    #[must_use]
    pub fn new(width: NonZeroU32, height: NonZeroU32) -> Self {
        Self { width, height }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = SweepError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || SweepError::InvalidAxisValue {
            axis: "resolution",
            value: raw.to_string(),
        };
        let (w, h) = raw.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<NonZeroU32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<NonZeroU32>().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

/// Frame rate as reported by the probe tool (`30000/1001`, `25/1`, `25`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: NonZeroU32,
}

impl FrameRate {
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        f64::from(self.num) / f64::from(self.den.get())
    }
}

impl Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for FrameRate {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (num, den) = raw.split_once('/').unwrap_or((raw, "1"));
        let num = num
            .parse::<u32>()
            .map_err(|_| format!("invalid frame rate numerator: {raw}"))?;
        let den = den
            .parse::<NonZeroU32>()
            .map_err(|_| format!("invalid frame rate denominator: {raw}"))?;
        if num == 0 {
            return Err(format!("zero frame rate: {raw}"));
        }
        Ok(Self { num, den })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RcMode {
    Cbr,
    Vbr,
    Crf,
}

impl RcMode {
    pub const ALL: [RcMode; 3] = [RcMode::Cbr, RcMode::Vbr, RcMode::Crf];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cbr => "cbr",
            Self::Vbr => "vbr",
            Self::Crf => "crf",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(wanted))
    }

    #[must_use]
    pub fn targets_bitrate(self) -> bool {
        !matches!(self, Self::Crf)
    }
}

impl Display for RcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    X264,
    X265,
    OpenH264,
    Vp8,
    Vp9,
    LibaomAv1,
    LibsvtAv1,
    Mjpeg,
    LcevcX264,
}

impl Codec {
    pub const ALL: [Codec; 9] = [
        Codec::X264,
        Codec::X265,
        Codec::OpenH264,
        Codec::Vp8,
        Codec::Vp9,
        Codec::LibaomAv1,
        Codec::LibsvtAv1,
        Codec::Mjpeg,
        Codec::LcevcX264,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X264 => "x264",
            Self::X265 => "x265",
            Self::OpenH264 => "openh264",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::LibaomAv1 => "libaom-av1",
            Self::LibsvtAv1 => "libsvtav1",
            Self::Mjpeg => "mjpeg",
            Self::LcevcX264 => "lcevc-x264",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, SweepError> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|codec| codec.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SweepError::UnsupportedCodec(raw.to_string()))
    }
}

impl Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point of the swept parameter space. Values are kept exactly as they
/// appeared on the axes so that result rows echo the user's spelling.
///
/// `bitrate` is the rate point: a kbps target for the bitrate-driven modes,
/// or a quality level taken from the qualities axis when the rcmode is crf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExperimentCombination {
    pub codec: String,
    pub resolution: String,
    pub bitrate: String,
    pub rcmode: String,
}

impl ExperimentCombination {
    #[must_use]
    pub fn is_quality_driven(&self) -> bool {
        RcMode::parse(&self.rcmode).is_some_and(|mode| !mode.targets_bitrate())
    }

    /// Filename fragment unique to this combination.
    #[must_use]
    pub fn file_tag(&self) -> String {
        let rate_axis = if self.is_quality_driven() {
            "quality"
        } else {
            "bitrate"
        };
        format!(
            "codec_{}.resolution_{}.{rate_axis}_{}.rcmode_{}",
            self.codec, self.resolution, self.bitrate, self.rcmode
        )
    }
}

impl Display for ExperimentCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Combination(codec={}, resolution={}, bitrate={}, rcmode={})",
            self.codec, self.resolution, self.bitrate, self.rcmode
        )
    }
}

/// Raw decoded rendition of one input, shared read-only by every combination.
#[derive(Debug, Clone)]
pub struct ReferenceSample {
    pub source: PathBuf,
    pub path: PathBuf,
    pub resolution: Resolution,
    pub pix_fmt: String,
    pub framerate: FrameRate,
    pub duration_secs: Option<f64>,
}

impl ReferenceSample {
    #[must_use]
    pub fn source_name(&self) -> String {
        file_name_of(&self.source)
    }

    /// Prefix of every working file derived from this input.
    #[must_use]
    pub fn source_stem(&self) -> String {
        source_stem(&self.source)
    }

    /// Input options describing a raw stream in the reference layout.
    #[must_use]
    pub fn raw_input_args(&self, path: &Path) -> Vec<String> {
        raw_input_args(&self.pix_fmt, self.resolution, self.framerate, path)
    }
}

impl Display for ReferenceSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReferenceSample(path={}, resolution={}, pix_fmt={}, framerate={}, duration={:?})",
            self.path.display(),
            self.resolution,
            self.pix_fmt,
            self.framerate,
            self.duration_secs
        )
    }
}

pub(crate) fn raw_input_args(
    pix_fmt: &str,
    resolution: Resolution,
    framerate: FrameRate,
    path: &Path,
) -> Vec<String> {
    vec![
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        pix_fmt.to_string(),
        "-s".to_string(),
        resolution.to_string(),
        "-r".to_string(),
        framerate.to_string(),
        "-i".to_string(),
        path.to_string_lossy().to_string(),
    ]
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// `clip.mp4.1a2b3c4d`: the file name followed by the first 8 hex digits of
/// a SHA-256 over the absolute input path. Inputs sharing a file name in
/// different directories get distinct working files.
pub(crate) fn source_stem(path: &Path) -> String {
    let full = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(full.as_os_str().as_encoded_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}.{}", file_name_of(path), &digest[..8])
}

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Prepended to the dynamic-library search path of the child process.
    pub library_path: Option<PathBuf>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            library_path: None,
        }
    }

    #[must_use]
    pub fn with_library_path(mut self, library_path: Option<PathBuf>) -> Self {
        self.library_path = library_path;
        self
    }

    /// Shell-like rendering used in diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = String::new();
        if let Some(dir) = &self.library_path {
            line.push_str(&format!("LD_LIBRARY_PATH={} ", quote(&dir.to_string_lossy())));
        }
        line.push_str(&quote(&self.program.to_string_lossy()));
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateControl {
    pub mode: RcMode,
    pub bitrate_kbps: u32,
    pub min_kbps: Option<u32>,
    pub max_kbps: Option<u32>,
    pub buffer_kbps: Option<u32>,
    pub crf: Option<u32>,
}

impl RateControl {
    /// `target` is the kbps goal for cbr/vbr and the quality level for crf.
    #[must_use]
    pub fn new(mode: RcMode, target: u32) -> Self {
        let bitrate_kbps = target;
        match mode {
            RcMode::Cbr => Self {
                mode,
                bitrate_kbps,
                min_kbps: Some(bitrate_kbps),
                max_kbps: Some(bitrate_kbps),
                buffer_kbps: Some(bitrate_kbps.saturating_mul(2)),
                crf: None,
            },
            RcMode::Vbr => Self {
                mode,
                bitrate_kbps,
                min_kbps: None,
                max_kbps: Some(bitrate_kbps.saturating_mul(2)),
                buffer_kbps: Some(bitrate_kbps.saturating_mul(2)),
                crf: None,
            },
            RcMode::Crf => Self {
                mode,
                bitrate_kbps: 0,
                min_kbps: None,
                max_kbps: None,
                buffer_kbps: None,
                crf: Some(target),
            },
        }
    }
}

/// Codec-specific encode invocation derived from one combination.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSpec {
    pub codec: Codec,
    pub tool: PathBuf,
    pub library_path: Option<PathBuf>,
    pub codec_selector: String,
    pub rate_control: RateControl,
    pub gop_length: u32,
    pub resolution: Resolution,
    pub output: PathBuf,
    pub args: Vec<String>,
}

impl EncodeSpec {
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation::new(&self.tool, self.args.clone()).with_library_path(self.library_path.clone())
    }
}

/// Decode invocation matching an [`EncodeSpec`]; output is raw video in the
/// reference pixel format at the encoded resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeSpec {
    pub tool: PathBuf,
    pub library_path: Option<PathBuf>,
    pub resolution: Resolution,
    pub output: PathBuf,
    pub args: Vec<String>,
}

impl DecodeSpec {
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation::new(&self.tool, self.args.clone()).with_library_path(self.library_path.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("invalid {axis} value: {value:?}")]
    InvalidAxisValue { axis: &'static str, value: String },
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("codec {codec} does not support rcmode {rcmode}")]
    UnsupportedRcMode { codec: String, rcmode: String },
    #[error("encode failed ({status}): {command}")]
    EncodeFailed { command: String, status: String },
    #[error("decode failed ({status}): {command}")]
    DecodeFailed { command: String, status: String },
    #[error("{metric} score not found in tool output")]
    MetricParseFailure { metric: &'static str },
    #[error("invalid duration for {path}: {duration:?}")]
    InvalidDuration { path: PathBuf, duration: Option<f64> },
    #[error("missing external tool {tool}: {path}")]
    MissingExternalTool { tool: &'static str, path: PathBuf },
    #[error("reference generation failed ({status}): {command}")]
    ReferenceFailed { command: String, status: String },
    #[error("failed to probe {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },
    #[error("io error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write result row")]
    ReportWrite(#[source] std::io::Error),
}

impl SweepError {
    /// Combination- and field-level failures never abort the sweep.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedCodec(_)
                | Self::UnsupportedRcMode { .. }
                | Self::EncodeFailed { .. }
                | Self::DecodeFailed { .. }
                | Self::MetricParseFailure { .. }
                | Self::InvalidDuration { .. }
        )
    }
}
