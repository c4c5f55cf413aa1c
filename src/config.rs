use std::path::{Path, PathBuf};
use std::{fmt, fmt::Display};

use crate::contract::Resolution;

pub const DEFAULT_REF_PIX_FMT: &str = "yuv420p";
pub const DEFAULT_GOP_LENGTH: u32 = 600;
/// crf quality levels swept when none are given.
pub const DEFAULT_QUALITIES: &str = "23";

const LCEVC_TOOL_NAME: &str = "ffmpeg";
const VMAF_RUNNER_NAME: &str = "run_vmaf";

/// Locations of every external tool the sweep may invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub lcevc_enc_dir: Option<PathBuf>,
    pub lcevc_dec_dir: Option<PathBuf>,
    pub vmaf_dir: Option<PathBuf>,
    pub vmaf_model: Option<PathBuf>,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            lcevc_enc_dir: None,
            lcevc_dec_dir: None,
            vmaf_dir: None,
            vmaf_model: None,
        }
    }
}

impl ToolPaths {
    /// Transcoder build carrying the LCEVC encoder, and its library dir.
    #[must_use]
    pub fn lcevc_encoder(&self) -> Option<(PathBuf, PathBuf)> {
        self.lcevc_enc_dir
            .as_deref()
            .map(|dir| (dir.join(LCEVC_TOOL_NAME), dir.to_path_buf()))
    }

    /// Transcoder build carrying the LCEVC decoder, and its library dir.
    #[must_use]
    pub fn lcevc_decoder(&self) -> Option<(PathBuf, PathBuf)> {
        self.lcevc_dec_dir
            .as_deref()
            .map(|dir| (dir.join(LCEVC_TOOL_NAME), dir.to_path_buf()))
    }

    /// Standalone quality runner, only known when its directory is configured.
    #[must_use]
    pub fn vmaf_runner(&self) -> Option<PathBuf> {
        self.vmaf_dir.as_deref().map(|dir| dir.join(VMAF_RUNNER_NAME))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cleanup {
    #[default]
    Keep,
    /// Remove decoded and rescaled raw files after each combination.
    Raw,
    /// Also remove the encoded bitstream.
    All,
}

impl Display for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("keep"),
            Self::Raw => f.write_str("raw"),
            Self::All => f.write_str("all"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub tools: ToolPaths,
    pub tmp_dir: PathBuf,
    pub ref_resolution: Option<Resolution>,
    pub ref_pix_fmt: String,
    pub gop_length: u32,
    pub preset: Option<String>,
    pub cleanup: Cleanup,
}

impl SweepConfig {
    #[must_use]
    pub fn new(tools: ToolPaths, tmp_dir: impl AsRef<Path>) -> Self {
        Self {
            tools,
            tmp_dir: tmp_dir.as_ref().to_path_buf(),
            ref_resolution: None,
            ref_pix_fmt: DEFAULT_REF_PIX_FMT.to_string(),
            gop_length: DEFAULT_GOP_LENGTH,
            preset: None,
            cleanup: Cleanup::Keep,
        }
    }
}

impl Display for SweepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SweepConfig(tmp_dir={}, ref_resolution={}, ref_pix_fmt={}, gop_length={}, preset={:?}, cleanup={})",
            self.tmp_dir.display(),
            self.ref_resolution
                .map(|res| res.to_string())
                .unwrap_or_else(|| "source".to_string()),
            self.ref_pix_fmt,
            self.gop_length,
            self.preset,
            self.cleanup
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcevc_tools_resolve_inside_their_dirs() {
        let tools = ToolPaths {
            lcevc_enc_dir: Some(PathBuf::from("/opt/lcevc/enc")),
            lcevc_dec_dir: Some(PathBuf::from("/opt/lcevc/dec")),
            ..ToolPaths::default()
        };
        assert_eq!(
            tools.lcevc_encoder(),
            Some((
                PathBuf::from("/opt/lcevc/enc/ffmpeg"),
                PathBuf::from("/opt/lcevc/enc")
            ))
        );
        assert_eq!(
            tools.lcevc_decoder().map(|(tool, _)| tool),
            Some(PathBuf::from("/opt/lcevc/dec/ffmpeg"))
        );
        assert_eq!(ToolPaths::default().lcevc_encoder(), None);
    }

    #[test]
    fn vmaf_runner_requires_its_dir() {
        assert_eq!(ToolPaths::default().vmaf_runner(), None);
        let tools = ToolPaths {
            vmaf_dir: Some(PathBuf::from("/opt/vmaf")),
            ..ToolPaths::default()
        };
        assert_eq!(tools.vmaf_runner(), Some(PathBuf::from("/opt/vmaf/run_vmaf")));
    }
}
