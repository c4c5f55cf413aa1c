use std::path::{Path, PathBuf};

use crate::axis::{parse_bitrate_kbps, parse_quality};
use crate::config::{SweepConfig, ToolPaths};
use crate::contract::{
    Codec, DecodeSpec, EncodeSpec, ExperimentCombination, RateControl, RcMode, ReferenceSample,
    Resolution, SweepError,
};

/// Everything an adapter needs to build the encode side of one combination.
#[derive(Debug, Clone)]
pub struct EncodeRequest<'a> {
    pub reference: &'a ReferenceSample,
    pub resolution: Resolution,
    pub rate_control: RateControl,
    pub gop_length: u32,
    pub preset: Option<&'a str>,
    pub output: PathBuf,
}

/// Maps a logical combination onto one codec's tool syntax. Building specs
/// never spawns a process.
pub trait CodecAdapter {
    fn codec(&self) -> Codec;

    fn supported_rcmodes(&self) -> &'static [RcMode];

    /// Container extension of the encoded bitstream, dot included.
    fn extension(&self) -> &'static str;

    fn encode_spec(&self, request: &EncodeRequest<'_>) -> Result<EncodeSpec, SweepError>;

    fn decode_spec(
        &self,
        encoded: &EncodeSpec,
        reference: &ReferenceSample,
        output: PathBuf,
    ) -> Result<DecodeSpec, SweepError>;

    fn supports(&self, mode: RcMode) -> bool {
        self.supported_rcmodes().contains(&mode)
    }
}

#[must_use]
pub fn adapter_for(codec: Codec, tools: &ToolPaths) -> Box<dyn CodecAdapter + '_> {
    match codec {
        Codec::Mjpeg => Box::new(MjpegAdapter { tools }),
        Codec::LcevcX264 => Box::new(LcevcAdapter { tools }),
        other => Box::new(LibavAdapter {
            tools,
            profile: libav_profile(other),
        }),
    }
}

/// Working files of one combination. Names embed the input's path stem and
/// the full combination so no two combinations share a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkFiles {
    pub encoded: PathBuf,
    pub decoded: PathBuf,
    pub scaled: PathBuf,
}

impl WorkFiles {
    #[must_use]
    pub fn new(
        work_dir: &Path,
        reference: &ReferenceSample,
        combination: &ExperimentCombination,
        extension: &str,
    ) -> Self {
        let encoded_name = format!(
            "{}.{}{}",
            reference.source_stem(),
            combination.file_tag(),
            extension
        );
        let decoded_name = format!("{encoded_name}.yuv");
        let scaled_name = format!(
            "{decoded_name}.scaled.resolution_{}.yuv",
            reference.resolution
        );
        Self {
            encoded: work_dir.join(encoded_name),
            decoded: work_dir.join(decoded_name),
            scaled: work_dir.join(scaled_name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CombinationPlan {
    pub codec: Codec,
    pub rcmode: RcMode,
    pub files: WorkFiles,
    pub encode: EncodeSpec,
    pub decode: DecodeSpec,
}

/// Resolves codec and rcmode names and asks the codec's adapter for the
/// encode/decode pair.
pub fn plan_combination(
    combination: &ExperimentCombination,
    reference: &ReferenceSample,
    config: &SweepConfig,
) -> Result<CombinationPlan, SweepError> {
    let codec = Codec::parse(&combination.codec)?;
    let adapter = adapter_for(codec, &config.tools);
    let unsupported = || SweepError::UnsupportedRcMode {
        codec: combination.codec.clone(),
        rcmode: combination.rcmode.clone(),
    };
    let rcmode = RcMode::parse(&combination.rcmode).ok_or_else(unsupported)?;
    if !adapter.supports(rcmode) {
        return Err(unsupported());
    }

    let resolution = combination.resolution.parse::<Resolution>()?;
    let target = if rcmode.targets_bitrate() {
        parse_bitrate_kbps(&combination.bitrate)?
    } else {
        parse_quality(&combination.bitrate)?
    };
    let files = WorkFiles::new(&config.tmp_dir, reference, combination, adapter.extension());

    let request = EncodeRequest {
        reference,
        resolution,
        rate_control: RateControl::new(rcmode, target),
        gop_length: config.gop_length,
        preset: config.preset.as_deref(),
        output: files.encoded.clone(),
    };
    let encode = adapter.encode_spec(&request)?;
    let decode = adapter.decode_spec(&encode, reference, files.decoded.clone())?;

    Ok(CombinationPlan {
        codec,
        rcmode,
        files,
        encode,
        decode,
    })
}

#[derive(Debug)]
struct LibavProfile {
    codec: Codec,
    encoder: &'static str,
    extension: &'static str,
    rcmodes: &'static [RcMode],
    preset_flag: Option<&'static str>,
    disable_bframes: bool,
    /// `-b:v` paired with `-crf`. libvpx-vp9 and libaom are unconstrained
    /// at 0; VP8 only has constrained quality, so it gets a ceiling above
    /// any swept rate instead of the encoder's 256k default.
    crf_bitrate: Option<&'static str>,
    extra: &'static [(&'static str, &'static str)],
}

const ALL_MODES: &[RcMode] = &[RcMode::Cbr, RcMode::Vbr, RcMode::Crf];
const BITRATE_MODES: &[RcMode] = &[RcMode::Cbr, RcMode::Vbr];
const AV1_MODES: &[RcMode] = &[RcMode::Vbr, RcMode::Crf];

const LIBAV_PROFILES: &[LibavProfile] = &[
    LibavProfile {
        codec: Codec::X264,
        encoder: "libx264",
        extension: ".mp4",
        rcmodes: ALL_MODES,
        preset_flag: Some("-preset"),
        disable_bframes: true,
        crf_bitrate: None,
        extra: &[],
    },
    LibavProfile {
        codec: Codec::X265,
        encoder: "libx265",
        extension: ".mp4",
        rcmodes: ALL_MODES,
        preset_flag: Some("-preset"),
        disable_bframes: true,
        crf_bitrate: None,
        extra: &[],
    },
    LibavProfile {
        codec: Codec::OpenH264,
        encoder: "libopenh264",
        extension: ".mp4",
        rcmodes: BITRATE_MODES,
        preset_flag: Some("-complexity"),
        disable_bframes: false,
        crf_bitrate: None,
        extra: &[],
    },
    LibavProfile {
        codec: Codec::Vp8,
        encoder: "libvpx",
        extension: ".webm",
        rcmodes: ALL_MODES,
        preset_flag: Some("-cpu-used"),
        disable_bframes: false,
        crf_bitrate: Some("100M"),
        extra: &[("-deadline", "realtime")],
    },
    LibavProfile {
        codec: Codec::Vp9,
        encoder: "libvpx-vp9",
        extension: ".webm",
        rcmodes: ALL_MODES,
        preset_flag: Some("-cpu-used"),
        disable_bframes: false,
        crf_bitrate: Some("0"),
        extra: &[("-deadline", "realtime"), ("-qmin", "2"), ("-qmax", "56")],
    },
    LibavProfile {
        codec: Codec::LibaomAv1,
        encoder: "libaom-av1",
        extension: ".mp4",
        rcmodes: AV1_MODES,
        preset_flag: Some("-cpu-used"),
        disable_bframes: false,
        crf_bitrate: Some("0"),
        extra: &[("-strict", "experimental")],
    },
    LibavProfile {
        codec: Codec::LibsvtAv1,
        encoder: "libsvtav1",
        extension: ".mp4",
        rcmodes: AV1_MODES,
        preset_flag: Some("-preset"),
        disable_bframes: false,
        crf_bitrate: None,
        extra: &[],
    },
];

fn libav_profile(codec: Codec) -> &'static LibavProfile {
    LIBAV_PROFILES
        .iter()
        .find(|profile| profile.codec == codec)
        .unwrap_or(&LIBAV_PROFILES[0])
}

fn kbps_flag(kbps: u32) -> String {
    format!("{kbps}k")
}

fn push_pair(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

fn encoder_prelude(reference: &ReferenceSample) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-nostats".to_string(),
    ];
    args.extend(reference.raw_input_args(&reference.path));
    args
}

fn libav_decode_args(encoded: &Path, reference: &ReferenceSample, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-nostats".to_string(),
        "-i".to_string(),
        encoded.to_string_lossy().to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        reference.pix_fmt.clone(),
        output.to_string_lossy().to_string(),
    ]
}

/// Encoders hosted inside the transcoding tool, selected with `-c:v`.
struct LibavAdapter<'a> {
    tools: &'a ToolPaths,
    profile: &'static LibavProfile,
}

impl LibavAdapter<'_> {
    fn rate_control_args(&self, rc: &RateControl, args: &mut Vec<String>) {
        match rc.mode {
            RcMode::Cbr | RcMode::Vbr => {
                push_pair(args, "-b:v", kbps_flag(rc.bitrate_kbps));
                if let Some(min) = rc.min_kbps {
                    push_pair(args, "-minrate", kbps_flag(min));
                }
                if let Some(max) = rc.max_kbps {
                    push_pair(args, "-maxrate", kbps_flag(max));
                }
                if let Some(buffer) = rc.buffer_kbps {
                    push_pair(args, "-bufsize", kbps_flag(buffer));
                }
            }
            RcMode::Crf => {
                if let Some(crf) = rc.crf {
                    push_pair(args, "-crf", crf.to_string());
                }
                if let Some(cap) = self.profile.crf_bitrate {
                    push_pair(args, "-b:v", cap);
                }
            }
        }
    }
}

impl CodecAdapter for LibavAdapter<'_> {
    fn codec(&self) -> Codec {
        self.profile.codec
    }

    fn supported_rcmodes(&self) -> &'static [RcMode] {
        self.profile.rcmodes
    }

    fn extension(&self) -> &'static str {
        self.profile.extension
    }

    fn encode_spec(&self, request: &EncodeRequest<'_>) -> Result<EncodeSpec, SweepError> {
        let mut args = encoder_prelude(request.reference);
        push_pair(&mut args, "-c:v", self.profile.encoder);
        self.rate_control_args(&request.rate_control, &mut args);
        if self.profile.disable_bframes {
            push_pair(&mut args, "-bf", "0");
        }
        if let (Some(flag), Some(preset)) = (self.profile.preset_flag, request.preset) {
            push_pair(&mut args, flag, preset);
        }
        push_pair(&mut args, "-s", request.resolution.to_string());
        push_pair(&mut args, "-g", request.gop_length.to_string());
        for (flag, value) in self.profile.extra {
            push_pair(&mut args, flag, *value);
        }
        args.push(request.output.to_string_lossy().to_string());

        Ok(EncodeSpec {
            codec: self.profile.codec,
            tool: self.tools.ffmpeg.clone(),
            library_path: None,
            codec_selector: self.profile.encoder.to_string(),
            rate_control: request.rate_control,
            gop_length: request.gop_length,
            resolution: request.resolution,
            output: request.output.clone(),
            args,
        })
    }

    fn decode_spec(
        &self,
        encoded: &EncodeSpec,
        reference: &ReferenceSample,
        output: PathBuf,
    ) -> Result<DecodeSpec, SweepError> {
        Ok(DecodeSpec {
            tool: self.tools.ffmpeg.clone(),
            library_path: None,
            resolution: encoded.resolution,
            args: libav_decode_args(&encoded.output, reference, &output),
            output,
        })
    }
}

/// Intra-only JPEG; average-bitrate targeting is the only control it offers.
struct MjpegAdapter<'a> {
    tools: &'a ToolPaths,
}

impl CodecAdapter for MjpegAdapter<'_> {
    fn codec(&self) -> Codec {
        Codec::Mjpeg
    }

    fn supported_rcmodes(&self) -> &'static [RcMode] {
        &[RcMode::Vbr]
    }

    fn extension(&self) -> &'static str {
        ".mp4"
    }

    fn encode_spec(&self, request: &EncodeRequest<'_>) -> Result<EncodeSpec, SweepError> {
        let rc = &request.rate_control;
        let mut args = encoder_prelude(request.reference);
        push_pair(&mut args, "-c:v", "mjpeg");
        push_pair(&mut args, "-pix_fmt", "yuvj420p");
        push_pair(&mut args, "-b:v", kbps_flag(rc.bitrate_kbps));
        if let Some(max) = rc.max_kbps {
            push_pair(&mut args, "-maxrate", kbps_flag(max));
        }
        if let Some(buffer) = rc.buffer_kbps {
            push_pair(&mut args, "-bufsize", kbps_flag(buffer));
        }
        push_pair(&mut args, "-s", request.resolution.to_string());
        args.push(request.output.to_string_lossy().to_string());

        Ok(EncodeSpec {
            codec: Codec::Mjpeg,
            tool: self.tools.ffmpeg.clone(),
            library_path: None,
            codec_selector: "mjpeg".to_string(),
            rate_control: *rc,
            gop_length: 1,
            resolution: request.resolution,
            output: request.output.clone(),
            args,
        })
    }

    fn decode_spec(
        &self,
        encoded: &EncodeSpec,
        reference: &ReferenceSample,
        output: PathBuf,
    ) -> Result<DecodeSpec, SweepError> {
        Ok(DecodeSpec {
            tool: self.tools.ffmpeg.clone(),
            library_path: None,
            resolution: encoded.resolution,
            args: libav_decode_args(&encoded.output, reference, &output),
            output,
        })
    }
}

/// LCEVC enhancement over an x264 base layer. Encoder and decoder live in
/// separate transcoder builds, each with its own shared libraries.
struct LcevcAdapter<'a> {
    tools: &'a ToolPaths,
}

impl LcevcAdapter<'_> {
    /// `eil_params` rate values are bits per second.
    fn eil_params(rc: &RateControl) -> String {
        let bps = |kbps: u32| u64::from(kbps) * 1000;
        let mut params = vec![
            format!("rc_pcrf_base_rc_mode={}", rc.mode),
            format!("rc_bitrate={}", bps(rc.bitrate_kbps)),
        ];
        if let Some(max) = rc.max_kbps {
            params.push(format!("rc_max_bitrate={}", bps(max)));
        }
        if let Some(buffer) = rc.buffer_kbps {
            params.push(format!("rc_buffer_size={}", bps(buffer)));
        }
        params.join(";")
    }
}

impl CodecAdapter for LcevcAdapter<'_> {
    fn codec(&self) -> Codec {
        Codec::LcevcX264
    }

    fn supported_rcmodes(&self) -> &'static [RcMode] {
        BITRATE_MODES
    }

    fn extension(&self) -> &'static str {
        ".mp4"
    }

    fn encode_spec(&self, request: &EncodeRequest<'_>) -> Result<EncodeSpec, SweepError> {
        let (tool, library_dir) =
            self.tools
                .lcevc_encoder()
                .ok_or_else(|| SweepError::MissingExternalTool {
                    tool: "lcevc encoder",
                    path: PathBuf::from("$LCEVC_ENC_DIR"),
                })?;
        let rc = &request.rate_control;
        let mut args = encoder_prelude(request.reference);
        push_pair(&mut args, "-c:v", "pplcevc");
        push_pair(&mut args, "-base_encoder", "x264");
        push_pair(&mut args, "-eil_params", Self::eil_params(rc));
        push_pair(&mut args, "-s", request.resolution.to_string());
        push_pair(&mut args, "-g", request.gop_length.to_string());
        args.push(request.output.to_string_lossy().to_string());

        Ok(EncodeSpec {
            codec: Codec::LcevcX264,
            tool,
            library_path: Some(library_dir),
            codec_selector: "pplcevc".to_string(),
            rate_control: *rc,
            gop_length: request.gop_length,
            resolution: request.resolution,
            output: request.output.clone(),
            args,
        })
    }

    fn decode_spec(
        &self,
        encoded: &EncodeSpec,
        reference: &ReferenceSample,
        output: PathBuf,
    ) -> Result<DecodeSpec, SweepError> {
        let (tool, library_dir) =
            self.tools
                .lcevc_decoder()
                .ok_or_else(|| SweepError::MissingExternalTool {
                    tool: "lcevc decoder",
                    path: PathBuf::from("$LCEVC_DEC_DIR"),
                })?;
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostats".to_string(),
        ];
        push_pair(&mut args, "-vcodec", "lcevc_h264");
        let plain = libav_decode_args(&encoded.output, reference, &output);
        args.extend(plain.into_iter().skip(3));

        Ok(DecodeSpec {
            tool,
            library_path: Some(library_dir),
            resolution: encoded.resolution,
            args,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use rstest::rstest;

    use super::*;
    use crate::contract::FrameRate;

    fn reference() -> ReferenceSample {
        ReferenceSample {
            source: PathBuf::from("/media/clip.mp4"),
            path: PathBuf::from("/work/clip.mp4.ref_1280x720.yuv"),
            resolution: "1280x720".parse().unwrap(),
            pix_fmt: "yuv420p".to_string(),
            framerate: FrameRate {
                num: 30,
                den: NonZeroU32::MIN,
            },
            duration_secs: Some(10.0),
        }
    }

    fn config() -> SweepConfig {
        let tools = ToolPaths {
            lcevc_enc_dir: Some(PathBuf::from("/opt/lcevc/enc")),
            lcevc_dec_dir: Some(PathBuf::from("/opt/lcevc/dec")),
            ..ToolPaths::default()
        };
        SweepConfig::new(tools, "/work")
    }

    fn combination(codec: &str, rcmode: &str) -> ExperimentCombination {
        ExperimentCombination {
            codec: codec.to_string(),
            resolution: "216x120".to_string(),
            bitrate: "35".to_string(),
            rcmode: rcmode.to_string(),
        }
    }

    fn crf(codec: &str, quality: &str) -> ExperimentCombination {
        ExperimentCombination {
            bitrate: quality.to_string(),
            ..combination(codec, "crf")
        }
    }

    /// Last occurrence wins; raw input options come first on the line.
    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .rposition(|arg| arg == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn x264_cbr_maps_onto_ffmpeg_flags() {
        let plan = plan_combination(&combination("x264", "cbr"), &reference(), &config()).unwrap();
        let args = &plan.encode.args;
        assert_eq!(plan.encode.tool, PathBuf::from("ffmpeg"));
        assert_eq!(flag_value(args, "-c:v"), Some("libx264"));
        assert_eq!(flag_value(args, "-b:v"), Some("35k"));
        assert_eq!(flag_value(args, "-minrate"), Some("35k"));
        assert_eq!(flag_value(args, "-maxrate"), Some("35k"));
        assert_eq!(flag_value(args, "-bufsize"), Some("70k"));
        assert_eq!(flag_value(args, "-bf"), Some("0"));
        assert_eq!(flag_value(args, "-s"), Some("216x120"));
        assert_eq!(flag_value(args, "-g"), Some("600"));
        assert_eq!(flag_value(args, "-pix_fmt"), Some("yuv420p"));
        let expected = format!(
            "/work/{}.codec_x264.resolution_216x120.bitrate_35.rcmode_cbr.mp4",
            reference().source_stem()
        );
        assert_eq!(args.last(), Some(&expected));
    }

    #[test]
    fn building_a_plan_twice_is_identical() {
        let combo = combination("vp9", "vbr");
        let first = plan_combination(&combo, &reference(), &config()).unwrap();
        let second = plan_combination(&combo, &reference(), &config()).unwrap();
        assert_eq!(first.encode, second.encode);
        assert_eq!(first.decode, second.decode);
        assert_eq!(first.files, second.files);
    }

    #[rstest]
    #[case("mjpeg", "cbr")]
    #[case("mjpeg", "crf")]
    #[case("openh264", "crf")]
    #[case("libaom-av1", "cbr")]
    #[case("libsvtav1", "cbr")]
    #[case("lcevc-x264", "crf")]
    #[case("x264", "abr")]
    fn unsupported_rcmode_is_rejected(#[case] codec: &str, #[case] rcmode: &str) {
        let err = plan_combination(&combination(codec, rcmode), &reference(), &config())
            .unwrap_err();
        assert!(err.is_recoverable());
        match err {
            SweepError::UnsupportedRcMode {
                codec: got_codec,
                rcmode: got_mode,
            } => {
                assert_eq!(got_codec, codec);
                assert_eq!(got_mode, rcmode);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_codec_is_recoverable() {
        let err = plan_combination(&combination("h266", "cbr"), &reference(), &config())
            .unwrap_err();
        assert!(matches!(err, SweepError::UnsupportedCodec(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn every_codec_supports_at_least_one_mode() {
        let tools = ToolPaths::default();
        for codec in Codec::ALL {
            let adapter = adapter_for(codec, &tools);
            assert_eq!(adapter.codec(), codec);
            assert!(!adapter.supported_rcmodes().is_empty(), "{codec}");
        }
    }

    #[test]
    fn crf_uses_quality_and_zero_bitrate_for_libvpx() {
        let plan = plan_combination(&crf("vp9", "23"), &reference(), &config()).unwrap();
        assert_eq!(flag_value(&plan.encode.args, "-crf"), Some("23"));
        assert_eq!(flag_value(&plan.encode.args, "-b:v"), Some("0"));
        assert_eq!(flag_value(&plan.encode.args, "-deadline"), Some("realtime"));
        assert_eq!(plan.files.encoded.extension().unwrap(), "webm");
    }

    #[test]
    fn crf_quality_levels_give_distinct_encodes() {
        let low = plan_combination(&crf("x264", "23"), &reference(), &config()).unwrap();
        let high = plan_combination(&crf("x264", "35"), &reference(), &config()).unwrap();
        assert_eq!(flag_value(&low.encode.args, "-crf"), Some("23"));
        assert_eq!(flag_value(&high.encode.args, "-crf"), Some("35"));
        assert_eq!(flag_value(&low.encode.args, "-b:v"), None);
        assert_ne!(low.files.encoded, high.files.encoded);
    }

    #[test]
    fn crf_quality_must_be_an_integer() {
        let err = plan_combination(&crf("x264", "high"), &reference(), &config()).unwrap_err();
        assert!(matches!(err, SweepError::InvalidAxisValue { axis: "quality", .. }));
    }

    #[rstest]
    #[case("vp8", Some("100M"))]
    #[case("vp9", Some("0"))]
    #[case("libaom-av1", Some("0"))]
    #[case("x265", None)]
    #[case("libsvtav1", None)]
    fn crf_bitrate_follows_the_encoder(#[case] codec: &str, #[case] expected: Option<&str>) {
        let plan = plan_combination(&crf(codec, "30"), &reference(), &config()).unwrap();
        assert_eq!(flag_value(&plan.encode.args, "-crf"), Some("30"));
        assert_eq!(flag_value(&plan.encode.args, "-b:v"), expected);
    }

    #[test]
    fn preset_uses_codec_specific_flag() {
        let mut config = config();
        config.preset = Some("4".to_string());
        let plan = plan_combination(&combination("vp8", "vbr"), &reference(), &config).unwrap();
        assert_eq!(flag_value(&plan.encode.args, "-cpu-used"), Some("4"));
        assert_eq!(flag_value(&plan.encode.args, "-preset"), None);
    }

    #[test]
    fn lcevc_uses_dedicated_tools_and_bits_per_second() {
        let plan =
            plan_combination(&combination("lcevc-x264", "cbr"), &reference(), &config()).unwrap();
        assert_eq!(plan.encode.tool, PathBuf::from("/opt/lcevc/enc/ffmpeg"));
        assert_eq!(plan.encode.library_path, Some(PathBuf::from("/opt/lcevc/enc")));
        assert_eq!(
            flag_value(&plan.encode.args, "-eil_params"),
            Some("rc_pcrf_base_rc_mode=cbr;rc_bitrate=35000;rc_max_bitrate=35000;rc_buffer_size=70000")
        );
        assert_eq!(plan.decode.tool, PathBuf::from("/opt/lcevc/dec/ffmpeg"));
        assert_eq!(plan.decode.library_path, Some(PathBuf::from("/opt/lcevc/dec")));
        assert_eq!(flag_value(&plan.decode.args, "-vcodec"), Some("lcevc_h264"));
        assert_eq!(
            plan.decode.invocation().command_line().split(' ').next(),
            Some("LD_LIBRARY_PATH=/opt/lcevc/dec")
        );
    }

    #[test]
    fn lcevc_without_tool_dirs_is_reported() {
        let config = SweepConfig::new(ToolPaths::default(), "/work");
        let err = plan_combination(&combination("lcevc-x264", "cbr"), &reference(), &config)
            .unwrap_err();
        assert!(matches!(err, SweepError::MissingExternalTool { .. }));
    }

    #[test]
    fn decode_writes_raw_in_reference_pixel_format() {
        let plan = plan_combination(&combination("x265", "vbr"), &reference(), &config()).unwrap();
        let args = &plan.decode.args;
        assert_eq!(flag_value(args, "-i"), Some(plan.files.encoded.to_str().unwrap()));
        assert_eq!(flag_value(args, "-f"), Some("rawvideo"));
        assert_eq!(flag_value(args, "-pix_fmt"), Some("yuv420p"));
        assert_eq!(plan.decode.output, plan.files.decoded);
        assert_eq!(plan.decode.resolution.to_string(), "216x120");
    }

    #[test]
    fn work_files_differ_per_combination() {
        let reference = reference();
        let a = WorkFiles::new(Path::new("/w"), &reference, &combination("x264", "cbr"), ".mp4");
        let b = WorkFiles::new(Path::new("/w"), &reference, &combination("x264", "vbr"), ".mp4");
        assert_ne!(a.encoded, b.encoded);
        assert_ne!(a.decoded, b.decoded);
        assert_ne!(a.scaled, b.scaled);
    }

    #[test]
    fn work_files_differ_per_input_dir() {
        let combo = combination("x264", "cbr");
        let other = ReferenceSample {
            source: PathBuf::from("/archive/clip.mp4"),
            ..reference()
        };
        let a = WorkFiles::new(Path::new("/w"), &reference(), &combo, ".mp4");
        let b = WorkFiles::new(Path::new("/w"), &other, &combo, ".mp4");
        assert_ne!(a.encoded, b.encoded);
        assert_ne!(a.scaled, b.scaled);
    }
}
