mod axis;
mod bitrate;
mod codec;
mod config;
mod contract;
mod matrix;
mod probe;
mod quality;
mod reference;
mod report;
mod runner;
mod sweep;

pub use axis::{ParameterAxis, SweepAxes};
pub use bitrate::{actual_bitrate_kbps, bitstream_bitrate_kbps};
pub use codec::{
    CodecAdapter, CombinationPlan, EncodeRequest, WorkFiles, adapter_for, plan_combination,
};
pub use config::{
    Cleanup, DEFAULT_GOP_LENGTH, DEFAULT_QUALITIES, DEFAULT_REF_PIX_FMT, SweepConfig, ToolPaths,
};
pub use contract::{
    Codec, DecodeSpec, EncodeSpec, ExperimentCombination, FrameRate, Invocation, RateControl,
    RcMode, ReferenceSample, Resolution, SweepError,
};
pub use matrix::ExperimentMatrix;
pub use probe::{SourceInfo, probe_source};
pub use quality::{
    QualityAssessor, QualityScores, VmafPath, parse_psnr, parse_ssim, parse_vmaf_filter,
    parse_vmaf_runner,
};
pub use reference::{prepare_reference, reference_path};
pub use report::{REPORT_HEADER, ResultRecord, ResultSink};
pub use runner::{ProcessRunner, RoundTrip, ToolOutput, ToolRunner, encode_and_decode};
pub use sweep::{Sweep, SweepSummary};
