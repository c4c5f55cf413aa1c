use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::{fmt, fmt::Display};

use tracing::{debug, info, warn};

use crate::axis::SweepAxes;
use crate::bitrate::bitstream_bitrate_kbps;
use crate::codec::{CombinationPlan, plan_combination};
use crate::config::{Cleanup, SweepConfig};
use crate::contract::{Codec, ExperimentCombination, Invocation, ReferenceSample, SweepError};
use crate::matrix::ExperimentMatrix;
use crate::quality::{QualityAssessor, VmafPath};
use crate::reference::prepare_reference;
use crate::report::{ResultRecord, ResultSink};
use crate::runner::{ToolRunner, encode_and_decode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub inputs: usize,
    pub combinations: usize,
    pub rows: usize,
    pub skipped: usize,
}

impl Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inputs={} combinations={} rows={} skipped={}",
            self.inputs, self.combinations, self.rows, self.skipped
        )
    }
}

/// Sequential driver: one combination runs to completion, row included,
/// before the next starts.
pub struct Sweep<R: ToolRunner> {
    config: SweepConfig,
    runner: R,
    assessor: QualityAssessor,
}

impl<R: ToolRunner> Sweep<R> {
    /// Checks every tool the sweep over `axes` will need and fixes the VMAF
    /// path for the whole run.
    pub fn new(config: SweepConfig, runner: R, axes: &SweepAxes) -> Result<Self, SweepError> {
        check_tool(&runner, "ffmpeg", &config.tools.ffmpeg)?;
        check_tool(&runner, "ffprobe", &config.tools.ffprobe)?;
        if sweeps_codec(axes, Codec::LcevcX264) {
            check_lcevc(&config)?;
        }

        let vmaf = VmafPath::detect(&runner, &config.tools)?;
        info!("vmaf path: {vmaf}");
        let assessor = QualityAssessor::new(config.tools.ffmpeg.clone(), vmaf);
        Ok(Self {
            config,
            runner,
            assessor,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Inputs run in the order given; each input's rows follow the matrix
    /// order. Only setup-level failures end the run early.
    pub fn run<W: Write>(
        &self,
        inputs: &[PathBuf],
        axes: &SweepAxes,
        sink: &mut ResultSink<W>,
    ) -> Result<SweepSummary, SweepError> {
        fs::create_dir_all(&self.config.tmp_dir).map_err(|source| SweepError::Io {
            path: self.config.tmp_dir.clone(),
            source,
        })?;
        info!("{}", self.config);
        info!("{axes}: {} combinations per input", axes.combination_count());

        let mut summary = SweepSummary::default();
        for input in inputs {
            let reference = prepare_reference(&self.runner, &self.config, input)?;
            info!("[run] {reference}");
            summary.inputs += 1;

            for combination in ExperimentMatrix::new(axes) {
                summary.combinations += 1;
                match self.run_combination(&reference, &combination) {
                    Ok(record) => {
                        sink.append(&record).map_err(SweepError::ReportWrite)?;
                        summary.rows += 1;
                    }
                    Err(err) if err.is_recoverable() => {
                        warn!("skipping {combination}: {err}");
                        summary.skipped += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        info!("[run] done: {summary}");
        Ok(summary)
    }

    fn run_combination(
        &self,
        reference: &ReferenceSample,
        combination: &ExperimentCombination,
    ) -> Result<ResultRecord, SweepError> {
        info!("[run] {combination}");
        let plan = plan_combination(combination, reference, &self.config)?;
        let timing = encode_and_decode(&self.runner, &plan)?;
        info!(
            "[{}] encode took {:.3}s, decode took {:.3}s",
            plan.codec,
            timing.encode_elapsed.as_secs_f64(),
            timing.decode_elapsed.as_secs_f64()
        );

        let actual_bitrate =
            match bitstream_bitrate_kbps(&plan.files.encoded, reference.duration_secs) {
                Ok(kbps) => Some(kbps),
                Err(err) => {
                    warn!("[{}] no actual bitrate: {err}", plan.codec);
                    None
                }
            };
        let scores =
            self.assessor
                .assess(&self.runner, reference, &plan.decode, &plan.files.scaled);
        self.clean_up(&plan);

        Ok(ResultRecord::new(
            reference,
            combination,
            actual_bitrate,
            scores,
        ))
    }

    fn clean_up(&self, plan: &CombinationPlan) {
        let files = &plan.files;
        let doomed: Vec<&Path> = match self.config.cleanup {
            Cleanup::Keep => Vec::new(),
            Cleanup::Raw => vec![files.decoded.as_path(), files.scaled.as_path()],
            Cleanup::All => vec![
                files.decoded.as_path(),
                files.scaled.as_path(),
                files.encoded.as_path(),
            ],
        };
        for path in doomed {
            match fs::remove_file(path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("cannot remove {}: {err}", path.display()),
            }
        }
    }
}

fn sweeps_codec(axes: &SweepAxes, codec: Codec) -> bool {
    axes.codecs
        .values()
        .iter()
        .any(|name| Codec::parse(name).is_ok_and(|parsed| parsed == codec))
}

fn check_tool<R: ToolRunner>(
    runner: &R,
    tool: &'static str,
    path: &Path,
) -> Result<(), SweepError> {
    let missing = || SweepError::MissingExternalTool {
        tool,
        path: path.to_path_buf(),
    };
    let output = runner
        .run(&Invocation::new(path, vec!["-version".to_string()]))
        .map_err(|_| missing())?;
    if !output.success() {
        return Err(missing());
    }
    if let Some(version) = output.stdout.lines().next() {
        debug!("{tool}: {version}");
    }
    Ok(())
}

fn check_lcevc(config: &SweepConfig) -> Result<(), SweepError> {
    let pairs = [
        ("lcevc encoder", "$LCEVC_ENC_DIR", config.tools.lcevc_encoder()),
        ("lcevc decoder", "$LCEVC_DEC_DIR", config.tools.lcevc_decoder()),
    ];
    for (tool, variable, resolved) in pairs {
        match resolved {
            Some((binary, _)) if binary.is_file() => debug!("{tool}: {}", binary.display()),
            Some((binary, _)) => {
                return Err(SweepError::MissingExternalTool { tool, path: binary });
            }
            None => {
                return Err(SweepError::MissingExternalTool {
                    tool,
                    path: PathBuf::from(variable),
                });
            }
        }
    }
    Ok(())
}
