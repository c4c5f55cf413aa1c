use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rd_sweep::{
    Cleanup, DEFAULT_GOP_LENGTH, DEFAULT_QUALITIES, DEFAULT_REF_PIX_FMT, ProcessRunner, Resolution,
    ResultSink, Sweep, SweepAxes, SweepConfig, ToolPaths,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Sweep encoders over codec/resolution/bitrate/rcmode and report RD points")]
struct Args {
    /// Input videos, processed in order
    #[arg(required = true)]
    infiles: Vec<PathBuf>,
    /// CSV report path
    #[arg(short, long)]
    outfile: PathBuf,

    /// Codecs, as separate tokens or one space/comma separated string
    #[arg(long, num_args = 1.., default_value = "x264 x265 openh264 vp8 vp9 libaom-av1 libsvtav1")]
    codecs: Vec<String>,
    #[arg(long, num_args = 1.., default_value = "1280x720 864x480 640x360 432x240 216x120")]
    resolutions: Vec<String>,
    /// Target bitrates in kbps
    #[arg(long, num_args = 1.., default_value = "2500 1000 560 280 140 70 35")]
    bitrates: Vec<String>,
    #[arg(long, num_args = 1.., default_value = "cbr")]
    rcmodes: Vec<String>,
    /// Quality levels swept by the crf rcmode, in place of the bitrates
    #[arg(long, num_args = 1.., default_value = DEFAULT_QUALITIES)]
    qualities: Vec<String>,

    /// Reference resolution (default: the input's own)
    #[arg(long)]
    ref_resolution: Option<Resolution>,
    #[arg(long, default_value = DEFAULT_REF_PIX_FMT)]
    ref_pix_fmt: String,
    #[arg(long, default_value_t = DEFAULT_GOP_LENGTH)]
    gop_length: u32,
    /// Encoder speed preset, passed with each codec's own flag
    #[arg(long)]
    preset: Option<String>,
    /// Working directory (default: <system temp>/rd-sweep)
    #[arg(long)]
    tmp_dir: Option<PathBuf>,

    /// Remove decoded and rescaled raw files after each combination
    #[arg(long, conflicts_with_all = ["full_cleanup", "no_cleanup"])]
    cleanup: bool,
    /// Also remove the encoded bitstream
    #[arg(long, conflicts_with = "no_cleanup")]
    full_cleanup: bool,
    /// Keep every working file [default]
    #[arg(long)]
    no_cleanup: bool,

    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,
    #[arg(long, env = "LCEVC_ENC_DIR")]
    lcevc_enc_dir: Option<PathBuf>,
    #[arg(long, env = "LCEVC_DEC_DIR")]
    lcevc_dec_dir: Option<PathBuf>,
    /// Directory holding the standalone VMAF runner
    #[arg(long, env = "VMAF_DIR")]
    vmaf_dir: Option<PathBuf>,
    #[arg(long, env = "VMAF_MODEL_PATH")]
    vmaf_model: Option<PathBuf>,

    /// Increase verbosity (repeat for more)
    #[arg(short = 'd', long = "debug", action = clap::ArgAction::Count)]
    debug: u8,
    /// Only report errors
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,
}

impl Args {
    fn axes(&self) -> Result<SweepAxes, rd_sweep::SweepError> {
        SweepAxes::parse(&self.codecs, &self.resolutions, &self.bitrates, &self.rcmodes)?
            .with_qualities(&self.qualities)
    }

    fn cleanup(&self) -> Cleanup {
        if self.full_cleanup {
            Cleanup::All
        } else if self.cleanup {
            Cleanup::Raw
        } else {
            Cleanup::Keep
        }
    }

    fn config(&self) -> SweepConfig {
        let tools = ToolPaths {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            lcevc_enc_dir: self.lcevc_enc_dir.clone(),
            lcevc_dec_dir: self.lcevc_dec_dir.clone(),
            vmaf_dir: self.vmaf_dir.clone(),
            vmaf_model: self.vmaf_model.clone(),
        };
        let tmp_dir = self
            .tmp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("rd-sweep"));
        SweepConfig {
            ref_resolution: self.ref_resolution,
            ref_pix_fmt: self.ref_pix_fmt.clone(),
            gop_length: self.gop_length,
            preset: self.preset.clone(),
            cleanup: self.cleanup(),
            ..SweepConfig::new(tools, tmp_dir)
        }
    }
}

fn init_tracing(quiet: bool, debug: u8) {
    let level = match (quiet, debug) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.quiet, args.debug);

    let axes = args.axes().context("invalid sweep parameters")?;
    let sweep = Sweep::new(args.config(), ProcessRunner, &axes).context("tool check failed")?;

    let file = File::create(&args.outfile)
        .with_context(|| format!("failed to create {}", args.outfile.display()))?;
    let mut sink = ResultSink::new(BufWriter::new(file))
        .with_context(|| format!("failed to write {}", args.outfile.display()))?;

    let summary = sweep
        .run(&args.infiles, &axes, &mut sink)
        .context("sweep aborted")?;
    info!("wrote {} rows to {}", summary.rows, args.outfile.display());
    println!(
        "rows={} skipped={} output={}",
        summary.rows,
        summary.skipped,
        args.outfile.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_and_space_spellings_reach_the_same_axes() {
        let spaced = Args::parse_from([
            "rd-sweep", "in.mp4", "-o", "out.csv", "--codecs", "x264 vp9", "--resolutions",
            "216x120", "--bitrates", "35", "70", "--rcmodes", "cbr",
        ]);
        let comma = Args::parse_from([
            "rd-sweep", "in.mp4", "-o", "out.csv", "--codecs", "x264,vp9", "--resolutions",
            "216x120", "--bitrates", "35,70", "--rcmodes", "cbr",
        ]);
        let spaced = spaced.axes().unwrap();
        assert_eq!(spaced, comma.axes().unwrap());
        assert_eq!(spaced.combination_count(), 4);
    }

    #[test]
    fn qualities_feed_the_crf_rcmode() {
        let args = Args::parse_from([
            "rd-sweep", "in.mp4", "-o", "out.csv", "--codecs", "x264", "--resolutions", "216x120",
            "--bitrates", "35,70", "--rcmodes", "cbr crf", "--qualities", "23", "30", "37",
        ]);
        let axes = args.axes().unwrap();
        assert_eq!(axes.qualities.values(), ["23", "30", "37"]);
        assert_eq!(axes.combination_count(), 2 + 3);

        let defaulted = Args::parse_from(["rd-sweep", "-o", "out.csv", "in.mp4"]);
        assert_eq!(defaulted.axes().unwrap().qualities.values(), [DEFAULT_QUALITIES]);
    }

    #[test]
    fn cleanup_levels() {
        let base = ["rd-sweep", "-o", "out.csv", "in.mp4"];
        assert_eq!(Args::parse_from(base).cleanup(), Cleanup::Keep);
        let raw = Args::parse_from(base.iter().copied().chain(["--cleanup"]));
        assert_eq!(raw.cleanup(), Cleanup::Raw);
        let all = Args::parse_from(base.iter().copied().chain(["--full-cleanup"]));
        assert_eq!(all.cleanup(), Cleanup::All);
        assert!(Args::try_parse_from(base.iter().copied().chain(["--cleanup", "--no-cleanup"])).is_err());
    }

    #[test]
    fn run_options_land_in_config() {
        let args = Args::parse_from([
            "rd-sweep", "-o", "out.csv", "--ref-resolution", "1920x1080", "--gop-length", "30",
            "--tmp-dir", "/scratch", "--preset", "fast", "in.mp4",
        ]);
        let config = args.config();
        assert_eq!(config.ref_resolution.map(|res| res.to_string()).as_deref(), Some("1920x1080"));
        assert_eq!(config.gop_length, 30);
        assert_eq!(config.tmp_dir, PathBuf::from("/scratch"));
        assert_eq!(config.preset.as_deref(), Some("fast"));
        assert_eq!(config.ref_pix_fmt, "yuv420p");
    }
}
