use std::io::{self, Write};
use std::{fmt, fmt::Display};

use crate::contract::{ExperimentCombination, ReferenceSample};
use crate::quality::QualityScores;

pub const REPORT_HEADER: [&str; 9] = [
    "in_filename",
    "codec",
    "resolution",
    "rcmode",
    "bitrate",
    "actual_bitrate",
    "psnr",
    "ssim",
    "vmaf",
];

/// One output row. Measured fields are `None` when unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub in_filename: String,
    pub codec: String,
    pub resolution: String,
    pub rcmode: String,
    /// Target kbps, or the quality level for crf rows.
    pub bitrate: String,
    pub actual_bitrate: Option<f64>,
    pub psnr: Option<f64>,
    pub ssim: Option<f64>,
    pub vmaf: Option<f64>,
}

impl ResultRecord {
    #[must_use]
    pub fn new(
        reference: &ReferenceSample,
        combination: &ExperimentCombination,
        actual_bitrate: Option<f64>,
        scores: QualityScores,
    ) -> Self {
        Self {
            in_filename: reference.source_name(),
            codec: combination.codec.clone(),
            resolution: combination.resolution.clone(),
            rcmode: combination.rcmode.clone(),
            bitrate: combination.bitrate.clone(),
            actual_bitrate,
            psnr: scores.psnr,
            ssim: scores.ssim,
            vmaf: scores.vmaf,
        }
    }

    fn fields(&self) -> [String; 9] {
        [
            self.in_filename.clone(),
            self.codec.clone(),
            self.resolution.clone(),
            self.rcmode.clone(),
            self.bitrate.clone(),
            optional(self.actual_bitrate),
            optional(self.psnr),
            optional(self.ssim),
            optional(self.vmaf),
        ]
    }
}

impl Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self
            .fields()
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&line)
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Quotes a field only when it contains a separator, quote, or newline.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Append-only CSV writer. The header goes out before any row, even for a
/// sweep that produces none.
pub struct ResultSink<W: Write> {
    out: W,
    rows: usize,
}

impl<W: Write> ResultSink<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{}", REPORT_HEADER.join(","))?;
        out.flush()?;
        Ok(Self { out, rows: 0 })
    }

    /// Flushed per row so a crash mid-sweep keeps every finished combination.
    pub fn append(&mut self, record: &ResultRecord) -> io::Result<()> {
        writeln!(self.out, "{record}")?;
        self.out.flush()?;
        self.rows += 1;
        Ok(())
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
