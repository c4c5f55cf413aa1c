use std::{fmt, fmt::Display};

use crate::config::DEFAULT_QUALITIES;
use crate::contract::{RcMode, Resolution, SweepError};

/// Ordered, de-duplicated values of one sweep axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAxis {
    name: &'static str,
    values: Vec<String>,
}

impl ParameterAxis {
    /// Normalizes the accepted spellings of a list argument:
    /// `a b c` as separate tokens, `"a b c"` as one token, or `"a,b,c"`.
    /// Repeated values keep their first position.
    pub fn parse<S: AsRef<str>>(name: &'static str, tokens: &[S]) -> Result<Self, SweepError> {
        let invalid = |value: &str| SweepError::InvalidAxisValue {
            axis: name,
            value: value.to_string(),
        };

        let mut values: Vec<String> = Vec::new();
        for token in tokens {
            let token = token.as_ref();
            for piece in token.split(',') {
                if piece.trim().is_empty() {
                    return Err(invalid(token));
                }
                for value in piece.split_whitespace() {
                    if !values.iter().any(|seen| seen == value) {
                        values.push(value.to_string());
                    }
                }
            }
        }

        if values.is_empty() {
            return Err(invalid(""));
        }
        Ok(Self { name, values })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Display for ParameterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=[{}]", self.name, self.values.join(","))
    }
}

/// The swept axes, validated before any run starts. Bitrate-driven rcmodes
/// pair with `bitrates`; crf pairs with `qualities` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepAxes {
    pub codecs: ParameterAxis,
    pub resolutions: ParameterAxis,
    pub bitrates: ParameterAxis,
    pub rcmodes: ParameterAxis,
    pub qualities: ParameterAxis,
}

impl SweepAxes {
    pub fn parse<S: AsRef<str>>(
        codecs: &[S],
        resolutions: &[S],
        bitrates: &[S],
        rcmodes: &[S],
    ) -> Result<Self, SweepError> {
        let axes = Self {
            codecs: ParameterAxis::parse("codec", codecs)?,
            resolutions: ParameterAxis::parse("resolution", resolutions)?,
            bitrates: ParameterAxis::parse("bitrate", bitrates)?,
            rcmodes: ParameterAxis::parse("rcmode", rcmodes)?,
            qualities: ParameterAxis::parse("quality", &[DEFAULT_QUALITIES])?,
        };
        axes.validate()?;
        Ok(axes)
    }

    /// Replaces the default crf quality levels.
    pub fn with_qualities<S: AsRef<str>>(mut self, qualities: &[S]) -> Result<Self, SweepError> {
        self.qualities = ParameterAxis::parse("quality", qualities)?;
        self.validate()?;
        Ok(self)
    }

    /// Resolutions must be `WxH`, bitrates positive kbps integers and
    /// qualities non-negative integers. Codec
    /// and rcmode names are checked per combination so that an unknown name
    /// only skips the combinations that use it.
    fn validate(&self) -> Result<(), SweepError> {
        for raw in self.resolutions.values() {
            raw.parse::<Resolution>()?;
        }
        for raw in self.bitrates.values() {
            parse_bitrate_kbps(raw)?;
        }
        for raw in self.qualities.values() {
            parse_quality(raw)?;
        }
        Ok(())
    }

    /// Rcmode spellings split into bitrate-driven and quality-driven ones,
    /// each keeping its axis order. Unknown names count as bitrate-driven
    /// and are rejected later, per combination.
    #[must_use]
    pub fn split_rcmodes(&self) -> (Vec<&str>, Vec<&str>) {
        self.rcmodes
            .values()
            .iter()
            .map(String::as_str)
            .partition(|raw| RcMode::parse(raw).is_none_or(RcMode::targets_bitrate))
    }

    /// Rate points swept per codec and resolution.
    #[must_use]
    pub fn block_len(&self) -> usize {
        let (rate_modes, quality_modes) = self.split_rcmodes();
        self.bitrates.len() * rate_modes.len() + self.qualities.len() * quality_modes.len()
    }

    #[must_use]
    pub fn combination_count(&self) -> usize {
        self.codecs.len() * self.resolutions.len() * self.block_len()
    }
}

impl Display for SweepAxes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SweepAxes({}, {}, {}, {}, {})",
            self.codecs, self.resolutions, self.bitrates, self.rcmodes, self.qualities
        )
    }
}

pub(crate) fn parse_bitrate_kbps(raw: &str) -> Result<u32, SweepError> {
    match raw.trim().parse::<u32>() {
        Ok(kbps) if kbps > 0 => Ok(kbps),
        _ => Err(SweepError::InvalidAxisValue {
            axis: "bitrate",
            value: raw.to_string(),
        }),
    }
}

pub(crate) fn parse_quality(raw: &str) -> Result<u32, SweepError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| SweepError::InvalidAxisValue {
            axis: "quality",
            value: raw.to_string(),
        })
}
