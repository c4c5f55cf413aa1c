use std::fs;
use std::path::Path;

use crate::contract::SweepError;

/// Achieved bitrate in kbps: `8 * size_bytes / duration_seconds / 1000`.
pub fn actual_bitrate_kbps(
    path: &Path,
    size_bytes: u64,
    duration_secs: Option<f64>,
) -> Result<f64, SweepError> {
    match duration_secs {
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(8.0 * size_bytes as f64 / secs / 1000.0),
        other => Err(SweepError::InvalidDuration {
            path: path.to_path_buf(),
            duration: other,
        }),
    }
}

pub fn bitstream_bitrate_kbps(path: &Path, duration_secs: Option<f64>) -> Result<f64, SweepError> {
    let size_bytes = fs::metadata(path)
        .map_err(|source| SweepError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    actual_bitrate_kbps(path, size_bytes, duration_secs)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn one_megabyte_over_ten_seconds_is_800_kbps() {
        let kbps = actual_bitrate_kbps(Path::new("a.mp4"), 1_000_000, Some(10.0)).unwrap();
        assert!((kbps - 800.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(0.0))]
    #[case(Some(-1.0))]
    #[case(Some(f64::NAN))]
    #[case(Some(f64::INFINITY))]
    fn unusable_duration_is_an_error(#[case] duration: Option<f64>) {
        let err = actual_bitrate_kbps(Path::new("a.mp4"), 1_000, duration).unwrap_err();
        assert!(matches!(err, SweepError::InvalidDuration { .. }));
    }

    #[test]
    fn reads_size_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enc.mp4");
        fs::write(&path, vec![0_u8; 4_375]).unwrap();
        let kbps = bitstream_bitrate_kbps(&path, Some(1.0)).unwrap();
        assert!((kbps - 35.0).abs() < 1e-9);
    }
}
