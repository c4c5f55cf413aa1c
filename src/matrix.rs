use crate::axis::SweepAxes;
use crate::contract::ExperimentCombination;

/// Lazy cross product of the sweep axes. Codec varies slowest, then
/// resolution. Inside each (codec, resolution) block the bitrate-driven
/// rcmodes come first, bitrate outer and rcmode innermost, followed by the
/// crf rcmodes over the quality levels. Values keep the order in which they
/// were given.
#[derive(Debug, Clone)]
pub struct ExperimentMatrix<'a> {
    axes: &'a SweepAxes,
    rate_modes: Vec<&'a str>,
    quality_modes: Vec<&'a str>,
    next: usize,
}

impl<'a> ExperimentMatrix<'a> {
    #[must_use]
    pub fn new(axes: &'a SweepAxes) -> Self {
        let (rate_modes, quality_modes) = axes.split_rcmodes();
        Self {
            axes,
            rate_modes,
            quality_modes,
            next: 0,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.axes.combination_count()
    }

    fn combination_at(&self, index: usize) -> ExperimentCombination {
        let resolutions = self.axes.resolutions.values();
        let codecs = self.axes.codecs.values();
        let block = self.axes.block_len();

        let within = index % block;
        let rest = index / block;
        let resolution = &resolutions[rest % resolutions.len()];
        let codec = &codecs[rest / resolutions.len()];

        let rate_grid = self.axes.bitrates.len() * self.rate_modes.len();
        let (rate, rcmode) = if within < rate_grid {
            let modes = &self.rate_modes;
            (
                &self.axes.bitrates.values()[within / modes.len()],
                modes[within % modes.len()],
            )
        } else {
            let modes = &self.quality_modes;
            let offset = within - rate_grid;
            (
                &self.axes.qualities.values()[offset / modes.len()],
                modes[offset % modes.len()],
            )
        };

        ExperimentCombination {
            codec: codec.clone(),
            resolution: resolution.clone(),
            bitrate: rate.clone(),
            rcmode: rcmode.to_string(),
        }
    }
}

impl Iterator for ExperimentMatrix<'_> {
    type Item = ExperimentCombination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total() {
            return None;
        }
        let combination = self.combination_at(self.next);
        self.next += 1;
        Some(combination)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ExperimentMatrix<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes() -> SweepAxes {
        SweepAxes::parse(
            &["x264 vp9"],
            &["640x360,216x120"],
            &["560", "35", "140"],
            &["cbr", "vbr"],
        )
        .unwrap()
    }

    fn tuple(c: &ExperimentCombination) -> (&str, &str, &str, &str) {
        (&c.codec, &c.resolution, &c.bitrate, &c.rcmode)
    }

    #[test]
    fn count_is_product_of_axis_lengths() {
        let axes = axes();
        let matrix = ExperimentMatrix::new(&axes);
        assert_eq!(matrix.len(), 2 * 2 * 3 * 2);
        assert_eq!(matrix.count(), 24);
    }

    #[test]
    fn rcmode_is_innermost_and_codec_outermost() {
        let axes = axes();
        let combos: Vec<_> = ExperimentMatrix::new(&axes).collect();
        assert_eq!(tuple(&combos[0]), ("x264", "640x360", "560", "cbr"));
        assert_eq!(tuple(&combos[1]), ("x264", "640x360", "560", "vbr"));
        assert_eq!(tuple(&combos[2]), ("x264", "640x360", "35", "cbr"));
        assert_eq!(tuple(&combos[6]), ("x264", "216x120", "560", "cbr"));
        assert_eq!(tuple(&combos[12]), ("vp9", "640x360", "560", "cbr"));
        assert_eq!(tuple(&combos[23]), ("vp9", "216x120", "140", "vbr"));
    }

    #[test]
    fn enumeration_is_restartable() {
        let axes = axes();
        let first: Vec<_> = ExperimentMatrix::new(&axes).collect();
        let second: Vec<_> = ExperimentMatrix::new(&axes).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn crf_follows_the_bitrate_grid_with_its_own_levels() {
        let axes = SweepAxes::parse(&["x264"], &["640x360 216x120"], &["560 35"], &["crf,cbr"])
            .unwrap()
            .with_qualities(&["23", "30"])
            .unwrap();
        let combos: Vec<_> = ExperimentMatrix::new(&axes).collect();
        assert_eq!(combos.len(), 8);
        assert_eq!(tuple(&combos[0]), ("x264", "640x360", "560", "cbr"));
        assert_eq!(tuple(&combos[1]), ("x264", "640x360", "35", "cbr"));
        assert_eq!(tuple(&combos[2]), ("x264", "640x360", "23", "crf"));
        assert_eq!(tuple(&combos[3]), ("x264", "640x360", "30", "crf"));
        assert_eq!(tuple(&combos[4]), ("x264", "216x120", "560", "cbr"));
        assert_eq!(tuple(&combos[7]), ("x264", "216x120", "30", "crf"));
        assert!(combos[3].is_quality_driven());
    }

    #[test]
    fn single_point_matrix() {
        let axes = SweepAxes::parse(&["x264"], &["216x120"], &["35"], &["cbr"]).unwrap();
        let combos: Vec<_> = ExperimentMatrix::new(&axes).collect();
        assert_eq!(combos.len(), 1);
        assert_eq!(tuple(&combos[0]), ("x264", "216x120", "35", "cbr"));
    }
}
