//! Statistical reduction of a batch of decoded reads.
//!
//! One batch of frames per channel is reduced to a single measurement:
//! sentinel frames are dropped, then reads are filtered by their deviation
//! from the median relative to the spread of those deviations, and the mean
//! of the survivors becomes the measurement.

use crate::channel::Channel;

/// Outlier-rejection thresholds.
///
/// The defaults come from hand tuning against real load cells; treat them
/// as knobs, not invariants.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// Ceiling (raw units) on the sample stdev of deviations from the
    /// median. A spread above this means the channel is not actually
    /// settled: a bad connection can still toggle the ready line, and the
    /// garbage bits read back as a huge spread rather than normal noise.
    pub max_stdev: f64,
    /// Keep reads whose deviation-to-stdev ratio is at most this.
    pub max_ratio_to_stdev: f64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            max_stdev: 100.0,
            max_ratio_to_stdev: 2.0,
        }
    }
}

impl FilterCfg {
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if !self.max_stdev.is_finite() || self.max_stdev <= 0.0 {
            return Err(crate::error::ConfigError::Filter(
                "max_stdev must be finite and > 0",
            ));
        }
        if !self.max_ratio_to_stdev.is_finite() || self.max_ratio_to_stdev <= 0.0 {
            return Err(crate::error::ConfigError::Filter(
                "max_ratio_to_stdev must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Outcome of reducing one channel's batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reduction {
    /// A measurement was produced.
    Measured(f64),
    /// No valid reads survived sentinel filtering.
    Empty,
    /// Spread exceeded `max_stdev`; the channel is not settled.
    Noisy { stdev: f64 },
    /// Every read was rejected by the ratio filter.
    AllRejected,
}

/// Reduce a batch of decoded reads to one measurement.
///
/// - Invalid-marker entries are discarded; an empty remainder fails.
/// - A single surviving value is the measurement outright.
/// - Otherwise the median, per-read absolute deviations, and the sample
///   stdev of those deviations gate the final mean: a stdev above the
///   ceiling fails as [`Reduction::Noisy`], a zero stdev short-circuits to
///   the median, and anything else keeps only reads whose deviation ratio
///   is within `max_ratio_to_stdev` and averages them.
pub fn reduce_reads(reads: &[Option<i32>], cfg: &FilterCfg) -> Reduction {
    let valid: Vec<f64> = reads.iter().filter_map(|r| r.map(f64::from)).collect();
    if valid.is_empty() {
        return Reduction::Empty;
    }
    if valid.len() == 1 {
        return Reduction::Measured(valid[0]);
    }

    let med = median(&valid);
    let devs: Vec<f64> = valid.iter().map(|v| (v - med).abs()).collect();
    let spread = sample_stdev(&devs);
    if spread > cfg.max_stdev {
        return Reduction::Noisy { stdev: spread };
    }
    if spread == 0.0 {
        return Reduction::Measured(med);
    }

    let kept: Vec<f64> = valid
        .iter()
        .zip(&devs)
        .filter(|(_, dev)| **dev / spread <= cfg.max_ratio_to_stdev)
        .map(|(v, _)| *v)
        .collect();
    if kept.is_empty() {
        return Reduction::AllRejected;
    }
    Reduction::Measured(mean(&kept))
}

/// Reduce a channel's current batch and record the results on the channel.
///
/// On success `measurement`, `measurement_from_zero`, and `weight` are all
/// updated; a noisy reduction demotes the channel to not-ready for the rest
/// of the batch.
pub(crate) fn apply(ch: &mut Channel, cfg: &FilterCfg) -> Reduction {
    let outcome = reduce_reads(&ch.decoded_reads, cfg);
    match outcome {
        Reduction::Measured(m) => {
            ch.measurement = Some(m);
            let from_zero = m - ch.zero_offset;
            ch.measurement_from_zero = Some(from_zero);
            ch.weight = Some(from_zero / ch.weight_multiple);
        }
        Reduction::Noisy { .. } => {
            ch.ready = false;
        }
        Reduction::Empty | Reduction::AllRejected => {}
    }
    outcome
}

pub(crate) fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Median with the usual midpoint rule for even-length input.
pub(crate) fn median(xs: &[f64]) -> f64 {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation (n - 1 denominator); zero for fewer than two
/// values.
pub(crate) fn sample_stdev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn all_valid(values: &[i32]) -> Vec<Option<i32>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn outlier_is_excluded_from_the_mean() {
        // The spread here is dominated by the outlier, so the stdev ceiling
        // must sit above it for the ratio filter to get its turn.
        let cfg = FilterCfg {
            max_stdev: 1_000.0,
            ..FilterCfg::default()
        };
        let reads = all_valid(&[10, 11, 9, 10, 1000]);
        assert_eq!(reduce_reads(&reads, &cfg), Reduction::Measured(10.0));
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::all_invalid(vec![None, None, None])]
    fn no_valid_reads_fails(#[case] reads: Vec<Option<i32>>) {
        assert_eq!(
            reduce_reads(&reads, &FilterCfg::default()),
            Reduction::Empty
        );
    }

    #[test]
    fn single_value_is_returned_exactly() {
        let reads = vec![None, Some(-42), None];
        assert_eq!(
            reduce_reads(&reads, &FilterCfg::default()),
            Reduction::Measured(-42.0)
        );
    }

    #[test]
    fn zero_spread_returns_the_median() {
        let reads = all_valid(&[500, 500, 500, 500]);
        assert_eq!(
            reduce_reads(&reads, &FilterCfg::default()),
            Reduction::Measured(500.0)
        );
    }

    #[test]
    fn excessive_spread_is_noisy() {
        let reads = all_valid(&[0, 50_000, 0, 50_000, 0]);
        match reduce_reads(&reads, &FilterCfg::default()) {
            Reduction::Noisy { stdev } => assert!(stdev > 100.0),
            other => panic!("expected Noisy, got {other:?}"),
        }
    }

    #[test]
    fn noisy_reduction_demotes_the_channel() {
        let mut ch = crate::channel::Channel::new(hx711_traits::Line(5));
        ch.ready = true;
        ch.decoded_reads = all_valid(&[0, 50_000, 0, 50_000, 0]);
        let outcome = apply(&mut ch, &FilterCfg::default());
        assert!(matches!(outcome, Reduction::Noisy { .. }));
        assert!(!ch.is_ready());
        assert_eq!(ch.measurement(), None);
    }

    #[test]
    fn successful_apply_fills_offset_and_weight() {
        let mut ch = crate::channel::Channel::new(hx711_traits::Line(5));
        ch.zero_offset = 100.0;
        ch.weight_multiple = 50.0;
        ch.decoded_reads = all_valid(&[600, 600, 600]);
        assert_eq!(
            apply(&mut ch, &FilterCfg::default()),
            Reduction::Measured(600.0)
        );
        assert_eq!(ch.measurement(), Some(600.0));
        assert_eq!(ch.measurement_from_zero(), Some(500.0));
        assert_eq!(ch.weight(), Some(10.0));
    }

    #[test]
    fn single_value_apply_still_fills_offset_and_weight() {
        let mut ch = crate::channel::Channel::new(hx711_traits::Line(7));
        ch.zero_offset = 2.0;
        ch.weight_multiple = 4.0;
        ch.decoded_reads = vec![Some(10)];
        assert_eq!(
            apply(&mut ch, &FilterCfg::default()),
            Reduction::Measured(10.0)
        );
        assert_eq!(ch.measurement_from_zero(), Some(8.0));
        assert_eq!(ch.weight(), Some(2.0));
    }

    #[test]
    fn median_of_even_and_odd_lengths() {
        assert_eq!(median(&[1.0, 3.0]), 2.0);
        assert_eq!(median(&[9.0, 10.0, 10.0, 11.0, 1000.0]), 10.0);
    }

    proptest! {
        /// A measurement always lies within the range of its valid inputs.
        #[test]
        fn measurement_is_bounded_by_inputs(values in prop::collection::vec(-1_000_000i32..1_000_000, 1..64)) {
            let reads: Vec<Option<i32>> = values.iter().copied().map(Some).collect();
            let cfg = FilterCfg { max_stdev: f64::MAX, ..FilterCfg::default() };
            if let Reduction::Measured(m) = reduce_reads(&reads, &cfg) {
                let lo = f64::from(*values.iter().min().unwrap());
                let hi = f64::from(*values.iter().max().unwrap());
                prop_assert!(m >= lo && m <= hi, "measurement {m} outside [{lo}, {hi}]");
            } else {
                // With an unbounded stdev ceiling, only total rejection by
                // the ratio filter can fail, and that needs >1 read.
                prop_assert!(values.len() > 1);
            }
        }
    }
}
