//! Weight-multiple derivation from paired known-weight samples.
//!
//! A calibration run places known weights on a channel, acquires the raw
//! measurement for each, and derives the scalar that converts
//! offset-corrected raw units into weight units.

use crate::error::Result;
use crate::filter;

/// Result of fitting a weight multiple to calibration samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightMultipleFit {
    /// Mean of the per-sample `measured / known` ratios (the single ratio
    /// when only one sample exists).
    pub multiple: f64,
    /// Sample stdev of the ratios as a quality signal; `None` with fewer
    /// than two samples.
    pub ratio_stdev: Option<f64>,
    pub samples: usize,
}

/// Derive one channel's weight multiple from `(known_weight, measured_raw)`
/// pairs. The measured values are expected to already be offset-corrected
/// (acquired after zeroing).
pub fn fit_weight_multiple(samples: &[(f64, f64)]) -> Result<WeightMultipleFit> {
    if samples.is_empty() {
        eyre::bail!("calibration requires at least one (known, measured) sample");
    }
    let mut ratios = Vec::with_capacity(samples.len());
    for (i, (known, measured)) in samples.iter().enumerate() {
        if !known.is_finite() || *known == 0.0 {
            eyre::bail!("calibration sample {i} has unusable known weight {known}");
        }
        if !measured.is_finite() {
            eyre::bail!("calibration sample {i} has non-finite measured value");
        }
        ratios.push(measured / known);
    }
    let multiple = filter::mean(&ratios);
    if !multiple.is_finite() || multiple == 0.0 {
        eyre::bail!("calibration produced an unusable weight multiple {multiple}");
    }
    let ratio_stdev = (ratios.len() >= 2).then(|| filter::sample_stdev(&ratios));
    Ok(WeightMultipleFit {
        multiple,
        ratio_stdev,
        samples: ratios.len(),
    })
}
