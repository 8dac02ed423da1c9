#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration parsing for the HX711 acquisition stack.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The calibration CSV loader enforces exact headers and groups
//!   known-weight samples per channel for the core fitting routine.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// Shared clock line (BCM numbering on a Pi).
    pub sck: u8,
    /// One data line per chip, in channel-index order.
    pub dout: Vec<u8>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicyCfg {
    #[default]
    AllOrNothing,
    BestEffort,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriverCfg {
    /// Amplifier gain for channel A: 128 or 64.
    pub gain: u32,
    /// Input channel: "A" or "B".
    pub channel: String,
    pub fail_policy: FailPolicyCfg,
}

impl Default for DriverCfg {
    fn default() -> Self {
        Self {
            gain: 128,
            channel: "A".to_string(),
            fail_policy: FailPolicyCfg::AllOrNothing,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// Ceiling on the spread of deviations from the batch median.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BatchCfg {
    /// Frames per measurement batch.
    pub readings: usize,
    /// Frames per batch while zeroing.
    pub zero_readings: usize,
    /// Zeroing attempts before giving up.
    pub zero_retries: usize,
}

impl Default for BatchCfg {
    fn default() -> Self {
        Self {
            readings: 30,
            zero_readings: 30,
            zero_retries: 3,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info", "debug"
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub driver: DriverCfg,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub batch: BatchCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

const MAX_BATCH_READS: usize = 10_000;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.dout.is_empty() {
            eyre::bail!("pins.dout must list at least one data line");
        }
        for (i, pin) in self.pins.dout.iter().enumerate() {
            if self.pins.dout[..i].contains(pin) {
                eyre::bail!("pins.dout contains duplicate line {pin}");
            }
            if *pin == self.pins.sck {
                eyre::bail!("pins.dout line {pin} collides with pins.sck");
            }
        }

        // Driver
        if !matches!(self.driver.gain, 64 | 128) {
            eyre::bail!("driver.gain must be 128 or 64, got {}", self.driver.gain);
        }
        if !matches!(self.driver.channel.as_str(), "A" | "a" | "B" | "b") {
            eyre::bail!("driver.channel must be A or B, got {:?}", self.driver.channel);
        }

        // Filter
        if !self.filter.max_stdev.is_finite() || self.filter.max_stdev <= 0.0 {
            eyre::bail!("filter.max_stdev must be finite and > 0");
        }
        if !self.filter.max_ratio_to_stdev.is_finite() || self.filter.max_ratio_to_stdev <= 0.0 {
            eyre::bail!("filter.max_ratio_to_stdev must be finite and > 0");
        }

        // Batch
        if !(1..=MAX_BATCH_READS).contains(&self.batch.readings) {
            eyre::bail!("batch.readings must be in 1..={MAX_BATCH_READS}");
        }
        if !(1..=MAX_BATCH_READS).contains(&self.batch.zero_readings) {
            eyre::bail!("batch.zero_readings must be in 1..={MAX_BATCH_READS}");
        }
        if self.batch.zero_retries == 0 {
            eyre::bail!("batch.zero_retries must be >= 1");
        }

        Ok(())
    }
}

/// Calibration CSV schema.
///
/// Expected headers:
/// channel,known_grams,raw
///
/// Example:
/// channel,known_grams,raw
/// 0,100.0,512340.0
/// 0,200.0,1024881.0
/// 1,100.0,498102.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub channel: usize,
    pub known_grams: f64,
    pub raw: f64,
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Vec<CalibrationRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["channel", "known_grams", "raw"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'channel,known_grams,raw', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("calibration CSV {:?} has no data rows", path);
    }
    Ok(rows)
}

/// Group `(known_grams, raw)` sample pairs by channel index, ready for the
/// core weight-multiple fit.
pub fn samples_by_channel(rows: &[CalibrationRow]) -> BTreeMap<usize, Vec<(f64, f64)>> {
    let mut grouped: BTreeMap<usize, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.channel)
            .or_default()
            .push((row.known_grams, row.raw));
    }
    grouped
}
