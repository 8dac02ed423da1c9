//! Per-sensor channel state.

use hx711_traits::Line;

use crate::codec;

/// State for one load-cell ADC sharing the driver's clock line.
///
/// Channels are plain value objects owned by the driver and never reach
/// back to it. The raw accumulator is only meaningful between frame start
/// and frame finish; the batch history between batch start and reduction.
/// `raw_reads` and `decoded_reads` stay in lock-step at all times.
#[derive(Debug, Clone)]
pub struct Channel {
    pub(crate) data_line: Line,
    pub(crate) ready: bool,
    pub(crate) raw_accumulator: u32,
    pub(crate) raw_reads: Vec<u32>,
    pub(crate) decoded_reads: Vec<Option<i32>>,
    pub(crate) zero_offset: f64,
    pub(crate) weight_multiple: f64,
    pub(crate) measurement: Option<f64>,
    pub(crate) measurement_from_zero: Option<f64>,
    pub(crate) weight: Option<f64>,
}

impl Channel {
    pub(crate) fn new(data_line: Line) -> Self {
        Self {
            data_line,
            ready: false,
            raw_accumulator: 0,
            raw_reads: Vec::new(),
            decoded_reads: Vec::new(),
            zero_offset: 0.0,
            weight_multiple: 1.0,
            measurement: None,
            measurement_from_zero: None,
            weight: None,
        }
    }

    /// Clear batch history and reductions before a new set of reads.
    /// `weight` is deliberately kept so callers can reuse the previous
    /// conversion until a new reduction lands.
    pub(crate) fn begin_batch(&mut self) {
        self.raw_reads.clear();
        self.decoded_reads.clear();
        self.measurement = None;
        self.measurement_from_zero = None;
        self.begin_frame();
    }

    /// Reset per-frame state; readiness must be re-proven every frame.
    pub(crate) fn begin_frame(&mut self) {
        self.ready = false;
        self.raw_accumulator = 0;
    }

    pub(crate) fn shift_in(&mut self, bit: bool) {
        self.raw_accumulator = (self.raw_accumulator << 1) | u32::from(bit);
    }

    /// Append the finished accumulator and its signed decode to the batch
    /// history.
    pub(crate) fn finish_frame(&mut self) {
        self.raw_reads.push(self.raw_accumulator);
        self.decoded_reads.push(codec::decode(self.raw_accumulator));
        debug_assert_eq!(self.raw_reads.len(), self.decoded_reads.len());
    }

    pub fn data_line(&self) -> Line {
        self.data_line
    }

    /// True once the data line was observed low during the current frame's
    /// readiness poll (and the batch did not later demote the channel).
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Raw 24-bit frames captured in the current batch, one per completed
    /// frame. Shorter than the batch size when the channel missed frames.
    pub fn raw_reads(&self) -> &[u32] {
        &self.raw_reads
    }

    /// Signed decodes of `raw_reads`, `None` marking sentinel frames.
    pub fn decoded_reads(&self) -> &[Option<i32>] {
        &self.decoded_reads
    }

    pub fn zero_offset(&self) -> f64 {
        self.zero_offset
    }

    pub fn weight_multiple(&self) -> f64 {
        self.weight_multiple
    }

    /// Filtered mean of the last successful batch, in raw units.
    pub fn measurement(&self) -> Option<f64> {
        self.measurement
    }

    /// `measurement` minus the zero offset.
    pub fn measurement_from_zero(&self) -> Option<f64> {
        self.measurement_from_zero
    }

    /// `measurement_from_zero` divided by the weight multiple. Persists
    /// across batches until a new reduction replaces it.
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }
}
