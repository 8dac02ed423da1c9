//! Synchronized multi-channel acquisition engine.
//!
//! One driver exclusively owns a clock line and a fixed, ordered set of
//! channels. Frames are clocked across every ready channel in lock-step:
//! each clock pulse shifts one bit into every ready accumulator, and the
//! trailer pulses after the 24 data bits select gain/channel for the next
//! conversion.

use std::sync::Arc;
use std::time::Duration;

use hx711_traits::{
    Clock, DigitalIo, Direction, DriverEvent, EventLevel, EventSink, Line, MonotonicClock,
};

use crate::channel::Channel;
use crate::codec::{self, ChannelSelect, FRAME_BITS, Gain};
use crate::error::{AcquireError, ConfigError, Report, Result};
use crate::events::TracingSink;
use crate::filter::{self, FilterCfg, Reduction};

/// Frame-level policy when some channels never report ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPolicy {
    /// One unready channel aborts the whole frame before any clocking.
    #[default]
    AllOrNothing,
    /// Unready channels are skipped for this frame only; the rest proceed.
    BestEffort,
}

/// Upper bound on frames per batch.
pub const MAX_BATCH_READS: usize = 10_000;

/// Protocol timing knobs. The defaults follow the datasheet figures; they
/// rarely need changing outside tests.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    /// Readiness poll passes before giving up. With the default interval
    /// this bounds the poll at roughly 200 ms.
    pub ready_poll_iterations: u32,
    /// Pause between readiness poll passes.
    pub ready_poll_interval: Duration,
    /// Clock-high budget; at 60 us the chip enters power-down and the
    /// frame must be discarded.
    pub pulse_overrun: Duration,
    /// Settle time after a gain/channel change before data is trusted.
    pub gain_settle: Duration,
    /// Settle time after a power-down or power-up edge.
    pub power_settle: Duration,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            ready_poll_iterations: 20,
            ready_poll_interval: Duration::from_millis(10),
            pulse_overrun: Duration::from_micros(60),
            gain_settle: Duration::from_millis(400),
            power_settle: Duration::from_millis(10),
        }
    }
}

impl TimingCfg {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ready_poll_iterations == 0 {
            return Err(ConfigError::Timing("ready_poll_iterations must be >= 1"));
        }
        if self.pulse_overrun.is_zero() {
            return Err(ConfigError::Timing("pulse_overrun must be > 0"));
        }
        Ok(())
    }
}

/// Select channels by construction-order index or by data line.
#[derive(Debug, Clone)]
pub enum ChannelSelector {
    Index(Vec<usize>),
    DataLine(Vec<Line>),
}

/// Driver for one or more HX711 chips on a shared clock line.
pub struct Hx711<IO: DigitalIo> {
    io: IO,
    clock_line: Line,
    channels: Vec<Channel>,
    gain: Gain,
    select: ChannelSelect,
    fail_policy: FailPolicy,
    filter: FilterCfg,
    timing: TimingCfg,
    trailer_pulses: u8,
    clock: Arc<dyn Clock + Send + Sync>,
    events: Arc<dyn EventSink + Send + Sync>,
    // Worst pulse overrun observed in the current frame, reported after
    // the frame finishes (never between clock edges).
    last_overrun_us: Option<u64>,
}

impl<IO: DigitalIo> core::fmt::Debug for Hx711<IO> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hx711")
            .field("clock_line", &self.clock_line)
            .field("channels", &self.channels.len())
            .field("gain", &self.gain)
            .field("select", &self.select)
            .field("fail_policy", &self.fail_policy)
            .finish()
    }
}

impl<IO: DigitalIo> Hx711<IO> {
    /// Start building a driver over the given I/O capability.
    pub fn builder(io: IO) -> Hx711Builder<IO> {
        Hx711Builder::new(io)
    }

    /// Convenience for the common single-sensor wiring; defaults apply for
    /// everything else.
    pub fn single(io: IO, data_line: Line, clock_line: Line) -> Result<Self> {
        Self::builder(io)
            .with_data_lines([data_line])
            .with_clock_line(clock_line)
            .build()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn select(&self) -> ChannelSelect {
        self.select
    }

    pub fn fail_policy(&self) -> FailPolicy {
        self.fail_policy
    }

    /// One 24-bit acquisition cycle across all ready channels plus the
    /// gain/channel trailer. Returns true only when every clock pulse
    /// stayed inside the timing budget and, under all-or-nothing, every
    /// channel was ready.
    pub fn read_frame(&mut self) -> bool {
        for ch in &mut self.channels {
            ch.begin_frame();
        }

        let all_ready = self.poll_ready();
        if !all_ready && self.fail_policy == FailPolicy::AllOrNothing {
            let unready = self.channels.iter().filter(|c| !c.ready).count();
            // The chip must not be clocked while unready or it risks
            // misframing, so neither data nor trailer pulses are emitted.
            self.events.on_event(
                EventLevel::Warn,
                &DriverEvent::FrameAborted {
                    unready_channels: unready,
                },
            );
            return false;
        }

        let mut data_ok = true;
        for _ in 0..FRAME_BITS {
            data_ok &= self.pulse_clock();
            for ch in self.channels.iter_mut() {
                if ch.ready {
                    let bit = self.io.read(ch.data_line);
                    ch.shift_in(bit);
                }
            }
        }

        if data_ok {
            for ch in &mut self.channels {
                if ch.ready {
                    ch.finish_frame();
                }
            }
        }

        // The trailer keeps every chip's pulse count coherent, so it runs
        // even when the data phase was degraded or partial.
        let mut trailer_ok = true;
        for _ in 0..self.trailer_pulses {
            trailer_ok &= self.pulse_clock();
        }

        if let Some(us) = self.last_overrun_us.take() {
            self.events
                .on_event(EventLevel::Warn, &DriverEvent::PulseOverrun { elapsed_us: us });
        }
        data_ok && trailer_ok
    }

    /// Run `readings` frames and reduce each channel's batch to one
    /// offset-corrected measurement.
    ///
    /// Channels that never became ready, or whose filtered set emptied,
    /// report `None`. When every channel reports `None` the batch fails as
    /// a whole with [`AcquireError::TotalAcquisitionFailure`]; that usually
    /// means wiring or timing, not data-quality noise.
    pub fn acquire_raw(&mut self, readings: usize) -> Result<Vec<Option<f64>>> {
        Self::check_batch_size(readings)?;
        for ch in &mut self.channels {
            ch.begin_batch();
        }
        for _ in 0..readings {
            // Frame-level faults are absorbed here; the reduction decides
            // per channel whether enough data survived.
            let _ = self.read_frame();
        }
        self.reduce_batch()
    }

    /// Per-channel weights for a fresh batch, or the previous conversion
    /// when `reuse_previous` is set (no acquisition happens then).
    pub fn acquire_weight(
        &mut self,
        readings: usize,
        reuse_previous: bool,
    ) -> Result<Vec<Option<f64>>> {
        Self::check_batch_size(readings)?;
        if !reuse_previous {
            self.acquire_raw(readings)?;
        }
        Ok(self.channels.iter().map(|c| c.weight).collect())
    }

    /// Capture each channel's current measurement as its zero offset.
    ///
    /// Runs up to `retries` batches of `readings` frames, keeping the first
    /// successful measurement per channel across attempts. Zeroing only a
    /// subset silently would be unsafe, so any channel still missing after
    /// all attempts fails the whole operation; no offset is changed then.
    pub fn zero(&mut self, readings: usize, retries: usize) -> Result<()> {
        let attempts = retries.max(1);
        let mut offsets: Vec<Option<f64>> = vec![None; self.channels.len()];
        for _ in 0..attempts {
            match self.acquire_raw(readings) {
                Ok(_) => {
                    for (slot, ch) in offsets.iter_mut().zip(&self.channels) {
                        if slot.is_none()
                            && let Some(m) = ch.measurement
                        {
                            *slot = Some(m);
                        }
                    }
                }
                Err(err) => {
                    // A fully failed batch is retryable; anything typed as
                    // configuration is not.
                    if err.downcast_ref::<AcquireError>().is_none() {
                        return Err(err);
                    }
                }
            }
            if offsets.iter().all(Option::is_some) {
                break;
            }
        }

        let missing: Vec<usize> = offsets
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_none())
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            return Err(Report::new(AcquireError::ZeroIncomplete {
                channels: missing,
                attempts,
            }));
        }
        for (ch, offset) in self.channels.iter_mut().zip(offsets) {
            if let Some(offset) = offset {
                ch.zero_offset = offset;
            }
        }
        Ok(())
    }

    /// Assign weight multiples to the selected channels. Performs no
    /// acquisition.
    pub fn set_weight_multiples(
        &mut self,
        multiples: &[f64],
        selector: &ChannelSelector,
    ) -> Result<()> {
        let indices: Vec<usize> = match selector {
            ChannelSelector::Index(indices) => {
                for &i in indices {
                    if i >= self.channels.len() {
                        return Err(Report::new(ConfigError::UnknownChannel(format!(
                            "index {i}"
                        ))));
                    }
                }
                indices.clone()
            }
            ChannelSelector::DataLine(lines) => {
                let mut indices = Vec::with_capacity(lines.len());
                for line in lines {
                    match self.channels.iter().position(|c| c.data_line == *line) {
                        Some(i) => indices.push(i),
                        None => {
                            return Err(Report::new(ConfigError::UnknownChannel(
                                line.to_string(),
                            )));
                        }
                    }
                }
                indices
            }
        };
        if indices.len() != multiples.len() {
            return Err(Report::new(ConfigError::MultipleCountMismatch {
                given: multiples.len(),
                selected: indices.len(),
            }));
        }
        for m in multiples {
            if !m.is_finite() || *m == 0.0 {
                return Err(Report::new(ConfigError::InvalidWeightMultiple));
            }
        }
        for (&i, &m) in indices.iter().zip(multiples) {
            self.channels[i].weight_multiple = m;
        }
        Ok(())
    }

    /// Power every chip down: clock low, then held high past the power-down
    /// threshold.
    pub fn power_down(&mut self) {
        self.io.write(self.clock_line, false);
        self.io.write(self.clock_line, true);
        self.clock.sleep(self.timing.power_settle);
    }

    /// Release the clock line, then re-latch gain/channel with one frame
    /// and the long settle. Returns true when that frame succeeded.
    pub fn power_up(&mut self) -> bool {
        self.io.write(self.clock_line, false);
        self.clock.sleep(self.timing.power_settle);
        let ok = self.read_frame();
        self.clock.sleep(self.timing.gain_settle);
        ok
    }

    /// Power-cycle all chips; true only if the post-power-up frame
    /// succeeded.
    pub fn reset(&mut self) -> bool {
        self.power_down();
        self.power_up()
    }

    /// Change gain and channel. The chip latches the new setting only after
    /// one full read cycle, so a throwaway frame plus the settle delay runs
    /// before this returns; true when that frame succeeded.
    pub fn reconfigure(&mut self, select: ChannelSelect, gain: Gain) -> bool {
        self.select = select;
        self.gain = gain;
        self.trailer_pulses = codec::trailer_pulses(select, gain);
        let ok = self.read_frame();
        self.clock.sleep(self.timing.gain_settle);
        ok
    }

    fn check_batch_size(readings: usize) -> Result<()> {
        if !(1..=MAX_BATCH_READS).contains(&readings) {
            return Err(Report::new(ConfigError::BatchSize(readings)));
        }
        Ok(())
    }

    /// Drive the clock low and poll every channel's data line until all
    /// report ready or the iteration budget runs out. A channel is ready
    /// the first time its line reads low.
    fn poll_ready(&mut self) -> bool {
        self.io.write(self.clock_line, false);
        let mut iterations = 0u32;
        let mut all_ready = false;
        while iterations < self.timing.ready_poll_iterations {
            iterations += 1;
            all_ready = true;
            for ch in self.channels.iter_mut() {
                if !ch.ready {
                    ch.ready = !self.io.read(ch.data_line);
                }
                all_ready &= ch.ready;
            }
            if all_ready {
                break;
            }
            self.clock.sleep(self.timing.ready_poll_interval);
        }
        let level = if all_ready {
            EventLevel::Debug
        } else {
            EventLevel::Warn
        };
        self.events.on_event(
            level,
            &DriverEvent::ReadinessPoll {
                iterations,
                all_ready,
            },
        );
        all_ready
    }

    /// Drive the clock high then immediately low, measuring the high phase.
    /// Nothing may run between the two edges; at 60 us and beyond the chip
    /// has entered power-down and the frame must be discarded.
    fn pulse_clock(&mut self) -> bool {
        let start = self.clock.now();
        self.io.write(self.clock_line, true);
        self.io.write(self.clock_line, false);
        let elapsed = self.clock.elapsed(start);
        if elapsed >= self.timing.pulse_overrun {
            let us = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
            self.last_overrun_us = Some(self.last_overrun_us.map_or(us, |prev| prev.max(us)));
            return false;
        }
        true
    }

    fn reduce_batch(&mut self) -> Result<Vec<Option<f64>>> {
        let filter_cfg = self.filter.clone();
        let mut out = Vec::with_capacity(self.channels.len());
        let mut ok = 0usize;
        for (idx, ch) in self.channels.iter_mut().enumerate() {
            match filter::apply(ch, &filter_cfg) {
                Reduction::Measured(_) => {
                    ok += 1;
                    out.push(ch.measurement_from_zero);
                }
                Reduction::Noisy { stdev } => {
                    self.events.on_event(
                        EventLevel::Warn,
                        &DriverEvent::ChannelNoisy { channel: idx, stdev },
                    );
                    out.push(None);
                }
                Reduction::Empty | Reduction::AllRejected => {
                    self.events
                        .on_event(EventLevel::Warn, &DriverEvent::ChannelEmpty { channel: idx });
                    out.push(None);
                }
            }
        }
        if out.iter().all(Option::is_none) {
            self.events
                .on_event(EventLevel::Error, &DriverEvent::AllChannelsFailed);
            return Err(Report::new(AcquireError::TotalAcquisitionFailure));
        }
        self.events.on_event(
            EventLevel::Info,
            &DriverEvent::BatchReduced {
                ok,
                total: out.len(),
            },
        );
        Ok(out)
    }
}

/// Builder for [`Hx711`]. Validation happens in `build()`; no I/O line is
/// configured unless every parameter checks out.
pub struct Hx711Builder<IO: DigitalIo> {
    io: IO,
    data_lines: Vec<Line>,
    clock_line: Option<Line>,
    gain: Gain,
    select: ChannelSelect,
    fail_policy: FailPolicy,
    filter: FilterCfg,
    timing: TimingCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    events: Option<Arc<dyn EventSink + Send + Sync>>,
}

impl<IO: DigitalIo> Hx711Builder<IO> {
    fn new(io: IO) -> Self {
        Self {
            io,
            data_lines: Vec::new(),
            clock_line: None,
            gain: Gain::X128,
            select: ChannelSelect::A,
            fail_policy: FailPolicy::default(),
            filter: FilterCfg::default(),
            timing: TimingCfg::default(),
            clock: None,
            events: None,
        }
    }

    /// Ordered data lines, one per chip. Order is significant: it fixes the
    /// index used by batch results and selectors.
    pub fn with_data_lines(mut self, lines: impl IntoIterator<Item = Line>) -> Self {
        self.data_lines = lines.into_iter().collect();
        self
    }

    pub fn with_clock_line(mut self, line: Line) -> Self {
        self.clock_line = Some(line);
        self
    }

    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_select(mut self, select: ChannelSelect) -> Self {
        self.select = select;
        self
    }

    pub fn with_fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = timing;
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Provide a custom event sink; defaults to `TracingSink`.
    pub fn with_events(mut self, events: Arc<dyn EventSink + Send + Sync>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate parameters, configure the lines, and latch gain/channel
    /// with one throwaway frame followed by the settle delay the chip
    /// needs before data is valid.
    pub fn build(self) -> Result<Hx711<IO>> {
        let Self {
            mut io,
            data_lines,
            clock_line,
            gain,
            select,
            fail_policy,
            filter,
            timing,
            clock,
            events,
        } = self;

        let clock_line = clock_line.ok_or_else(|| Report::new(ConfigError::NoClockLine))?;
        if data_lines.is_empty() {
            return Err(Report::new(ConfigError::NoDataLines));
        }
        for (i, line) in data_lines.iter().enumerate() {
            if data_lines[..i].contains(line) {
                return Err(Report::new(ConfigError::DuplicateDataLine(*line)));
            }
            if *line == clock_line {
                return Err(Report::new(ConfigError::DataLineIsClock(*line)));
            }
        }
        filter.validate()?;
        timing.validate()?;

        io.configure(clock_line, Direction::Output)
            .map_err(|e| Report::new(AcquireError::Io(format!("{clock_line}: {e}"))))?;
        for line in &data_lines {
            io.configure(*line, Direction::Input)
                .map_err(|e| Report::new(AcquireError::Io(format!("{line}: {e}"))))?;
        }

        let mut driver = Hx711 {
            io,
            clock_line,
            channels: data_lines.into_iter().map(Channel::new).collect(),
            gain,
            select,
            fail_policy,
            filter,
            timing,
            trailer_pulses: codec::trailer_pulses(select, gain),
            clock: clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            events: events.unwrap_or_else(|| Arc::new(TracingSink)),
            last_overrun_us: None,
        };

        // The chip only latches gain/channel after one full read cycle;
        // the outcome of this frame does not matter.
        let _ = driver.read_frame();
        driver.clock.sleep(driver.timing.gain_settle);
        Ok(driver)
    }
}
