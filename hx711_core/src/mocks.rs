//! Scripted test doubles: a manually advanced clock and an in-memory chip
//! bank implementing [`DigitalIo`].
//!
//! `MockIo` models each chip's conversion cycle as a small state machine so
//! driver tests can script readiness latency, frame contents, and pulse
//! timing without real hardware or real sleeps.

// Test doubles may panic on a poisoned lock.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hx711_traits::{Clock, DigitalIo, Direction, Line};

use crate::codec::FRAME_BITS;

/// Clock whose time only moves when told to. `sleep` advances it by the
/// requested amount, so driver settle delays complete instantly in tests
/// while still being observable.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        let mut offset = self.offset.lock().unwrap();
        *offset += d;
    }

    pub fn offset(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[derive(Debug)]
enum ChipState {
    /// Not ready; each readiness read decrements until the next frame pops.
    Converting { polls_left: u32 },
    /// Ready; data line reads low until the first clock edge.
    Ready { frame: u32 },
    /// Mid-frame; `produced` rising edges have occurred.
    Shifting { frame: u32, produced: u32 },
}

#[derive(Debug)]
struct MockChip {
    state: ChipState,
    frames: Vec<u32>,
    ready_after_polls: u32,
}

impl MockChip {
    fn new(ready_after_polls: u32) -> Self {
        Self {
            state: ChipState::Converting {
                polls_left: ready_after_polls,
            },
            frames: Vec::new(),
            ready_after_polls,
        }
    }

    fn read(&mut self) -> bool {
        match &mut self.state {
            ChipState::Converting { polls_left } => {
                if *polls_left == u32::MAX {
                    return true;
                }
                if *polls_left > 0 {
                    *polls_left -= 1;
                }
                if *polls_left == 0 {
                    if self.frames.is_empty() {
                        return true;
                    }
                    let frame = self.frames.remove(0);
                    self.state = ChipState::Ready { frame };
                    return false;
                }
                true
            }
            ChipState::Ready { .. } => false,
            ChipState::Shifting { frame, produced } => {
                // MSB first; bit index counts down from 23 as edges arrive.
                let idx = FRAME_BITS.saturating_sub(*produced);
                (*frame >> idx) & 1 == 1
            }
        }
    }

    fn rising_edge(&mut self) {
        match &mut self.state {
            ChipState::Converting { .. } => {}
            ChipState::Ready { frame } => {
                self.state = ChipState::Shifting {
                    frame: *frame,
                    produced: 1,
                };
            }
            ChipState::Shifting { produced, .. } => {
                *produced += 1;
                // The first trailer pulse ends the frame and starts the
                // next conversion.
                if *produced > FRAME_BITS {
                    self.state = ChipState::Converting {
                        polls_left: self.ready_after_polls,
                    };
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    configured: HashMap<Line, Direction>,
    chips: HashMap<Line, MockChip>,
    levels: HashMap<Line, bool>,
    write_delay: Duration,
    rising_edges: u64,
}

/// Scripted [`DigitalIo`] over a bank of simulated chips, keyed by data
/// line. Cloning yields a handle to the same bank, so tests keep one clone
/// for inspection while the driver owns the other.
#[derive(Debug, Clone)]
pub struct MockIo {
    inner: Arc<Mutex<Inner>>,
    clock: ManualClock,
}

impl MockIo {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    /// Attach a chip on `line` that reports ready after `ready_after_polls`
    /// readiness reads per conversion.
    pub fn attach_chip(&self, line: Line, ready_after_polls: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.chips.insert(line, MockChip::new(ready_after_polls));
    }

    /// Queue raw 24-bit frames for the chip on `line`, oldest first.
    pub fn push_frames(&self, line: Line, frames: &[u32]) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(chip) = inner.chips.get_mut(&line) {
            chip.frames.extend_from_slice(frames);
        }
    }

    pub fn set_ready_after(&self, line: Line, polls: u32) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(chip) = inner.chips.get_mut(&line) {
            chip.ready_after_polls = polls;
            chip.state = ChipState::Converting { polls_left: polls };
        }
    }

    /// The chip on `line` never reports ready again.
    pub fn set_never_ready(&self, line: Line) {
        self.set_ready_after(line, u32::MAX);
    }

    /// Advance the manual clock by this much on every `write`. Two writes
    /// make one clock pulse, so half the target pulse width here produces
    /// a measured overrun.
    pub fn set_write_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().write_delay = delay;
    }

    /// Rising clock edges observed so far.
    pub fn pulse_count(&self) -> u64 {
        self.inner.lock().unwrap().rising_edges
    }

    pub fn configured_lines(&self) -> usize {
        self.inner.lock().unwrap().configured.len()
    }

    pub fn direction_of(&self, line: Line) -> Option<Direction> {
        self.inner.lock().unwrap().configured.get(&line).copied()
    }
}

impl DigitalIo for MockIo {
    fn configure(
        &mut self,
        line: Line,
        direction: Direction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.inner.lock().unwrap().configured.insert(line, direction);
        Ok(())
    }

    fn write(&mut self, line: Line, level: bool) {
        let mut inner = self.inner.lock().unwrap();
        let delay = inner.write_delay;
        let was = inner.levels.insert(line, level).unwrap_or(false);
        if !was && level {
            inner.rising_edges += 1;
            for chip in inner.chips.values_mut() {
                chip.rising_edge();
            }
        }
        drop(inner);
        if !delay.is_zero() {
            self.clock.advance(delay);
        }
    }

    fn read(&mut self, line: Line) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.chips.get_mut(&line) {
            Some(chip) => chip.read(),
            // A disconnected line floats high: permanently not ready.
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_millis(7));
        assert_eq!(clock.elapsed(start), Duration::from_millis(7));
    }

    #[test]
    fn chip_shifts_a_frame_msb_first() {
        let clock = ManualClock::new();
        let mut io = MockIo::new(clock);
        let line = Line(5);
        io.attach_chip(line, 1);
        io.push_frames(line, &[codec::encode(0x2A)]);

        assert!(!io.read(line), "ready after one poll");
        let mut acc = 0u32;
        for _ in 0..FRAME_BITS {
            io.write(Line(11), true);
            io.write(Line(11), false);
            acc = (acc << 1) | u32::from(io.read(line));
        }
        assert_eq!(acc, 0x2A);
        // Trailer pulse re-arms the conversion.
        io.write(Line(11), true);
        io.write(Line(11), false);
        assert!(io.read(line), "converting again after the trailer");
    }

    #[test]
    fn disconnected_line_reads_high() {
        let clock = ManualClock::new();
        let mut io = MockIo::new(clock);
        assert!(io.read(Line(9)));
    }
}
