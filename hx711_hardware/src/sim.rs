//! In-memory chip bank for running the full stack without GPIO.

use std::collections::HashMap;

use hx711_traits::{DigitalIo, Direction, Line};
use tracing::trace;

const FRAME_BITS: u32 = 24;
const FRAME_MASK: u32 = 0xFF_FFFF;

#[derive(Debug)]
struct SimChip {
    value: i32,
    step: i32,
    // Some while a frame is being shifted out.
    shifting: Option<(u32, u32)>,
}

impl SimChip {
    fn read(&self) -> bool {
        match self.shifting {
            // MSB first, bit index counts down as edges arrive.
            Some((frame, produced)) => (frame >> FRAME_BITS.saturating_sub(produced)) & 1 == 1,
            // Conversion is always ready: data line low.
            None => false,
        }
    }

    fn rising_edge(&mut self) {
        match &mut self.shifting {
            None => {
                let frame = (self.value as u32) & FRAME_MASK;
                self.shifting = Some((frame, 1));
                self.value = self.value.wrapping_add(self.step);
            }
            Some((_, produced)) => {
                *produced += 1;
                if *produced > FRAME_BITS {
                    self.shifting = None;
                }
            }
        }
    }
}

/// [`DigitalIo`] over simulated chips that are always ready and emit a
/// per-chip arithmetic sequence of values. Useful for exercising the whole
/// driver on machines without the sensor wiring.
#[derive(Debug, Default)]
pub struct SimulatedChipBank {
    chips: HashMap<Line, SimChip>,
    levels: HashMap<Line, bool>,
    configured: HashMap<Line, Direction>,
}

impl SimulatedChipBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a chip on `line` emitting `start`, `start + step`, ... across
    /// successive frames.
    pub fn add_chip(&mut self, line: Line, start: i32, step: i32) {
        self.chips.insert(
            line,
            SimChip {
                value: start,
                step,
                shifting: None,
            },
        );
    }
}

impl DigitalIo for SimulatedChipBank {
    fn configure(
        &mut self,
        line: Line,
        direction: Direction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        trace!(%line, ?direction, "sim configure");
        self.configured.insert(line, direction);
        Ok(())
    }

    fn write(&mut self, line: Line, level: bool) {
        let was = self.levels.insert(line, level).unwrap_or(false);
        if !was && level {
            for chip in self.chips.values_mut() {
                chip.rising_edge();
            }
        }
    }

    fn read(&mut self, line: Line) -> bool {
        match self.chips.get(&line) {
            Some(chip) => chip.read(),
            // Unwired lines float high.
            None => true,
        }
    }
}
