//! Capability traits consumed by the HX711 acquisition stack.
//!
//! Hardware access goes through [`DigitalIo`], time through [`Clock`], and
//! observability through [`EventSink`]. All three are injected so the core
//! driver can run against real GPIO, an in-memory simulator, or scripted
//! test doubles without changing a line of driver code.

pub mod clock;
pub mod events;

pub use clock::{Clock, MonotonicClock};
pub use events::{DriverEvent, EventLevel, EventSink, NullSink};

use core::fmt;

/// Opaque identifier for one digital line (a BCM-style pin number on a Pi,
/// or whatever the backing `DigitalIo` maps it to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Line(pub u8);

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}

/// Direction a line is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Digital I/O capability: pin configuration plus single-line read/write.
///
/// `write` and `read` are infallible and must be cheap: the driver calls
/// them between the rising and falling edge of a clock pulse, where
/// allocation, logging, or blocking I/O would violate the 60 microsecond
/// power-down threshold of the chip. Backends that can fail at runtime
/// should surface that during `configure` and degrade reads of
/// unconfigured lines to a fixed level.
pub trait DigitalIo {
    fn configure(
        &mut self,
        line: Line,
        direction: Direction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn write(&mut self, line: Line, level: bool);

    fn read(&mut self, line: Line) -> bool;
}
