//! Hardware backends for the HX711 acquisition stack.
//!
//! [`sim::SimulatedChipBank`] runs everywhere and feeds the driver
//! deterministic frames without GPIO. The `hardware` feature adds
//! [`gpio::RppalIo`] for Raspberry Pi pins, and the `rt` feature adds
//! best-effort real-time scheduling helpers for Linux.

pub mod error;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod gpio;

#[cfg(all(feature = "rt", target_os = "linux"))]
pub mod rt;

pub use error::HwError;
pub use sim::SimulatedChipBank;

#[cfg(feature = "hardware")]
pub use gpio::RppalIo;
