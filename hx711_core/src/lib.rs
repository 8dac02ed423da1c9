#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Multi-channel HX711 load-cell acquisition (hardware-agnostic).
//!
//! Drives one or more HX711 24-bit ADCs that share a single clock line,
//! each chip with its own data line, and reduces the resulting noisy raw
//! frames to stable measurements, offsets, and calibrated weights. All
//! hardware access goes through the `hx711_traits::DigitalIo` capability;
//! time goes through `hx711_traits::Clock` so tests run deterministically.
//!
//! ## Architecture
//!
//! - **codec**: raw 24-bit two's-complement frames to signed values, and
//!   trailer-pulse encoding of the gain/channel configuration
//! - **channel**: per-sensor state (readiness, batch history, zero offset,
//!   weight multiple)
//! - **driver**: the bit-bang acquisition engine (readiness poll, lock-step
//!   frame reads, power management, zeroing)
//! - **filter**: median/deviation outlier rejection turning a batch of
//!   decoded reads into one measurement
//! - **calibration**: weight-multiple derivation from known-weight samples
//!
//! ## Timing contract
//!
//! A clock pulse that stays high for 60 microseconds or longer powers the
//! chips down mid-frame. Nothing in this crate allocates, logs, or sleeps
//! between the rising and falling edge of a pulse; observability happens
//! through `EventSink` at frame and batch boundaries only.

pub mod calibration;
pub mod channel;
pub mod codec;
pub mod driver;
pub mod error;
pub mod events;
pub mod filter;
pub mod mocks;

pub use calibration::{WeightMultipleFit, fit_weight_multiple};
pub use channel::Channel;
pub use codec::{ChannelSelect, FRAME_BITS, Gain};
pub use driver::{
    ChannelSelector, FailPolicy, Hx711, Hx711Builder, MAX_BATCH_READS, TimingCfg,
};
pub use error::{AcquireError, ConfigError, Result};
pub use events::TracingSink;
pub use filter::{FilterCfg, Reduction};
