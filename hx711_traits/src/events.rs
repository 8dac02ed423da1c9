//! Structured driver events.
//!
//! The acquisition engine reports what happened through this capability
//! instead of logging directly; sinks decide how to surface it. Events are
//! only emitted at frame and batch boundaries, never between clock edges.

/// Severity attached to a [`DriverEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// What the acquisition engine observed.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// Readiness poll finished after `iterations` passes over the channels.
    ReadinessPoll { iterations: u32, all_ready: bool },
    /// A frame was abandoned before any clocking because `unready_channels`
    /// data lines never settled and the policy forbids partial frames.
    FrameAborted { unready_channels: usize },
    /// A clock pulse overran the chip's power-down threshold; the frame's
    /// data is discarded.
    PulseOverrun { elapsed_us: u64 },
    /// A channel's batch spread exceeded the stdev ceiling and the channel
    /// was demoted to unready for the rest of the batch.
    ChannelNoisy { channel: usize, stdev: f64 },
    /// A channel produced no usable reads this batch.
    ChannelEmpty { channel: usize },
    /// Every channel failed to reduce; usually wiring or timing, not noise.
    AllChannelsFailed,
    /// A batch reduced successfully on `ok` of `total` channels.
    BatchReduced { ok: usize, total: usize },
}

/// Capability the driver calls to report events.
pub trait EventSink {
    fn on_event(&self, level: EventLevel, event: &DriverEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&self, _level: EventLevel, _event: &DriverEvent) {}
}
