//! Default `EventSink` that forwards driver events to `tracing`.

use hx711_traits::{DriverEvent, EventLevel, EventSink};

/// Forwards each driver event to the `tracing` macros at the matching
/// level. This is the sink a driver gets when none is injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, level: EventLevel, event: &DriverEvent) {
        match level {
            EventLevel::Debug => tracing::debug!(?event, "hx711"),
            EventLevel::Info => tracing::info!(?event, "hx711"),
            EventLevel::Warn => tracing::warn!(?event, "hx711"),
            EventLevel::Error => tracing::error!(?event, "hx711"),
        }
    }
}
