//! Mirror domain events into tracing
//!
//! Every event is recorded at its own level under the `wdm::events` target
//! with the serialized event as a structured field, so `--debug` log files
//! hold the full event stream.

use tracing::Level;
use wdm_events::AppEvent;

macro_rules! event_at {
    ($level:expr, $($field:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!(target: "wdm::events", $($field)+),
            Level::WARN => tracing::warn!(target: "wdm::events", $($field)+),
            Level::INFO => tracing::info!(target: "wdm::events", $($field)+),
            Level::DEBUG => tracing::debug!(target: "wdm::events", $($field)+),
            _ => tracing::trace!(target: "wdm::events", $($field)+),
        }
    };
}

/// Record `event` through tracing
pub fn log_event(event: &AppEvent) {
    let payload =
        serde_json::to_string(event).unwrap_or_else(|e| format!("<unserializable: {e}>"));
    event_at!(
        event.log_level(),
        domain = event.log_target(),
        event = %payload,
        "domain event"
    );
}
