//! Structured logging for queueing-network simulations.
//!
//! Logging goes through `tracing`; these helpers install a
//! `tracing-subscriber` formatter with sensible per-crate levels.
//!
//! # Controlling output
//!
//! ```rust
//! use qnet_core::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");
//! ```
//!
//! `RUST_LOG` always takes precedence over the level passed in:
//!
//! ```bash
//! RUST_LOG=qnet_components=trace cargo run --example cdn_network
//! RUST_LOG=qnet_core::sync=trace,qnet_components=debug cargo run --example cdn_network
//! ```
//!
//! # Level guidelines
//! - **TRACE**: every scheduled wake, grant and queue transition
//! - **DEBUG**: user arrivals, station visits, task spawns
//! - **INFO**: run start and completion, summary figures
//! - **WARN**: suspicious but accepted configuration
//! - **ERROR**: failures that abort the run
//!
//! Initialization is idempotent: if a global subscriber is already set (a
//! second test in the same process, or an application that installed its
//! own) the call is a no-op.

use crate::{EventId, SimTime, TaskId};
use tracing::{debug, info, trace, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging at `info`.
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
///
/// # Example
/// ```rust
/// use qnet_core::logging::init_simulation_logging_with_level;
///
/// init_simulation_logging_with_level("debug");
/// ```
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{level},qnet_core::scheduler=info,qnet_core::sync=info").into()
    });

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Initialize very verbose, pretty-printed logging for debugging a model.
pub fn init_detailed_simulation_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "debug,qnet_core=trace,qnet_components=trace,qnet_metrics=debug".into()
    });

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Detailed simulation logging initialized");
    }
}

/// Span covering a whole simulation run.
pub fn simulation_span(name: &str) -> Span {
    tracing::info_span!("simulation", name = name)
}

/// Span covering work done inside one station.
pub fn station_span(station: &str, channels: &str) -> Span {
    tracing::debug_span!("station", name = station, channels = channels)
}

/// Logging helpers for recurring simulation events.
pub mod events {
    use super::*;

    pub fn simulation_started(name: &str, horizon: Option<SimTime>) {
        match horizon {
            Some(end) => info!(simulation = name, horizon = %end, "Simulation started"),
            None => info!(simulation = name, "Simulation started (unbounded)"),
        }
    }

    pub fn simulation_completed(name: &str, final_time: SimTime, events_processed: u64) {
        info!(
            simulation = name,
            final_time = %final_time,
            events_processed,
            "Simulation completed"
        );
    }

    pub fn wake_scheduled(event_id: EventId, task: TaskId, time: SimTime) {
        trace!(event_id = %event_id, task = %task, time = %time, "Wake scheduled");
    }

    pub fn task_spawned(task: TaskId, time: SimTime) {
        debug!(task = %task, time = %time, "Task spawned");
    }

    pub fn task_completed(task: TaskId, time: SimTime) {
        debug!(task = %task, time = %time, "Task completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_initialization_is_idempotent() {
        init_simulation_logging_with_level("debug");
        init_simulation_logging_with_level("trace");
        init_detailed_simulation_logging();

        info!("Test info message");
        debug!("Test debug message");
    }

    #[test]
    fn test_span_creation() {
        let _sim = simulation_span("test_simulation").entered();
        let _station = station_span("transfer", "4");
    }

    #[test]
    fn test_event_logging() {
        events::simulation_started("test_sim", Some(SimTime::from_secs(10)));
        events::simulation_started("test_sim", None);
        events::wake_scheduled(EventId(1), TaskId(2), SimTime::from_millis(100));
        events::task_spawned(TaskId(2), SimTime::zero());
        events::task_completed(TaskId(2), SimTime::from_secs(1));
        events::simulation_completed("test_sim", SimTime::from_secs(5), 100);
    }
}
