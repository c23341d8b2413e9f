//! Statistics recording for qnet simulations
//!
//! Recorders keep every sample for the whole run; summaries are computed on
//! demand. Station recorders track queue length, occupancy and completed
//! visits; the network recorder tracks users between entrance and exit.

pub mod error;
pub mod export;
pub mod network;
pub mod station;
pub mod time_series;

pub use error::MetricsError;
pub use network::{NetworkRecorder, Transition, TransitionKind};
pub use station::{DurationSummary, StationRecorder, VisitDurations, VisitSample};
pub use time_series::{TimeSeries, TimeSeriesPoint};
