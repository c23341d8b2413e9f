//! # qnet - Open queueing network simulator
//!
//! qnet models a content-delivery path as an open queueing network: users
//! arrive as a Poisson stream, are split into Standard, Premium and VIP
//! classes, and visit a fixed route of stations. VIP users stream their file
//! segment by segment through a pacing station. The simulation is
//! deterministic for a given seed.
//!
//! ## Quick Start
//!
//! ```
//! use qnet::prelude::*;
//!
//! let config = NetworkConfig {
//!     horizon: 30.0,
//!     ..NetworkConfig::default()
//! };
//! let report = NetworkSimulation::new(config)?.run()?;
//! assert_eq!(report.stations.len(), 7);
//! # Ok::<(), ComponentError>(())
//! ```
//!
//! ## Crates
//!
//! - [`core`]: virtual clock, event scheduler, async runtime, slot pools,
//!   distributions and logging setup
//! - [`metrics`]: time series, station and network recorders, export
//! - [`components`]: users, stations, configuration and the network itself

pub use qnet_core as core;

pub use qnet_components as components;

pub use qnet_metrics as metrics;

// Convenience re-exports of commonly used items
pub mod prelude {
    //! Commonly used types and traits

    pub use qnet_core::{
        init_simulation_logging, Capacity, Execute, Executor, SchedulerHandle, SimError, SimTime,
        Simulation, SlotPool,
    };

    pub use qnet_components::{
        ComponentError, Hop, NetworkConfig, NetworkReport, NetworkSimulation, ServiceStation,
        UserClass, ValidationError,
    };

    pub use qnet_metrics::{DurationSummary, MetricsError, TimeSeries};
}
