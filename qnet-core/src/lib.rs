//! Core discrete event simulation kernel.
//!
//! This crate provides the building blocks every qnet model runs on: virtual
//! time, an ordered event queue, an async runtime whose suspensions are driven
//! by that queue, and a FIFO slot pool for capacity-limited resources.
//!
//! # Architecture Overview
//!
//! - [`Simulation`]: owns the scheduler and the task table and drives them.
//! - [`SchedulerHandle`]: a cloneable handle for reading the clock, sleeping
//!   and spawning tasks. Pass it to stations and generators.
//! - [`sync::SlotPool`]: capacity with strict first-come first-served grants.
//!
//! # Basic Usage
//!
//! ```rust
//! use qnet_core::{Simulation, SimTime};
//! use std::time::Duration;
//!
//! let mut simulation = Simulation::default();
//! let handle = simulation.scheduler_handle();
//!
//! simulation.spawn(async move {
//!     handle.sleep(Duration::from_secs(3)).await;
//! });
//!
//! simulation.run_until(SimTime::from_secs(10));
//! assert_eq!(simulation.time(), SimTime::from_secs(3));
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], which represents simulation time (not
//! wall-clock time). Given the same seeds, two runs resume tasks in exactly
//! the same order.

pub mod async_runtime;
pub mod dists;
pub mod error;
pub mod execute;
pub mod logging;
pub mod randomness;
pub mod scheduler;
pub mod sync;
pub mod time;
pub mod types;
pub mod waker;

use std::future::Future;
use tracing::{info, instrument};

pub use async_runtime::{DesRuntime, SchedulerHandle, SimSleep};
pub use error::SimError;
pub use execute::{Execute, Executor};
pub use logging::{
    init_detailed_simulation_logging, init_simulation_logging,
    init_simulation_logging_with_level, simulation_span, station_span,
};
pub use scheduler::{ClockRef, EventEntry, Scheduler};
pub use sync::{Capacity, SlotPermit, SlotPool};
pub use time::{duration_from_secs_f64, SimTime};
pub use types::{EventId, TaskId};

/// Simulation struct that puts the scheduler and the task runtime together.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Simulation {
    handle: SchedulerHandle,
    events_processed: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            handle: SchedulerHandle::new(),
            events_processed: 0,
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("handle", &self.handle)
            .field("events_processed", &self.events_processed)
            .finish()
    }
}

impl Simulation {
    /// Returns a cloneable handle for scheduling, sleeping and spawning.
    #[must_use]
    pub fn scheduler_handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.handle.time()
    }

    /// Returns a ClockRef for reading the simulation time.
    pub fn clock(&self) -> ClockRef {
        self.handle.clock()
    }

    /// Spawn a task; it is first polled at the current instant.
    pub fn spawn<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        self.handle.spawn(future)
    }

    /// Performs one step of the simulation: pops the earliest event and
    /// resumes its task. Returns `false` when no event was available or the
    /// simulation has been halted.
    pub fn step(&mut self) -> bool {
        let stepped = self.handle.step();
        if stepped {
            self.events_processed += 1;
        }
        stepped
    }

    /// Runs the simulation under the given executor.
    ///
    /// See [`Execute`] and [`Executor`] for the available stopping conditions.
    #[instrument(skip(self, executor), fields(initial_time = %self.time()))]
    pub fn execute<E: Execute>(&mut self, executor: E) {
        info!("Starting simulation execution");
        executor.execute(self);
        info!(
            final_time = %self.time(),
            events_processed = self.events_processed,
            "Simulation execution completed"
        );
    }

    /// Resume events in order until the queue is empty or the next event is
    /// later than `horizon`.
    pub fn run_until(&mut self, horizon: SimTime) {
        self.execute(Executor::timed(horizon));
    }

    /// Returns the time of the next scheduled event, or None if no events are scheduled.
    pub fn peek_next_event_time(&self) -> Option<SimTime> {
        self.handle.next_event_time()
    }

    pub fn has_pending_events(&self) -> bool {
        self.handle.pending_events() > 0
    }

    /// Number of live (not yet completed) tasks.
    pub fn task_count(&self) -> usize {
        self.handle.task_count()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Drop every in-flight task and pending event.
    ///
    /// Tasks usually hold handles back into the simulation, so this is also
    /// what releases them; it runs automatically when the simulation is
    /// dropped.
    pub fn shutdown(&mut self) {
        self.handle.shutdown();
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.shutdown();
    }
}
