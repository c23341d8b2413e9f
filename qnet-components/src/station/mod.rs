//! Service stations.
//!
//! Every station shares the same mechanics, implemented once by
//! [`Station`]: a FIFO slot pool sized by the station's capacity, state
//! snapshots at each transition and a recorder of completed visits. The
//! variants only decide how long a visit lasts:
//!
//! - [`DelayStation`]: fixed time, bounded or unbounded
//! - [`PipelineStation`]: fixed time, bounded
//! - [`TransferStation`]: file size over class speed, size drawn per visit
//! - [`SegmentedTransferStation`]: segment size over class speed
//! - [`SegmentPaceStation`]: playback pacing with early-download credit

mod delay;
mod pace;
mod transfer;

pub use delay::{DelayStation, PipelineStation};
pub use pace::SegmentPaceStation;
pub use transfer::{SegmentedTransferStation, TransferStation};

use std::cell::{Ref, RefCell};
use std::fmt;
use std::time::Duration;

use qnet_core::{station_span, Capacity, SchedulerHandle, SimError, SimTime, SlotPool};
use qnet_metrics::{DurationSummary, StationRecorder, TimeSeries, VisitDurations, VisitSample};
use tracing::{debug, trace};

use crate::user::User;

/// Instants of one completed visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub enter: SimTime,
    pub start: SimTime,
    pub end: SimTime,
}

impl Visit {
    pub fn wait(&self) -> Duration {
        self.start.duration_since(self.enter)
    }
}

/// Shared station mechanics.
pub struct Station {
    name: &'static str,
    handle: SchedulerHandle,
    pool: SlotPool,
    recorder: RefCell<StationRecorder>,
}

impl fmt::Debug for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Station")
            .field("name", &self.name)
            .field("pool", &self.pool)
            .finish()
    }
}

impl Station {
    pub fn new(name: &'static str, capacity: Capacity, handle: SchedulerHandle) -> Self {
        let _span = station_span(name, &capacity.to_string()).entered();
        debug!("Station created");
        Self {
            name,
            handle,
            pool: SlotPool::new(capacity),
            recorder: RefCell::new(StationRecorder::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> Capacity {
        self.pool.capacity()
    }

    /// Users waiting for a slot.
    pub fn queued(&self) -> usize {
        self.pool.queued()
    }

    /// Users in service.
    pub fn in_service(&self) -> usize {
        self.pool.in_use()
    }

    pub fn handle(&self) -> &SchedulerHandle {
        &self.handle
    }

    /// Run one visit: wait for a slot in arrival order, hold it for
    /// `duration`, release it.
    ///
    /// The station state is snapshotted on entering, on starting service
    /// and on finishing, both before and after the slot is released, so the
    /// series drops back when the station goes idle. The completed visit goes
    /// to the station recorder and the user's visit log.
    pub async fn visit(&self, user: &User, duration: Duration) -> Result<Visit, SimError> {
        let enter = self.handle.time();
        self.snapshot(enter);
        trace!(station = self.name, user = %user.id(), queued = self.queued(), "Entered station");

        let permit = self.pool.acquire().await;
        let start = self.handle.time();
        self.snapshot(start);
        trace!(station = self.name, user = %user.id(), ?duration, "Service started");

        self.handle.sleep(duration).await;
        let end = self.handle.time();
        self.snapshot(end);
        self.pool.release(permit)?;
        self.snapshot(end);
        trace!(station = self.name, user = %user.id(), "Service finished");

        self.recorder.borrow_mut().record_visit(VisitSample {
            user: user.id().0,
            class: user.class().label(),
            enter,
            start,
            end,
        });
        user.record_visit(self.name, enter, start, end);

        Ok(Visit { enter, start, end })
    }

    fn snapshot(&self, time: SimTime) {
        self.recorder
            .borrow_mut()
            .snapshot(time, self.pool.queued(), self.pool.in_use());
    }

    pub fn recorder(&self) -> Ref<'_, StationRecorder> {
        self.recorder.borrow()
    }
}

/// Common surface of every station variant.
pub trait ServiceStation {
    fn base(&self) -> &Station;

    fn name(&self) -> &'static str {
        self.base().name()
    }

    fn capacity(&self) -> Capacity {
        self.base().capacity()
    }

    fn sample_durations(&self) -> Vec<VisitDurations> {
        self.base().recorder().sample_durations()
    }

    fn summary(&self) -> DurationSummary {
        self.base().recorder().summary()
    }

    fn summary_for_class(&self, class: &str) -> DurationSummary {
        self.base().recorder().summary_for_class(class)
    }

    fn queue_length_series(&self) -> TimeSeries {
        self.base().recorder().queue_length().clone()
    }

    fn occupancy_series(&self) -> TimeSeries {
        self.base().recorder().occupancy().clone()
    }
}

/// Reject unbounded capacity for stations that need a finite channel count.
fn require_bounded(name: &str, capacity: Capacity) -> Result<Capacity, SimError> {
    if capacity.is_unbounded() {
        Err(SimError::Configuration(format!(
            "station '{name}' requires a bounded capacity"
        )))
    } else {
        Ok(capacity)
    }
}
