//! Download stations: service time is data volume over the class speed.

use std::cell::RefCell;

use qnet_core::dists::FoldedNormal;
use qnet_core::{duration_from_secs_f64, Capacity, SchedulerHandle, SimError};
use tracing::trace;

use super::{require_bounded, ServiceStation, Station, Visit};
use crate::user::User;

/// Whole-file download. The file size is drawn on each visit as
/// `|N(class mean, σ)|` and stored on the user.
#[derive(Debug)]
pub struct TransferStation {
    base: Station,
    file_sizes: RefCell<FoldedNormal>,
}

impl TransferStation {
    /// # Errors
    ///
    /// [`SimError::Configuration`] for unbounded capacity.
    pub fn new(
        name: &'static str,
        capacity: Capacity,
        file_sizes: FoldedNormal,
        handle: SchedulerHandle,
    ) -> Result<Self, SimError> {
        let capacity = require_bounded(name, capacity)?;
        Ok(Self {
            base: Station::new(name, capacity, handle),
            file_sizes: RefCell::new(file_sizes),
        })
    }

    pub async fn visit(&self, user: &User) -> Result<Visit, SimError> {
        let params = user.params();
        let file_size = self.file_sizes.borrow_mut().sample(params.mean_file_size)?;
        user.set_file_size(file_size);
        let duration = duration_from_secs_f64(file_size / params.mean_transfer_speed)?;
        trace!(user = %user.id(), file_size, ?duration, "Transfer time drawn");
        self.base.visit(user, duration).await
    }
}

impl ServiceStation for TransferStation {
    fn base(&self) -> &Station {
        &self.base
    }
}

/// Per-segment download; the caller supplies the segment size.
#[derive(Debug)]
pub struct SegmentedTransferStation {
    base: Station,
}

impl SegmentedTransferStation {
    /// # Errors
    ///
    /// [`SimError::Configuration`] for unbounded capacity.
    pub fn new(
        name: &'static str,
        capacity: Capacity,
        handle: SchedulerHandle,
    ) -> Result<Self, SimError> {
        let capacity = require_bounded(name, capacity)?;
        Ok(Self {
            base: Station::new(name, capacity, handle),
        })
    }

    pub async fn visit(&self, user: &User, segment_size: f64) -> Result<Visit, SimError> {
        let duration = duration_from_secs_f64(segment_size / user.params().mean_transfer_speed)?;
        self.base.visit(user, duration).await
    }
}

impl ServiceStation for SegmentedTransferStation {
    fn base(&self) -> &Station {
        &self.base
    }
}
