//! Fixed-duration stations.

use std::time::Duration;

use qnet_core::{Capacity, SchedulerHandle, SimError};

use super::{require_bounded, ServiceStation, Station, Visit};
use crate::user::User;

/// Pure elapsed time. With unbounded capacity this is an infinite-server
/// station: nobody ever waits.
#[derive(Debug)]
pub struct DelayStation {
    base: Station,
    service_time: Duration,
}

impl DelayStation {
    pub fn new(
        name: &'static str,
        capacity: Capacity,
        service_time: Duration,
        handle: SchedulerHandle,
    ) -> Self {
        Self {
            base: Station::new(name, capacity, handle),
            service_time,
        }
    }

    pub fn service_time(&self) -> Duration {
        self.service_time
    }

    pub async fn visit(&self, user: &User) -> Result<Visit, SimError> {
        self.base.visit(user, self.service_time).await
    }
}

impl ServiceStation for DelayStation {
    fn base(&self) -> &Station {
        &self.base
    }
}

/// Finite-channel processing stage with a fixed service time.
#[derive(Debug)]
pub struct PipelineStation {
    base: Station,
    service_time: Duration,
}

impl PipelineStation {
    /// # Errors
    ///
    /// [`SimError::Configuration`] for unbounded capacity.
    pub fn new(
        name: &'static str,
        capacity: Capacity,
        service_time: Duration,
        handle: SchedulerHandle,
    ) -> Result<Self, SimError> {
        let capacity = require_bounded(name, capacity)?;
        Ok(Self {
            base: Station::new(name, capacity, handle),
            service_time,
        })
    }

    pub fn service_time(&self) -> Duration {
        self.service_time
    }

    pub async fn visit(&self, user: &User) -> Result<Visit, SimError> {
        self.base.visit(user, self.service_time).await
    }
}

impl ServiceStation for PipelineStation {
    fn base(&self) -> &Station {
        &self.base
    }
}
