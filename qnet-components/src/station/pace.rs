//! Segment playback pacing.
//!
//! A segmented user may not start playing segment `n + 1` until segment `n`
//! has played for `pace`. Time the user spent elsewhere since leaving this
//! station last (downloading ahead) counts as credit, up to `credit_cap`:
//!
//! ```text
//! wait = max(0, pace - min(enter - last_departure, credit_cap))
//! ```
//!
//! On a user's first visit there is no previous departure and so no credit.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use qnet_core::{Capacity, SchedulerHandle, SimError, SimTime};
use tracing::trace;

use super::{require_bounded, ServiceStation, Station, Visit};
use crate::user::{SegmentParams, User, UserId};

#[derive(Debug)]
pub struct SegmentPaceStation {
    base: Station,
    last_departure: RefCell<HashMap<UserId, SimTime>>,
}

impl SegmentPaceStation {
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
            last_departure: RefCell::new(HashMap::new()),
        })
    }

    /// Pacing wait for `user` entering at `enter`.
    pub fn pace_wait(&self, user: UserId, params: &SegmentParams, enter: SimTime) -> Duration {
        let last = self
            .last_departure
            .borrow()
            .get(&user)
            .copied()
            .unwrap_or(enter);
        let credit = enter.duration_since(last).min(params.credit_cap);
        params.pace.saturating_sub(credit)
    }

    pub fn last_departure(&self, user: UserId) -> Option<SimTime> {
        self.last_departure.borrow().get(&user).copied()
    }

    /// # Errors
    ///
    /// [`SimError::InvalidState`] if the user's class has no segment
    /// parameters.
    pub async fn visit(&self, user: &User) -> Result<Visit, SimError> {
        let params = user.params().segment.ok_or_else(|| {
            SimError::InvalidState(format!("{user} reached a pacing station without a segment plan"))
        })?;
        let enter = self.base.handle().time();
        let wait = self.pace_wait(user.id(), &params, enter);
        trace!(user = %user.id(), ?wait, "Pacing wait computed");

        let visit = self.base.visit(user, wait).await?;
        self.last_departure.borrow_mut().insert(user.id(), visit.end);
        Ok(visit)
    }
}

impl ServiceStation for SegmentPaceStation {
    fn base(&self) -> &Station {
        &self.base
    }
}
