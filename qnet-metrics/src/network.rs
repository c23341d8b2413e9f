//! Network-wide occupancy: how many users are between entrance and exit.

use std::collections::BTreeMap;

use qnet_core::SimTime;
use serde::Serialize;
use tracing::trace;

use crate::error::MetricsError;
use crate::time_series::{serialize_secs, TimeSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Enter,
    Exit,
}

/// A user entering or leaving the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    #[serde(serialize_with = "serialize_secs")]
    pub time: SimTime,
    pub user: u64,
    pub class: &'static str,
    pub kind: TransitionKind,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkRecorder {
    occupancy: usize,
    overall: TimeSeries,
    per_class: BTreeMap<&'static str, (usize, TimeSeries)>,
    transitions: Vec<Transition>,
    entrances: usize,
    exits: usize,
}

impl NetworkRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, time: SimTime, user: u64, class: &'static str) {
        self.occupancy += 1;
        self.entrances += 1;
        self.overall.push(time, self.occupancy);

        let (count, series) = self.per_class.entry(class).or_default();
        *count += 1;
        series.push(time, *count);

        trace!(user, class, occupancy = self.occupancy, "Network entrance recorded");
        self.transitions.push(Transition {
            time,
            user,
            class,
            kind: TransitionKind::Enter,
        });
    }

    /// Record an exit.
    ///
    /// # Errors
    ///
    /// [`MetricsError::InvalidState`] if nobody of `class` is in the network.
    pub fn exit(&mut self, time: SimTime, user: u64, class: &'static str) -> Result<(), MetricsError> {
        let class_count = self.per_class.get(class).map_or(0, |(count, _)| *count);
        if self.occupancy == 0 || class_count == 0 {
            return Err(MetricsError::InvalidState(format!(
                "exit of user {user} ({class}) recorded with no {class} user in the network"
            )));
        }

        self.occupancy -= 1;
        self.exits += 1;
        self.overall.push(time, self.occupancy);
        if let Some((count, series)) = self.per_class.get_mut(class) {
            *count -= 1;
            series.push(time, *count);
        }

        trace!(user, class, occupancy = self.occupancy, "Network exit recorded");
        self.transitions.push(Transition {
            time,
            user,
            class,
            kind: TransitionKind::Exit,
        });
        Ok(())
    }

    /// Users currently in the network.
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn occupancy_of(&self, class: &str) -> usize {
        self.per_class.get(class).map_or(0, |(count, _)| *count)
    }

    pub fn overall_series(&self) -> &TimeSeries {
        &self.overall
    }

    pub fn class_series(&self, class: &str) -> Option<&TimeSeries> {
        self.per_class.get(class).map(|(_, series)| series)
    }

    /// Per-class series in class-label order.
    pub fn class_series_iter(&self) -> impl Iterator<Item = (&'static str, &TimeSeries)> {
        self.per_class.iter().map(|(class, (_, series))| (*class, series))
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn entrances(&self) -> usize {
        self.entrances
    }

    pub fn exits(&self) -> usize {
        self.exits
    }
}
