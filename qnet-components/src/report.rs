//! End-of-run report.

use std::collections::BTreeMap;

use qnet_core::SimTime;
use qnet_metrics::{DurationSummary, TimeSeries};
use serde::Serialize;

use crate::network::Network;
use crate::routing::Hop;
use crate::user::UserClass;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkReport {
    /// Seconds.
    pub horizon: f64,
    /// Clock at the end of the run, seconds.
    pub final_time: f64,
    pub stations: Vec<StationReport>,
    pub classes: Vec<ClassReport>,
    pub network: NetworkSection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReport {
    pub name: &'static str,
    /// `None` for unbounded stations.
    pub channels: Option<usize>,
    pub summary: DurationSummary,
    pub mean_queue_length: f64,
    pub mean_occupancy: f64,
    pub peak_queue_length: usize,
    pub queue_length: TimeSeries,
    pub occupancy: TimeSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub class: UserClass,
    pub arrivals: u64,
    pub completed: usize,
    /// Mean entrance-to-exit time of completed users, seconds.
    pub mean_sojourn: f64,
    /// Same, minus the time spent at the pacing station.
    pub mean_sojourn_excluding_pacing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSection {
    pub entrances: usize,
    pub exits: usize,
    pub in_flight: usize,
    pub occupancy: TimeSeries,
    pub class_occupancy: BTreeMap<&'static str, TimeSeries>,
}

impl NetworkReport {
    /// Aggregate everything recorded in `network` up to `now`.
    ///
    /// Series averages cover `[0, horizon)`: stations read zero before
    /// their first visit and the state after the last event holds until the
    /// horizon.
    pub fn from_network(network: &Network, now: SimTime) -> Self {
        let horizon = network.params().horizon;
        let until = now.max(horizon);
        let from = SimTime::zero();

        let stations = network
            .stations()
            .iter()
            .map(|station| {
                let queue_length = station.queue_length_series();
                let occupancy = station.occupancy_series();
                StationReport {
                    name: station.name(),
                    channels: station.capacity().channels(),
                    summary: station.summary(),
                    mean_queue_length: queue_length.time_average_between(from, until),
                    mean_occupancy: occupancy.time_average_between(from, until),
                    peak_queue_length: queue_length.max(),
                    queue_length,
                    occupancy,
                }
            })
            .collect();

        let classes = UserClass::ALL
            .iter()
            .map(|&class| class_report(network, class))
            .collect();

        let recorder = network.recorder();
        let network_section = NetworkSection {
            entrances: recorder.entrances(),
            exits: recorder.exits(),
            in_flight: recorder.occupancy(),
            occupancy: recorder.overall_series().clone(),
            class_occupancy: recorder
                .class_series_iter()
                .map(|(class, series)| (class, series.clone()))
                .collect(),
        };

        Self {
            horizon: horizon.as_secs_f64(),
            final_time: now.as_secs_f64(),
            stations,
            classes,
            network: network_section,
        }
    }

    pub fn station(&self, name: &str) -> Option<&StationReport> {
        self.stations.iter().find(|s| s.name == name)
    }

    pub fn class(&self, class: UserClass) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.class == class)
    }
}

fn class_report(network: &Network, class: UserClass) -> ClassReport {
    let users = network.users();
    let pacing = Hop::Pacing.label();

    let mut completed = 0;
    let mut sojourn = 0.0;
    let mut sojourn_excluding_pacing = 0.0;
    for user in users.iter().filter(|u| u.class() == class) {
        let Some(total) = user.network_sojourn() else {
            continue;
        };
        completed += 1;
        sojourn += total.as_secs_f64();
        sojourn_excluding_pacing += total.saturating_sub(user.time_at(pacing)).as_secs_f64();
    }

    let mean = |sum: f64| if completed == 0 { 0.0 } else { sum / completed as f64 };
    ClassReport {
        class,
        arrivals: network.arrivals(class),
        completed,
        mean_sojourn: mean(sojourn),
        mean_sojourn_excluding_pacing: mean(sojourn_excluding_pacing),
    }
}

impl StationReport {
    /// Mean occupancy per channel; `None` when unbounded.
    pub fn utilization(&self) -> Option<f64> {
        self.channels.map(|c| self.mean_occupancy / c as f64)
    }
}
