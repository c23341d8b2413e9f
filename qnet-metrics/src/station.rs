//! Per-station statistics: queue and occupancy series plus completed visits.

use std::time::Duration;

use qnet_core::SimTime;
use serde::Serialize;

use crate::time_series::{serialize_secs, TimeSeries};

/// One completed visit to a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitSample {
    pub user: u64,
    pub class: &'static str,
    #[serde(serialize_with = "serialize_secs")]
    pub enter: SimTime,
    #[serde(serialize_with = "serialize_secs")]
    pub start: SimTime,
    #[serde(serialize_with = "serialize_secs")]
    pub end: SimTime,
}

impl VisitSample {
    pub fn durations(&self) -> VisitDurations {
        VisitDurations {
            wait: self.start.duration_since(self.enter),
            service: self.end.duration_since(self.start),
            sojourn: self.end.duration_since(self.enter),
        }
    }
}

/// Time spent waiting, in service, and in total during one visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitDurations {
    pub wait: Duration,
    pub service: Duration,
    pub sojourn: Duration,
}

/// Mean visit durations in seconds. All zeros when there are no samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DurationSummary {
    pub count: usize,
    pub mean_wait: f64,
    pub mean_service: f64,
    pub mean_sojourn: f64,
}

impl DurationSummary {
    pub fn from_durations<'a>(durations: impl IntoIterator<Item = &'a VisitDurations>) -> Self {
        let mut summary = Self::default();
        for d in durations {
            summary.count += 1;
            summary.mean_wait += d.wait.as_secs_f64();
            summary.mean_service += d.service.as_secs_f64();
            summary.mean_sojourn += d.sojourn.as_secs_f64();
        }
        if summary.count > 0 {
            let n = summary.count as f64;
            summary.mean_wait /= n;
            summary.mean_service /= n;
            summary.mean_sojourn /= n;
        }
        summary
    }
}

/// Records everything observed at one station.
#[derive(Debug, Clone, Default)]
pub struct StationRecorder {
    queue_length: TimeSeries,
    occupancy: TimeSeries,
    visits: Vec<VisitSample>,
}

impl StationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the station state at `time`.
    pub fn snapshot(&mut self, time: SimTime, queued: usize, in_service: usize) {
        self.queue_length.push(time, queued);
        self.occupancy.push(time, in_service);
    }

    pub fn record_visit(&mut self, sample: VisitSample) {
        debug_assert!(sample.enter <= sample.start && sample.start <= sample.end);
        self.visits.push(sample);
    }

    pub fn queue_length(&self) -> &TimeSeries {
        &self.queue_length
    }

    pub fn occupancy(&self) -> &TimeSeries {
        &self.occupancy
    }

    pub fn visits(&self) -> &[VisitSample] {
        &self.visits
    }

    pub fn sample_durations(&self) -> Vec<VisitDurations> {
        self.visits.iter().map(VisitSample::durations).collect()
    }

    pub fn summary(&self) -> DurationSummary {
        DurationSummary::from_durations(&self.sample_durations())
    }

    /// Summary restricted to visits made by users of one class.
    pub fn summary_for_class(&self, class: &str) -> DurationSummary {
        let durations: Vec<_> = self
            .visits
            .iter()
            .filter(|v| v.class == class)
            .map(VisitSample::durations)
            .collect();
        DurationSummary::from_durations(&durations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(user: u64, class: &'static str, enter: f64, start: f64, end: f64) -> VisitSample {
        VisitSample {
            user,
            class,
            enter: SimTime::from_secs_f64(enter).unwrap(),
            start: SimTime::from_secs_f64(start).unwrap(),
            end: SimTime::from_secs_f64(end).unwrap(),
        }
    }

    #[test]
    fn test_empty_recorder_summaries_are_zero() {
        let recorder = StationRecorder::new();
        assert!(recorder.sample_durations().is_empty());
        assert_eq!(recorder.summary(), DurationSummary::default());
        assert_eq!(recorder.summary_for_class("vip"), DurationSummary::default());
    }

    #[test]
    fn test_durations_and_summary() {
        let mut recorder = StationRecorder::new();
        recorder.record_visit(visit(1, "standard", 0.0, 0.0, 1.0));
        recorder.record_visit(visit(2, "premium", 0.5, 1.0, 2.0));

        let durations = recorder.sample_durations();
        assert_eq!(durations[1].wait, Duration::from_millis(500));
        assert_eq!(durations[1].service, Duration::from_secs(1));
        assert_eq!(durations[1].sojourn, Duration::from_millis(1500));

        let summary = recorder.summary();
        assert_eq!(summary.count, 2);
        assert!((summary.mean_wait - 0.25).abs() < 1e-12);
        assert!((summary.mean_service - 1.0).abs() < 1e-12);
        assert!((summary.mean_sojourn - 1.25).abs() < 1e-12);

        let premium = recorder.summary_for_class("premium");
        assert_eq!(premium.count, 1);
        assert!((premium.mean_wait - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_snapshots_feed_both_series() {
        let mut recorder = StationRecorder::new();
        recorder.snapshot(SimTime::zero(), 0, 1);
        recorder.snapshot(SimTime::from_secs(1), 2, 1);
        assert_eq!(recorder.queue_length().max(), 2);
        assert_eq!(recorder.occupancy().len(), 2);
    }
}
