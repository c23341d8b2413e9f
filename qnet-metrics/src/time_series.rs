//! Step-function time series of integer gauges.
//!
//! Station queue lengths and occupancies are recorded as `(instant, value)`
//! points: the value holds from its instant until the next point. Points
//! are appended in non-decreasing time order, which the simulation clock
//! guarantees.

use qnet_core::SimTime;
use serde::{Serialize, Serializer};

/// Time-series data point with timestamp and value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSeriesPoint {
    #[serde(rename = "time", serialize_with = "serialize_secs")]
    pub timestamp: SimTime,
    pub value: usize,
}

/// Serialize an instant as fractional seconds.
pub fn serialize_secs<S: Serializer>(time: &SimTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(time.as_secs_f64())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point. Must not be earlier than the last point.
    pub fn push(&mut self, timestamp: SimTime, value: usize) {
        debug_assert!(
            self.last().map_or(true, |p| p.timestamp <= timestamp),
            "time series points must be appended in time order"
        );
        self.points.push(TimeSeriesPoint { timestamp, value });
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<TimeSeriesPoint> {
        self.points.last().copied()
    }

    /// Largest recorded value; zero when empty.
    pub fn max(&self) -> usize {
        self.points.iter().map(|p| p.value).max().unwrap_or(0)
    }

    /// Time-weighted mean of the step function from the first point up to
    /// `until`.
    ///
    /// Points after `until` are ignored. Returns zero for an empty series or
    /// an empty span.
    pub fn time_average(&self, until: SimTime) -> f64 {
        match self.points.first() {
            Some(first) => self.time_average_between(first.timestamp, until),
            None => 0.0,
        }
    }

    /// Time-weighted mean over `[from, until)`.
    ///
    /// The gauge reads zero before the first point. Returns zero for an
    /// empty span.
    pub fn time_average_between(&self, from: SimTime, until: SimTime) -> f64 {
        if until <= from {
            return 0.0;
        }

        let mut area = 0.0;
        for (i, point) in self.points.iter().enumerate() {
            if point.timestamp >= until {
                break;
            }
            let segment_end = self
                .points
                .get(i + 1)
                .map_or(until, |next| next.timestamp.min(until));
            let segment_start = point.timestamp.max(from);
            if segment_end > segment_start {
                area += point.value as f64
                    * segment_end.duration_since(segment_start).as_secs_f64();
            }
        }
        area / until.duration_since(from).as_secs_f64()
    }
}
