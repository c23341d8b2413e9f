//! Users (jobs), their classes and identity.

use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use qnet_core::{SimError, SimTime};
use serde::{Deserialize, Serialize};

use crate::routing::{Hop, SEGMENT_ROUTE, WHOLE_FILE_ROUTE};

/// Service class of a user. Fixed for the user's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserClass {
    Standard,
    Premium,
    Vip,
}

impl UserClass {
    pub const ALL: [UserClass; 3] = [UserClass::Standard, UserClass::Premium, UserClass::Vip];

    pub fn label(self) -> &'static str {
        match self {
            UserClass::Standard => "standard",
            UserClass::Premium => "premium",
            UserClass::Vip => "vip",
        }
    }

    /// Whether the class downloads its file segment by segment.
    pub fn is_segmented(self) -> bool {
        matches!(self, UserClass::Vip)
    }

    /// Stations visited in order. Segmented classes run this route once per
    /// segment.
    pub fn route(self) -> &'static [Hop] {
        if self.is_segmented() {
            SEGMENT_ROUTE
        } else {
            WHOLE_FILE_ROUTE
        }
    }
}

impl fmt::Display for UserClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Segmentation and pacing for segmented classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentParams {
    pub segment_size: f64,
    /// Playback time of one segment.
    pub pace: Duration,
    /// Most early-download credit a user can carry into a pacing wait.
    pub credit_cap: Duration,
}

/// Validated per-class parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassParams {
    pub mean_file_size: f64,
    pub mean_transfer_speed: f64,
    pub segment: Option<SegmentParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User({})", self.0)
    }
}

/// Hands out monotonic user ids and counts arrivals per class.
#[derive(Debug, Default)]
pub struct UserIdAllocator {
    next_id: u64,
    arrivals: BTreeMap<UserClass, u64>,
}

impl UserIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, class: UserClass) -> UserId {
        self.next_id += 1;
        *self.arrivals.entry(class).or_default() += 1;
        UserId(self.next_id)
    }

    pub fn arrivals(&self, class: UserClass) -> u64 {
        self.arrivals.get(&class).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.next_id
    }
}

/// One completed station visit, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitRecord {
    pub station: &'static str,
    pub segment: Option<usize>,
    pub enter: SimTime,
    pub start: SimTime,
    pub end: SimTime,
}

impl VisitRecord {
    pub fn sojourn(&self) -> Duration {
        self.end.duration_since(self.enter)
    }
}

/// A job moving through the network.
#[derive(Debug)]
pub struct User {
    id: UserId,
    class: UserClass,
    params: ClassParams,
    file_size: Cell<Option<f64>>,
    segments: RefCell<Vec<f64>>,
    current_segment: Cell<Option<usize>>,
    visits: RefCell<Vec<VisitRecord>>,
    entered: Cell<Option<SimTime>>,
    exited: Cell<Option<SimTime>>,
}

impl User {
    pub fn new(id: UserId, class: UserClass, params: ClassParams) -> Self {
        Self {
            id,
            class,
            params,
            file_size: Cell::new(None),
            segments: RefCell::new(Vec::new()),
            current_segment: Cell::new(None),
            visits: RefCell::new(Vec::new()),
            entered: Cell::new(None),
            exited: Cell::new(None),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn class(&self) -> UserClass {
        self.class
    }

    pub fn params(&self) -> &ClassParams {
        &self.params
    }

    pub fn file_size(&self) -> Option<f64> {
        self.file_size.get()
    }

    pub fn set_file_size(&self, size: f64) {
        self.file_size.set(Some(size));
    }

    /// Segment plan; empty for whole-file classes.
    pub fn segments(&self) -> Ref<'_, Vec<f64>> {
        self.segments.borrow()
    }

    pub fn set_segments(&self, segments: Vec<f64>) {
        *self.segments.borrow_mut() = segments;
    }

    /// Segment currently being routed, if the class is segmented.
    pub fn current_segment(&self) -> Option<usize> {
        self.current_segment.get()
    }

    pub fn set_current_segment(&self, segment: Option<usize>) {
        self.current_segment.set(segment);
    }

    pub fn visits(&self) -> Ref<'_, Vec<VisitRecord>> {
        self.visits.borrow()
    }

    pub fn record_visit(&self, station: &'static str, enter: SimTime, start: SimTime, end: SimTime) {
        self.visits.borrow_mut().push(VisitRecord {
            station,
            segment: self.current_segment.get(),
            enter,
            start,
            end,
        });
    }

    pub fn entered(&self) -> Option<SimTime> {
        self.entered.get()
    }

    pub fn mark_entered(&self, time: SimTime) {
        self.entered.set(Some(time));
    }

    pub fn exited(&self) -> Option<SimTime> {
        self.exited.get()
    }

    pub fn mark_exited(&self, time: SimTime) {
        self.exited.set(Some(time));
    }

    /// Entrance to exit, once the user has left.
    pub fn network_sojourn(&self) -> Option<Duration> {
        Some(self.exited.get()?.duration_since(self.entered.get()?))
    }

    /// Total time spent in visits to `station`.
    pub fn time_at(&self, station: &str) -> Duration {
        self.visits
            .borrow()
            .iter()
            .filter(|v| v.station == station)
            .map(VisitRecord::sojourn)
            .sum()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.class)
    }
}

/// Upper bound on the segments one file may be split into.
pub const MAX_SEGMENTS: usize = 10_000;

/// Split `file_size` into full segments of `segment_size` plus a remainder.
///
/// A remainder of zero is not emitted.
///
/// # Errors
///
/// [`SimError::InvalidState`] when the split would exceed [`MAX_SEGMENTS`]
/// or the sizes are not finite and positive.
pub fn split_into_segments(file_size: f64, segment_size: f64) -> Result<Vec<f64>, SimError> {
    let count = (file_size / segment_size).ceil();
    if !(segment_size > 0.0 && count.is_finite() && count >= 0.0) || count > MAX_SEGMENTS as f64 {
        return Err(SimError::InvalidState(format!(
            "cannot split file of size {file_size} into segments of {segment_size} \
             (limit {MAX_SEGMENTS} segments)"
        )));
    }

    let full = (file_size / segment_size).floor();
    let mut segments = vec![segment_size; full as usize];
    let remainder = file_size - full * segment_size;
    if remainder > 0.0 {
        segments.push(remainder);
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ClassParams {
        ClassParams {
            mean_file_size: 10.0,
            mean_transfer_speed: 2.0,
            segment: None,
        }
    }

    #[test]
    fn test_allocator_counts_per_class() {
        let mut ids = UserIdAllocator::new();
        assert_eq!(ids.allocate(UserClass::Vip), UserId(1));
        assert_eq!(ids.allocate(UserClass::Standard), UserId(2));
        assert_eq!(ids.allocate(UserClass::Vip), UserId(3));
        assert_eq!(ids.arrivals(UserClass::Vip), 2);
        assert_eq!(ids.arrivals(UserClass::Premium), 0);
        assert_eq!(ids.total(), 3);
    }

    #[test]
    fn test_split_with_remainder() {
        let segments = split_into_segments(10.5, 4.0).unwrap();
        assert_eq!(segments, vec![4.0, 4.0, 2.5]);
    }

    #[test]
    fn test_split_exact_multiple_has_no_empty_tail() {
        assert_eq!(split_into_segments(8.0, 4.0).unwrap(), vec![4.0, 4.0]);
    }

    #[test]
    fn test_split_smaller_than_segment() {
        assert_eq!(split_into_segments(1.25, 4.0).unwrap(), vec![1.25]);
        assert!(split_into_segments(0.0, 4.0).unwrap().is_empty());
    }

    #[test]
    fn test_split_sums_to_file_size() {
        for &size in &[0.3, 7.77, 13.000001, 123.456, 1e-7] {
            let total: f64 = split_into_segments(size, 0.7).unwrap().iter().sum();
            assert!((total - size).abs() <= 1e-9 * size.max(1.0), "{size} vs {total}");
        }
    }

    #[test]
    fn test_split_refuses_too_many_segments() {
        assert!(matches!(
            split_into_segments(40.0, 1e-15),
            Err(SimError::InvalidState(_))
        ));
        assert!(split_into_segments(40.0, 0.0).is_err());
        let at_limit = split_into_segments(MAX_SEGMENTS as f64, 1.0).unwrap();
        assert_eq!(at_limit.len(), MAX_SEGMENTS);
        assert!(split_into_segments(MAX_SEGMENTS as f64 + 0.5, 1.0).is_err());
    }

    #[test]
    fn test_visit_log_and_sojourn() {
        let user = User::new(UserId(1), UserClass::Vip, params());
        user.mark_entered(SimTime::from_secs(1));
        user.set_current_segment(Some(0));
        user.record_visit("pacing", SimTime::from_secs(2), SimTime::from_secs(2), SimTime::from_secs(5));
        user.set_current_segment(Some(1));
        user.record_visit("input", SimTime::from_secs(5), SimTime::from_secs(5), SimTime::from_secs(6));
        user.record_visit("pacing", SimTime::from_secs(6), SimTime::from_secs(7), SimTime::from_secs(8));

        assert_eq!(user.network_sojourn(), None);
        user.mark_exited(SimTime::from_secs(9));
        assert_eq!(user.network_sojourn(), Some(Duration::from_secs(8)));
        assert_eq!(user.time_at("pacing"), Duration::from_secs(5));
        assert_eq!(user.visits()[2].segment, Some(1));
    }

    #[test]
    fn test_routes() {
        assert_eq!(UserClass::Standard.route().len(), 5);
        assert_eq!(UserClass::Premium.route(), UserClass::Standard.route());
        assert_eq!(UserClass::Vip.route().last(), Some(&Hop::Pacing));
        assert_eq!(UserClass::Vip.to_string(), "vip");
    }
}
