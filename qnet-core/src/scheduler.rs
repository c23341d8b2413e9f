use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

use crate::types::{EventId, TaskId};
use crate::SimTime;

/// Entry stored in the scheduler's priority queue: the task to resume and
/// the instant at which to resume it.
#[derive(Debug, Clone, Copy)]
pub struct EventEntry {
    id: EventId,
    time: SimTime,
    task: TaskId,
}

impl EventEntry {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn task(&self) -> TaskId {
        self.task
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior in BinaryHeap; equal times fall back
        // to scheduling order.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

type Clock = Rc<Cell<SimTime>>;

/// This struct exposes only immutable access to the simulation clock.
/// The clock itself is owned by the scheduler, while others can obtain `ClockRef`
/// to read the current simulation time.
///
/// # Example
///
/// ```
/// # use qnet_core::Scheduler;
/// let scheduler = Scheduler::default();
/// let clock_ref = scheduler.clock();
/// assert_eq!(clock_ref.time(), scheduler.time());
/// ```
#[derive(Debug, Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }
}

/// Scheduler keeps the current time and the queue of pending resumptions.
///
/// Events are drained in non-decreasing time order; events that share a
/// timestamp come out in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    clock: Clock,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            next_event_id: 0,
            events: BinaryHeap::default(),
            clock: Rc::new(Cell::new(SimTime::default())),
        }
    }
}

impl Scheduler {
    /// Schedules `task` to be resumed at `self.time() + delay`.
    pub fn schedule(&mut self, delay: Duration, task: TaskId) -> EventId {
        let time = self.time() + delay;
        self.schedule_at(time, task)
    }

    /// Schedules `task` to be resumed at the current instant, behind every
    /// event already pending for this instant.
    pub fn schedule_now(&mut self, task: TaskId) -> EventId {
        self.schedule(Duration::ZERO, task)
    }

    /// Schedules `task` at an absolute instant. Instants in the past are
    /// moved up to the current time.
    pub fn schedule_at(&mut self, time: SimTime, task: TaskId) -> EventId {
        self.next_event_id += 1;
        let id = EventId(self.next_event_id);
        let time = time.max(self.time());
        crate::logging::events::wake_scheduled(id, task, time);
        self.events.push(EventEntry { id, time, task });
        id
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Returns the next scheduled event or `None` if none are left.
    pub fn peek(&self) -> Option<&EventEntry> {
        self.events.peek()
    }

    /// Removes and returns the next scheduled event, advancing the clock to
    /// its time.
    pub fn pop(&mut self) -> Option<EventEntry> {
        self.events.pop().inspect(|event| {
            self.clock.replace(event.time);
        })
    }

    /// Number of pending events.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Drop every pending event; the clock is left where it is.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
