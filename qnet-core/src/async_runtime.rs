//! DES-based async runtime.
//!
//! This module lets simulation flows be written as ordinary `async` code while
//! every suspension is driven by virtual time.
//!
//! # Key Components
//!
//! - [`DesRuntime`]: owns the suspended futures
//! - [`SchedulerHandle`]: cloneable access to the clock, the event queue and
//!   the task table, handed to anything that needs to sleep or spawn
//! - [`SimSleep`]: a future that completes at a later simulation instant
//!
//! A task is only ever resumed by an event popped from the scheduler. Timers
//! schedule that event directly; any other wake (for example a slot handed
//! over by a [`crate::sync::SlotPool`]) is deferred and becomes an event at
//! the current instant once the running task yields.
//!
//! # Basic Usage
//!
//! ```
//! use qnet_core::{Simulation, SimTime};
//! use std::time::Duration;
//!
//! let mut sim = Simulation::default();
//! let handle = sim.scheduler_handle();
//!
//! sim.spawn(async move {
//!     handle.sleep(Duration::from_millis(100)).await;
//!     handle.sleep(Duration::from_millis(50)).await;
//! });
//!
//! sim.run_until(SimTime::from_millis(200));
//! assert_eq!(sim.time(), SimTime::from_millis(150));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use tracing::{instrument, trace, warn};

use crate::logging::events;
use crate::scheduler::{ClockRef, Scheduler};
use crate::types::{EventId, TaskId};
use crate::waker::{create_task_waker, WakeQueue};
use crate::SimTime;

type BoxedTask = Pin<Box<dyn Future<Output = ()>>>;

/// Table of suspended async tasks.
pub struct DesRuntime {
    next_task_id: u64,
    tasks: HashMap<TaskId, BoxedTask>,
    /// Task being polled right now, if any.
    current: Option<TaskId>,
}

impl Default for DesRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DesRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesRuntime")
            .field("next_task_id", &self.next_task_id)
            .field("tasks", &self.tasks.len())
            .field("current", &self.current)
            .finish()
    }
}

impl DesRuntime {
    pub fn new() -> Self {
        Self {
            next_task_id: 0,
            tasks: HashMap::new(),
            current: None,
        }
    }

    fn insert(&mut self, future: BoxedTask) -> TaskId {
        let task_id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        self.tasks.insert(task_id, future);
        task_id
    }

    fn take(&mut self, task_id: TaskId) -> Option<BoxedTask> {
        self.tasks.remove(&task_id)
    }

    fn take_all(&mut self) -> Vec<BoxedTask> {
        self.tasks.drain().map(|(_, task)| task).collect()
    }

    /// Get the number of live tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn current_task(&self) -> Option<TaskId> {
        self.current
    }
}

struct Shared {
    scheduler: RefCell<Scheduler>,
    runtime: RefCell<DesRuntime>,
    wakes: WakeQueue,
    halted: Cell<bool>,
}

/// Cloneable handle onto the scheduler and runtime of one simulation.
///
/// Stations, flows and generators keep a `SchedulerHandle` to read the clock,
/// wait for virtual time to pass and spawn further tasks. Borrows of the
/// underlying scheduler never outlive a single method call, so the handle can
/// be used freely from inside running tasks.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Rc<Shared>,
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("time", &self.time())
            .field("pending_events", &self.pending_events())
            .field("halted", &self.is_halted())
            .finish()
    }
}

impl SchedulerHandle {
    pub(crate) fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                scheduler: RefCell::new(Scheduler::default()),
                runtime: RefCell::new(DesRuntime::new()),
                wakes: WakeQueue::new(),
                halted: Cell::new(false),
            }),
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.shared.scheduler.borrow().time()
    }

    /// Read-only view of the clock.
    pub fn clock(&self) -> ClockRef {
        self.shared.scheduler.borrow().clock()
    }

    /// Resume `task` after `delay`.
    pub fn schedule(&self, delay: Duration, task: TaskId) -> EventId {
        self.shared.scheduler.borrow_mut().schedule(delay, task)
    }

    pub fn pending_events(&self) -> usize {
        self.shared.scheduler.borrow().pending()
    }

    pub(crate) fn next_event_time(&self) -> Option<SimTime> {
        self.shared.scheduler.borrow().peek().map(|e| e.time())
    }

    /// Spawn a new task. Its first poll is scheduled at the current instant,
    /// so spawning never suspends the caller.
    #[instrument(skip(self, future), fields(task_id))]
    pub fn spawn<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        let task_id = self.shared.runtime.borrow_mut().insert(Box::pin(future));
        self.shared.scheduler.borrow_mut().schedule_now(task_id);

        tracing::Span::current().record("task_id", tracing::field::display(task_id));
        events::task_spawned(task_id, self.time());
        task_id
    }

    pub fn task_count(&self) -> usize {
        self.shared.runtime.borrow().task_count()
    }

    /// The task currently being polled, if called from inside one.
    pub fn current_task(&self) -> Option<TaskId> {
        self.shared.runtime.borrow().current_task()
    }

    /// Sleep for a span of simulation time.
    pub fn sleep(&self, duration: Duration) -> SimSleep {
        SimSleep::new(self.clone(), duration)
    }

    /// Sleep until a specific simulation instant.
    pub fn sleep_until(&self, target: SimTime) -> SimSleep {
        SimSleep::until(self.clone(), target)
    }

    /// Stop the run loop once the current step returns.
    pub fn halt(&self) {
        if !self.shared.halted.replace(true) {
            warn!(time = %self.time(), "Simulation halted");
        }
    }

    pub fn is_halted(&self) -> bool {
        self.shared.halted.get()
    }

    /// Pop the next event and resume its task. Returns `false` when there is
    /// nothing left to run or the simulation was halted.
    pub(crate) fn step(&self) -> bool {
        if self.is_halted() {
            return false;
        }
        let event = self.shared.scheduler.borrow_mut().pop();
        event.is_some_and(|event| {
            trace!(
                event_id = %event.id(),
                event_time = %event.time(),
                task = %event.task(),
                "Processing simulation step"
            );
            self.resume(event.task());
            true
        })
    }

    fn resume(&self, task_id: TaskId) {
        let Some(mut future) = self.shared.runtime.borrow_mut().take(task_id) else {
            trace!(task = %task_id, "Ignoring wake for finished task");
            return;
        };

        let waker = create_task_waker(task_id, self.shared.wakes.clone());
        let mut cx = Context::from_waker(&waker);

        self.shared.runtime.borrow_mut().current = Some(task_id);
        let result = future.as_mut().poll(&mut cx);
        self.shared.runtime.borrow_mut().current = None;

        match result {
            Poll::Ready(()) => events::task_completed(task_id, self.time()),
            Poll::Pending => {
                self.shared.runtime.borrow_mut().tasks.insert(task_id, future);
            }
        }

        self.process_deferred_wakes();
    }

    fn process_deferred_wakes(&self) {
        let woken = self.shared.wakes.drain();
        if woken.is_empty() {
            return;
        }
        let mut scheduler = self.shared.scheduler.borrow_mut();
        for task in woken {
            scheduler.schedule_now(task);
        }
    }

    /// Drop every live task so that their destructors run.
    pub(crate) fn shutdown(&self) {
        let tasks = self.shared.runtime.borrow_mut().take_all();
        drop(tasks);
        self.shared.wakes.drain();
        self.shared.scheduler.borrow_mut().clear();
    }

    fn schedule_wake_at(&self, target: SimTime) -> bool {
        let Some(task) = self.current_task() else {
            return false;
        };
        self.shared.scheduler.borrow_mut().schedule_at(target, task);
        true
    }
}

/// A future that completes after a span of simulated time.
///
/// Created by [`SchedulerHandle::sleep`] and [`SchedulerHandle::sleep_until`].
/// The target instant is fixed on the first poll.
#[derive(Debug)]
pub struct SimSleep {
    handle: SchedulerHandle,
    target_time: Option<SimTime>,
    duration: Duration,
    timer_scheduled: bool,
}

impl SimSleep {
    fn new(handle: SchedulerHandle, duration: Duration) -> Self {
        Self {
            handle,
            target_time: None,
            duration,
            timer_scheduled: false,
        }
    }

    fn until(handle: SchedulerHandle, target_time: SimTime) -> Self {
        Self {
            handle,
            target_time: Some(target_time),
            duration: Duration::ZERO,
            timer_scheduled: false,
        }
    }
}

impl Future for SimSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let now = self.handle.time();
        let duration = self.duration;
        let target = *self.target_time.get_or_insert(now + duration);

        if now >= target {
            return Poll::Ready(());
        }
        if !self.timer_scheduled {
            if self.handle.schedule_wake_at(target) {
                self.timer_scheduled = true;
            } else {
                warn!(%target, "SimSleep polled outside of a simulation task");
            }
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Simulation;

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let sim = Simulation::default();
        let handle = sim.scheduler_handle();
        assert_eq!(handle.task_count(), 0);

        assert_eq!(handle.spawn(async {}), TaskId(0));
        assert_eq!(handle.spawn(async {}), TaskId(1));
        assert_eq!(handle.task_count(), 2);
        assert_eq!(handle.pending_events(), 2);
    }

    #[test]
    fn test_simple_task_completion() {
        let mut sim = Simulation::default();
        let completed = Rc::new(Cell::new(false));
        let flag = completed.clone();

        sim.spawn(async move {
            flag.set(true);
        });
        sim.run_until(SimTime::from_millis(100));

        assert!(completed.get());
        assert_eq!(sim.task_count(), 0);
    }

    #[test]
    fn test_sim_sleep_advances_clock() {
        let mut sim = Simulation::default();
        let handle = sim.scheduler_handle();
        let wake_times = Rc::new(RefCell::new(Vec::new()));
        let log = wake_times.clone();

        sim.spawn(async move {
            log.borrow_mut().push(handle.time());
            handle.sleep(Duration::from_millis(50)).await;
            log.borrow_mut().push(handle.time());
            handle.sleep_until(SimTime::from_millis(120)).await;
            log.borrow_mut().push(handle.time());
        });
        sim.run_until(SimTime::from_millis(200));

        assert_eq!(
            *wake_times.borrow(),
            vec![SimTime::zero(), SimTime::from_millis(50), SimTime::from_millis(120)]
        );
    }

    #[test]
    fn test_zero_sleep_completes_immediately() {
        let mut sim = Simulation::default();
        let handle = sim.scheduler_handle();
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();

        sim.spawn(async move {
            handle.sleep(Duration::ZERO).await;
            flag.set(true);
        });
        assert!(sim.step());
        assert!(done.get());
    }

    #[test]
    fn test_interleaving_follows_virtual_time() {
        let mut sim = Simulation::default();
        let results = Rc::new(RefCell::new(Vec::new()));

        let (h1, r1) = (sim.scheduler_handle(), results.clone());
        sim.spawn(async move {
            r1.borrow_mut().push("t1-start");
            h1.sleep(Duration::from_millis(50)).await;
            r1.borrow_mut().push("t1-50ms");
            h1.sleep(Duration::from_millis(100)).await;
            r1.borrow_mut().push("t1-150ms");
        });

        let (h2, r2) = (sim.scheduler_handle(), results.clone());
        sim.spawn(async move {
            r2.borrow_mut().push("t2-start");
            h2.sleep(Duration::from_millis(100)).await;
            r2.borrow_mut().push("t2-100ms");
        });

        sim.run_until(SimTime::from_millis(200));

        assert_eq!(
            *results.borrow(),
            vec!["t1-start", "t2-start", "t1-50ms", "t2-100ms", "t1-150ms"]
        );
    }

    #[test]
    fn test_spawn_from_inside_a_task() {
        let mut sim = Simulation::default();
        let handle = sim.scheduler_handle();
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer_log = log.clone();

        sim.spawn(async move {
            for i in 0..3u64 {
                let inner_log = outer_log.clone();
                let inner_handle = handle.clone();
                handle.spawn(async move {
                    inner_log.borrow_mut().push((i, inner_handle.time()));
                });
                handle.sleep(Duration::from_secs(1)).await;
            }
        });
        sim.run_until(SimTime::from_secs(10));

        assert_eq!(
            *log.borrow(),
            vec![
                (0, SimTime::from_secs(0)),
                (1, SimTime::from_secs(1)),
                (2, SimTime::from_secs(2)),
            ]
        );
    }

    #[test]
    fn test_halt_stops_the_run_loop() {
        let mut sim = Simulation::default();
        let handle = sim.scheduler_handle();
        let ticks = Rc::new(Cell::new(0));
        let counter = ticks.clone();

        sim.spawn(async move {
            loop {
                counter.set(counter.get() + 1);
                if counter.get() == 3 {
                    handle.halt();
                }
                handle.sleep(Duration::from_secs(1)).await;
            }
        });
        sim.run_until(SimTime::from_secs(100));

        assert_eq!(ticks.get(), 3);
        assert!(sim.scheduler_handle().is_halted());
    }
}
