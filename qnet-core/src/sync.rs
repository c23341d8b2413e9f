//! Capacity-limited slot pool with strict FIFO grants.
//!
//! A [`SlotPool`] models the service channels of a station. Acquiring a slot
//! completes immediately while a slot is free and nobody is waiting;
//! otherwise the caller joins the back of the wait queue. When a slot is
//! released and someone is waiting, the slot is handed straight to the head
//! of the queue: the in-use count never dips, so a later arrival cannot grab
//! it first.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use crate::error::SimError;

/// Number of parallel service channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capacity {
    Bounded(NonZeroUsize),
    /// Arrivals never wait.
    Unbounded,
}

impl Capacity {
    /// A bounded capacity; zero channels is a configuration error.
    pub fn bounded(channels: usize) -> Result<Self, SimError> {
        NonZeroUsize::new(channels)
            .map(Capacity::Bounded)
            .ok_or_else(|| SimError::Configuration("capacity must be at least one channel".into()))
    }

    /// `None` means unbounded.
    pub fn from_channels(channels: Option<usize>) -> Result<Self, SimError> {
        match channels {
            Some(n) => Self::bounded(n),
            None => Ok(Capacity::Unbounded),
        }
    }

    pub fn channels(&self) -> Option<usize> {
        match self {
            Capacity::Bounded(n) => Some(n.get()),
            Capacity::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Capacity::Unbounded)
    }

    fn admits(&self, in_use: usize) -> bool {
        match self {
            Capacity::Bounded(n) => in_use < n.get(),
            Capacity::Unbounded => true,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Bounded(n) => write!(f, "{n}"),
            Capacity::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[derive(Debug)]
struct Waiter {
    waiter_id: u64,
    waker: Waker,
}

#[derive(Debug)]
struct State {
    capacity: Capacity,
    in_use: usize,
    next_waiter_id: u64,
    // FIFO queue of outstanding acquisitions.
    queue: VecDeque<Waiter>,
    // Waiters that were granted a slot but have not observed it yet.
    ready: HashSet<u64>,
}

impl State {
    /// Free one slot, handing it to the head waiter if there is one.
    fn release_locked(&mut self) -> Result<Option<Waker>, SimError> {
        if self.in_use == 0 {
            return Err(SimError::InvalidState(
                "slot released while no slot is in use".into(),
            ));
        }
        match self.queue.pop_front() {
            Some(waiter) => {
                self.ready.insert(waiter.waiter_id);
                Ok(Some(waiter.waker))
            }
            None => {
                self.in_use -= 1;
                Ok(None)
            }
        }
    }
}

/// FIFO pool of service slots shared by the flows visiting one station.
#[derive(Clone)]
pub struct SlotPool {
    state: Rc<RefCell<State>>,
}

impl fmt::Debug for SlotPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SlotPool")
            .field("capacity", &state.capacity)
            .field("in_use", &state.in_use)
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl SlotPool {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                capacity,
                in_use: 0,
                next_waiter_id: 0,
                queue: VecDeque::new(),
                ready: HashSet::new(),
            })),
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.state.borrow().capacity
    }

    /// Slots currently held, including ones granted but not yet observed.
    pub fn in_use(&self) -> usize {
        self.state.borrow().in_use
    }

    /// Acquisitions still waiting for a slot.
    pub fn queued(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Wait for a slot. Grants follow arrival order.
    pub fn acquire(&self) -> Acquire<'_> {
        Acquire {
            pool: self,
            waiter_id: None,
            completed: false,
        }
    }

    /// Return a slot to this pool.
    ///
    /// Fails with [`SimError::InvalidState`] when the permit was granted by a
    /// different pool.
    pub fn release(&self, mut permit: SlotPermit) -> Result<(), SimError> {
        if !Rc::ptr_eq(&self.state, &permit.state) {
            return Err(SimError::InvalidState(
                "slot released into a pool that did not grant it".into(),
            ));
        }
        permit.released = true;
        let waker = self.state.borrow_mut().release_locked()?;
        if let Some(waker) = waker {
            trace!("Slot handed to next waiter");
            waker.wake();
        }
        Ok(())
    }

    fn permit(&self) -> SlotPermit {
        SlotPermit {
            state: Rc::clone(&self.state),
            released: false,
        }
    }
}

/// Future returned by [`SlotPool::acquire`].
pub struct Acquire<'a> {
    pool: &'a SlotPool,
    waiter_id: Option<u64>,
    completed: bool,
}

impl Future for Acquire<'_> {
    type Output = SlotPermit;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<SlotPermit> {
        let this = &mut *self;
        let pool = this.pool;
        let mut state = pool.state.borrow_mut();

        match this.waiter_id {
            None => {
                if state.queue.is_empty() && state.capacity.admits(state.in_use) {
                    state.in_use += 1;
                    drop(state);
                    this.completed = true;
                    return Poll::Ready(pool.permit());
                }
                let waiter_id = state.next_waiter_id;
                state.next_waiter_id += 1;
                state.queue.push_back(Waiter {
                    waiter_id,
                    waker: cx.waker().clone(),
                });
                this.waiter_id = Some(waiter_id);
                trace!(waiter_id, queued = state.queue.len(), "Waiting for a slot");
                Poll::Pending
            }
            Some(waiter_id) => {
                if state.ready.remove(&waiter_id) {
                    drop(state);
                    this.completed = true;
                    this.waiter_id = None;
                    return Poll::Ready(pool.permit());
                }
                if let Some(waiter) = state.queue.iter_mut().find(|w| w.waiter_id == waiter_id) {
                    if !waiter.waker.will_wake(cx.waker()) {
                        waiter.waker = cx.waker().clone();
                    }
                }
                Poll::Pending
            }
        }
    }
}

impl Drop for Acquire<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let Some(waiter_id) = self.waiter_id.take() else {
            return;
        };
        let waker = {
            let mut state = self.pool.state.borrow_mut();
            if state.ready.remove(&waiter_id) {
                // granted but never observed: pass the slot on
                state.release_locked().ok().flatten()
            } else {
                if let Some(pos) = state.queue.iter().position(|w| w.waiter_id == waiter_id) {
                    state.queue.remove(pos);
                }
                None
            }
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// A held slot. Hand it back with [`SlotPool::release`]; a permit dropped
/// without being released frees its slot as well.
pub struct SlotPermit {
    state: Rc<RefCell<State>>,
    released: bool,
}

impl fmt::Debug for SlotPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPermit")
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let released = self.state.borrow_mut().release_locked();
        match released {
            Ok(Some(waker)) => waker.wake(),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Dropped slot permit could not be released"),
        }
    }
}
