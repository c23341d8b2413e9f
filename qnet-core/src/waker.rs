//! Task wakers for the virtual-time runtime.
//!
//! A woken task is not polled on the spot. The waker only records the task
//! id in a shared [`WakeQueue`]; after the current poll returns, the runtime
//! turns every recorded id into an event at the current instant. This keeps
//! every resumption on the scheduler's queue, so resumption order is the
//! event order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Wake, Waker};

use crate::types::TaskId;

/// Ids of tasks woken since the queue was last drained, in wake order.
#[derive(Debug, Default, Clone)]
pub struct WakeQueue {
    inner: Arc<Mutex<VecDeque<TaskId>>>,
}

impl WakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: TaskId) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }

    /// Remove and return everything woken so far.
    pub fn drain(&self) -> Vec<TaskId> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

struct TaskWaker {
    task: TaskId,
    queue: WakeQueue,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.queue.push(self.task);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.push(self.task);
    }
}

/// Create a waker that records `task` in `queue` when woken.
pub fn create_task_waker(task: TaskId, queue: WakeQueue) -> Waker {
    Waker::from(Arc::new(TaskWaker { task, queue }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_records_task_ids_in_order() {
        let queue = WakeQueue::new();
        let a = create_task_waker(TaskId(1), queue.clone());
        let b = create_task_waker(TaskId(2), queue.clone());

        b.wake_by_ref();
        a.clone().wake();
        b.wake();

        assert_eq!(queue.drain(), vec![TaskId(2), TaskId(1), TaskId(2)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_waker_clone_and_drop() {
        let queue = WakeQueue::new();
        let waker = create_task_waker(TaskId(7), queue.clone());
        let waker2 = waker.clone();
        assert!(waker.will_wake(&waker2));
        drop(waker);
        drop(waker2);
        assert!(queue.is_empty());
    }
}
