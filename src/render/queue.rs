use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError},
    time::Duration,
};

/// Outcome of a waiting pop.
#[derive(Debug, PartialEq, Eq)]
pub enum Pop<T> {
    /// An item was dequeued.
    Item(T),
    /// Nothing arrived within the timeout.
    Timeout,
    /// [`TaskQueue::nudge`] interrupted the wait before an item arrived.
    Woken,
    /// The queue is closed and drained.
    Closed,
}

/// FIFO work queue shared between one owning worker and any number of producers and thieves.
///
/// Non-blocking operations give up when the lock is contended, blocking ones wait. After
/// [`TaskQueue::done`] pushes are refused, but items already queued can still be popped.
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    ready: Condvar,
    space: Condvar,
    capacity: Option<usize>,
}

struct QueueState<T> {
    items: VecDeque<T>,
    done: bool,
    nudged: bool,
}

impl<T> TaskQueue<T> {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Queue holding at most `capacity` items when `Some`.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                done: false,
                nudged: false,
            }),
            ready: Condvar::new(),
            space: Condvar::new(),
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, QueueState<T>>> {
        match self.state.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn is_full(&self, st: &QueueState<T>) -> bool {
        self.capacity.is_some_and(|c| st.items.len() >= c)
    }

    /// Enqueue without waiting. Hands the item back when contended, full or closed.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let Some(mut st) = self.try_lock() else {
            return Err(item);
        };
        if st.done || self.is_full(&st) {
            return Err(item);
        }
        st.items.push_back(item);
        drop(st);
        self.ready.notify_one();
        Ok(())
    }

    /// Enqueue, waiting for space if bounded. Hands the item back only when closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut st = self.lock();
        while !st.done && self.is_full(&st) {
            st = self.space.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
        if st.done {
            return Err(item);
        }
        st.items.push_back(item);
        drop(st);
        self.ready.notify_one();
        Ok(())
    }

    /// Dequeue without waiting. `None` when empty or contended.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.try_lock()?.items.pop_front();
        if item.is_some() {
            self.space.notify_one();
        }
        item
    }

    /// Dequeue, waiting until an item arrives. `None` once closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut st = self.lock();
        loop {
            if let Some(item) = st.items.pop_front() {
                drop(st);
                self.space.notify_one();
                return Some(item);
            }
            if st.done {
                return None;
            }
            st = self.ready.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Dequeue, waiting at most `timeout` for an item.
    pub fn pop_timeout(&self, timeout: Duration) -> Pop<T> {
        let mut st = self.lock();
        loop {
            if let Some(item) = st.items.pop_front() {
                drop(st);
                self.space.notify_one();
                return Pop::Item(item);
            }
            if st.done {
                return Pop::Closed;
            }
            let (guard, res) = self
                .ready
                .wait_timeout(st, timeout)
                .unwrap_or_else(PoisonError::into_inner);
            st = guard;
            if res.timed_out() && st.items.is_empty() && !st.done {
                return Pop::Timeout;
            }
        }
    }

    /// Dequeue, waiting until an item arrives, the queue closes, or someone calls
    /// [`TaskQueue::nudge`]. A nudge sent while nobody waits is kept for the next wait.
    pub fn wait_pop(&self) -> Pop<T> {
        let mut st = self.lock();
        loop {
            if let Some(item) = st.items.pop_front() {
                drop(st);
                self.space.notify_one();
                return Pop::Item(item);
            }
            if st.done {
                return Pop::Closed;
            }
            if std::mem::take(&mut st.nudged) {
                return Pop::Woken;
            }
            st = self.ready.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Interrupt the current or next [`TaskQueue::wait_pop`] without enqueuing anything.
    pub fn nudge(&self) {
        self.lock().nudged = true;
        self.ready.notify_all();
    }

    /// Close the queue and wake every waiter.
    pub fn done(&self) {
        self.lock().done = true;
        self.ready.notify_all();
        self.space.notify_all();
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Return `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` after [`TaskQueue::done`].
    pub fn is_done(&self) -> bool {
        self.lock().done
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/queue.rs"]
mod tests;
