use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::storage::Storage;

/// A FIFO queue shared by any number of producer and consumer threads.
///
/// Every access to the backing [`Storage`] goes through one [`Mutex`], and
/// consumers blocked in [`wait_and_pop`](Self::wait_and_pop) park on a
/// [`Condvar`] tied to that lock. Each push wakes at most one parked consumer,
/// with no fairness among consumers.
///
/// There is no capacity limit, no timeout and no way to cancel a blocked
/// consumer. Callers that need bounded waiting must arrange it themselves,
/// e.g. by pushing a sentinel value that tells consumers to stop.
///
/// Panics raised while building an element (inside [`Clone`], [`From`] or the
/// closure given to [`emplace_with`](Self::emplace_with)) propagate to the
/// caller. The storage is left untouched in that case, so the poisoned lock is
/// recovered and the queue keeps working.
///
/// A queue is dropped together with every element still buffered in it. Safe
/// code cannot drop a queue while a consumer is parked inside it, since the
/// consumer holds a borrow for the whole call.
pub struct ConcurrentQueue<T, S = VecDeque<T>> {
    storage: Mutex<S>,
    available: Condvar,
    marker: PhantomData<fn(T) -> T>,
}

impl<T> ConcurrentQueue<T> {
    pub const fn new() -> Self {
        Self::with_storage(VecDeque::new())
    }
}

impl<T, S> ConcurrentQueue<T, S> {
    /// Creates a queue backed by `storage`, keeping any elements it holds.
    pub const fn with_storage(storage: S) -> Self {
        Self {
            storage: Mutex::new(storage),
            available: Condvar::new(),
            marker: PhantomData,
        }
    }

    /// Consumes the queue and returns its backing storage.
    pub fn into_inner(self) -> S {
        self.storage
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        // The storage is only mutated after an element is fully built, so a
        // poisoned lock still guards a consistent sequence.
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, S: Storage<T>> ConcurrentQueue<T, S> {
    /// Appends `val` to the tail and wakes one parked consumer, if any.
    pub fn push(&self, val: T) {
        self.lock().push_back(val);
        self.available.notify_one();
    }

    /// Appends a clone of `val`. The clone is made before taking the lock.
    pub fn push_cloned(&self, val: &T)
    where
        T: Clone,
    {
        self.push(val.clone())
    }

    /// Builds an element from `args` directly at the tail.
    pub fn emplace<A>(&self, args: A)
    where
        T: From<A>,
    {
        self.emplace_with(|| T::from(args))
    }

    /// Builds an element with `f` while holding the lock and appends it.
    ///
    /// `f` must not touch this queue, or it deadlocks.
    pub fn emplace_with<F>(&self, f: F)
    where
        F: FnOnce() -> T,
    {
        self.lock().emplace_back(f);
        self.available.notify_one();
    }

    /// Removes the head element, or returns `None` right away if there is none.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Like [`try_pop`](Self::try_pop), but writes into `out`.
    ///
    /// Returns `false` and leaves `out` untouched if the queue is empty.
    pub fn try_pop_into(&self, out: &mut T) -> bool {
        match self.try_pop() {
            Some(val) => {
                *out = val;
                true
            },
            None => false,
        }
    }

    /// Removes the head element, parking the current thread until one arrives.
    ///
    /// This may block forever if nothing is ever pushed.
    pub fn wait_and_pop(&self) -> T {
        let mut storage = self.lock();
        loop {
            // Re-checked on every wake: wake-ups may be spurious, or another
            // consumer may have taken the element first.
            if let Some(val) = storage.pop_front() {
                return val;
            }
            tracing::trace!("queue is empty, parking consumer");
            storage = self
                .available
                .wait(storage)
                .unwrap_or_else(PoisonError::into_inner);
            tracing::trace!("consumer resumed, len={}", storage.len());
        }
    }

    /// Like [`wait_and_pop`](Self::wait_and_pop), but writes into `out`.
    pub fn wait_and_pop_into(&self, out: &mut T) {
        *out = self.wait_and_pop();
    }

    /// Returns whether the queue is empty at the moment of the call.
    ///
    /// The answer may be stale by the time it is read. Never use it to decide
    /// whether a following pop will succeed; check the pop's result instead.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the number of buffered elements at the moment of the call.
    ///
    /// Subject to the same staleness as [`is_empty`](Self::is_empty).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Moves every buffered element into a new queue, leaving this one empty.
    ///
    /// The new queue has its own lock and condition variable; nothing but the
    /// elements is carried over.
    pub fn drain(&self) -> Self
    where
        S: Default,
    {
        let storage = std::mem::take(&mut *self.lock());
        Self::with_storage(storage)
    }

    /// Copies the buffered elements, taken under the lock, into a new queue.
    pub fn snapshot(&self) -> Self
    where
        S: Clone,
    {
        Self::with_storage(S::clone(&self.lock()))
    }
}

impl<T, S: Default> Default for ConcurrentQueue<T, S> {
    fn default() -> Self {
        Self::with_storage(S::default())
    }
}

impl<T, S: Storage<T> + Default> FromIterator<T> for ConcurrentQueue<T, S> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut storage = S::default();
        iter.into_iter().for_each(|val| storage.push_back(val));
        Self::with_storage(storage)
    }
}

impl<T, S: Storage<T>> Extend<T> for &ConcurrentQueue<T, S> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        iter.into_iter().for_each(|val| self.push(val));
    }
}

impl<T, S: Storage<T>> fmt::Debug for ConcurrentQueue<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut d = f.debug_struct("ConcurrentQueue");
        match self.storage.try_lock() {
            Ok(s) => d.field("len", &s.len()),
            Err(TryLockError::Poisoned(e)) => d.field("len", &e.get_ref().len()),
            Err(TryLockError::WouldBlock) => d.field("len", &format_args!("<locked>")),
        };
        d.finish_non_exhaustive()
    }
}
