use std::collections::{LinkedList, VecDeque};

/// An ordered sequence that can back a [`ConcurrentQueue`].
///
/// Implementors need not be thread-safe. The queue only touches its storage
/// while holding its own lock, so every method here sees exclusive access.
///
/// [`ConcurrentQueue`]: crate::ConcurrentQueue
pub trait Storage<T> {
    fn push_back(&mut self, val: T);

    /// Appends the value produced by `f` to the tail.
    ///
    /// Storages that can construct in place may override this; the default
    /// simply forwards to [`push_back`](Self::push_back).
    fn emplace_back<F>(&mut self, f: F)
    where
        F: FnOnce() -> T,
    {
        self.push_back(f())
    }

    fn front(&self) -> Option<&T>;

    fn back(&self) -> Option<&T>;

    fn pop_front(&mut self) -> Option<T>;

    fn pop_back(&mut self) -> Option<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Storage<T> for VecDeque<T> {
    fn push_back(&mut self, val: T) {
        VecDeque::push_back(self, val)
    }

    fn front(&self) -> Option<&T> {
        VecDeque::front(self)
    }

    fn back(&self) -> Option<&T> {
        VecDeque::back(self)
    }

    fn pop_front(&mut self) -> Option<T> {
        VecDeque::pop_front(self)
    }

    fn pop_back(&mut self) -> Option<T> {
        VecDeque::pop_back(self)
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn is_empty(&self) -> bool {
        VecDeque::is_empty(self)
    }
}

impl<T> Storage<T> for LinkedList<T> {
    fn push_back(&mut self, val: T) {
        LinkedList::push_back(self, val)
    }

    fn front(&self) -> Option<&T> {
        LinkedList::front(self)
    }

    fn back(&self) -> Option<&T> {
        LinkedList::back(self)
    }

    fn pop_front(&mut self) -> Option<T> {
        LinkedList::pop_front(self)
    }

    fn pop_back(&mut self) -> Option<T> {
        LinkedList::pop_back(self)
    }

    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn is_empty(&self) -> bool {
        LinkedList::is_empty(self)
    }
}
