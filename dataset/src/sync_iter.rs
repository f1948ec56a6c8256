//! Sharing one iterator between worker threads.
//!
//! [`SyncIter`] serialises `next` calls on the wrapped iterator behind a
//! mutex. `&SyncIter` is itself an iterator, so every worker in a
//! `std::thread::scope` can drain the same source:
//!
//! ```rust
//! use deepvoice_dataset::SyncIter;
//!
//! let shared = SyncIter::new(1..=100);
//! let total: i32 = std::thread::scope(|s| {
//!     let workers: Vec<_> = (0..4).map(|_| s.spawn(|| (&shared).sum::<i32>())).collect();
//!     workers.into_iter().map(|w| w.join().unwrap()).sum()
//! });
//! assert_eq!(total, 5050);
//! ```
//!
//! There is no fairness guarantee: one worker may take most items.

use parking_lot::Mutex;

/// An iterator guarded by a lock.
#[derive(Debug)]
pub struct SyncIter<I> {
    inner: Mutex<I>,
}

impl<I: Iterator> SyncIter<I> {
    pub fn new(iter: I) -> Self {
        Self {
            inner: Mutex::new(iter),
        }
    }

    /// Takes the next item. Blocks while another thread holds the lock; the
    /// lock is released on return, including when the source is exhausted.
    pub fn next_item(&self) -> Option<I::Item> {
        self.inner.lock().next()
    }

    pub fn into_inner(self) -> I {
        self.inner.into_inner()
    }
}

impl<I: Iterator> Iterator for &SyncIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item()
    }
}

/// Wraps a function producing iterators so that every iterator it returns
/// is a [`SyncIter`].
pub fn threadsafe<A, I, F>(f: F) -> impl Fn(A) -> SyncIter<I>
where
    F: Fn(A) -> I,
    I: Iterator,
{
    move |args| SyncIter::new(f(args))
}
