//! Invocation List Store
//!
//! The store publishes one immutable `Arc<Vec<Callback>>` through an
//! [`ArcSwap`]. Readers take a snapshot with a single atomic load and can
//! enumerate it for as long as they like; writers never touch a published
//! vector.
//!
//! # Mutation protocol
//!
//! Every write is a compare-and-retry loop:
//!
//! 1. Load the current list `S`.
//! 2. Compute the candidate `S'` from `S`.
//! 3. Compare-and-swap `S -> S'`.
//! 4. If another writer published first, start over from the fresh `S`.
//!
//! Each successful swap is linearizable against the published reference and
//! no concurrent update is lost, since a losing writer always recomputes from
//! the winner's list. Writers may spin under contention but never block.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::callback::Callback;

/// Point-in-time snapshot of a delegate's callbacks.
///
/// Cloning is an `Arc` clone. The snapshot never changes after it is taken,
/// even while the delegate it came from keeps being mutated.
pub struct InvocationList<A, R> {
    entries: Arc<Vec<Callback<A, R>>>,
}

impl<A, R> InvocationList<A, R> {
    pub(crate) fn from_arc(entries: Arc<Vec<Callback<A, R>>>) -> Self {
        Self { entries }
    }

    /// Build a snapshot from an explicit sequence of callbacks.
    pub fn from_vec(entries: Vec<Callback<A, R>>) -> Self {
        Self { entries: Arc::new(entries) }
    }

    /// Callbacks in invocation order.
    pub fn as_slice(&self) -> &[Callback<A, R>] {
        &self.entries
    }

    /// Whether both snapshots share the same underlying allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub(crate) fn into_arc(self) -> Arc<Vec<Callback<A, R>>> {
        self.entries
    }
}

impl<A: Clone + 'static, R: 'static> InvocationList<A, R> {
    /// Run every callback in order with a copy of `args`.
    ///
    /// Returns the last callback's result, or `None` for an empty list. The
    /// final callback receives `args` itself rather than a clone. A panicking
    /// callback aborts the remaining ones.
    pub fn invoke_last(&self, args: A) -> Option<R> {
        let (last, rest) = self.entries.split_last()?;
        for callback in rest {
            callback.call(args.clone());
        }
        Some(last.call(args))
    }
}

impl<A, R> Deref for InvocationList<A, R> {
    type Target = [Callback<A, R>];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<'a, A, R> IntoIterator for &'a InvocationList<A, R> {
    type Item = &'a Callback<A, R>;
    type IntoIter = std::slice::Iter<'a, Callback<A, R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<A, R> Clone for InvocationList<A, R> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries) }
    }
}

impl<A, R> Default for InvocationList<A, R> {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl<A, R> PartialEq for InvocationList<A, R> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.as_slice() == other.as_slice()
    }
}

impl<A, R> Eq for InvocationList<A, R> {}

impl<A, R> Hash for InvocationList<A, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

/// Callbacks have no natural order, so lists only compare as equal or
/// unordered.
impl<A, R> PartialOrd for InvocationList<A, R> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        (self == other).then_some(std::cmp::Ordering::Equal)
    }
}

impl<A, R> fmt::Debug for InvocationList<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

/// The atomically published list behind a delegate.
pub(crate) struct InvocationStore<A, R> {
    list: ArcSwap<Vec<Callback<A, R>>>,
}

impl<A, R> InvocationStore<A, R> {
    pub(crate) fn new(entries: Vec<Callback<A, R>>) -> Self {
        Self { list: ArcSwap::from_pointee(entries) }
    }

    pub(crate) fn from_list(list: InvocationList<A, R>) -> Self {
        Self { list: ArcSwap::new(list.into_arc()) }
    }

    /// Current snapshot.
    pub(crate) fn load(&self) -> InvocationList<A, R> {
        InvocationList::from_arc(self.list.load_full())
    }

    /// Publish `compute(current)` with the compare-and-retry protocol.
    ///
    /// `compute` returns `None` to leave the list as is, in which case
    /// nothing is published and `false` is returned. It may run more than
    /// once when writers race.
    pub(crate) fn update<F>(&self, op: &'static str, mut compute: F) -> bool
    where
        F: FnMut(&[Callback<A, R>]) -> Option<Vec<Callback<A, R>>>,
    {
        let mut retries = 0_u32;
        loop {
            let cur = self.list.load_full();
            let Some(next) = compute(&cur) else {
                tracing::trace!(op, len = cur.len(), "delegate.list.unchanged");
                return false;
            };

            let len = next.len();
            let prev = self.list.compare_and_swap(&cur, Arc::new(next));
            if Arc::ptr_eq(&prev, &cur) {
                tracing::trace!(op, len, retries, "delegate.list.publish");
                return true;
            }

            retries += 1;
            tracing::trace!(op, retries, "delegate.list.retry");
        }
    }
}
