//! Multicast Delegate
//!
//! [`Delegate`] is the container: a handle to one atomically published
//! invocation list. Cloning a `Delegate` clones the handle, so clones observe
//! and perform the same mutations, much like cloning a shared signal.
//!
//! # Mutation
//!
//! [`Delegate::add`], [`Delegate::remove`] and [`Delegate::remove_all`] take
//! `&self` and are safe to call from many threads at once. They never block.
//! Absent arguments are silently ignored.
//!
//! # Algebra
//!
//! [`Delegate::combine`], [`Delegate::remove_from`] and
//! [`Delegate::remove_all_from`] are pure: they build new, independent
//! delegates and leave their operands untouched.
//!
//! # Invocation
//!
//! [`Delegate::invoke`] takes one snapshot and calls every callback in order
//! with a clone of the arguments. Only the last result is returned. A
//! callback that panics aborts the rest of that invocation.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Sub};
use std::sync::Arc;

use super::algebra;
use super::callback::{Callback, IntoCallbacks, Leaves};
use super::handler::Handler;
use super::store::{InvocationList, InvocationStore};
use crate::error::{require, DelegateError};

/// A thread-safe multicast delegate over argument tuple `A` and return `R`.
///
/// # Example
///
/// ```rust
/// use relay_core::{Callback, Delegate};
///
/// let log = Delegate::<(i32,), i32>::from_fn(|x: i32| x + 1);
/// log.add(Callback::new(|x: i32| x * 10));
///
/// // Both run; the last result wins.
/// assert_eq!(log.invoke((4,)), 40);
/// ```
pub struct Delegate<A, R = ()> {
    pub(crate) store: Arc<InvocationStore<A, R>>,
}

impl<A: 'static, R: 'static> Delegate<A, R> {
    /// A delegate with no callbacks.
    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    /// A delegate holding `callback`, unwrapped into leaves if it is another
    /// delegate's dispatch entry.
    pub fn new(callback: Callback<A, R>) -> Self {
        Self::from_entries(callback.flatten().into_vec())
    }

    /// Like [`Delegate::new`], but fails on an absent callback.
    ///
    /// This is deliberately stricter than [`Delegate::add`], which ignores
    /// absent callbacks.
    pub fn try_new(callback: Option<Callback<A, R>>) -> Result<Self, DelegateError> {
        require(callback, "callback").map(Self::new)
    }

    /// A delegate holding a single closure.
    pub fn from_fn<H: Handler<A, R>>(handler: H) -> Self {
        Self::new(Callback::new(handler))
    }

    fn from_entries(entries: Vec<Callback<A, R>>) -> Self {
        Self { store: Arc::new(InvocationStore::new(entries)) }
    }

    fn from_list(list: InvocationList<A, R>) -> Self {
        Self { store: Arc::new(InvocationStore::from_list(list)) }
    }

    /// Current snapshot of the callbacks, in invocation order.
    pub fn invocation_list(&self) -> InvocationList<A, R> {
        self.store.load()
    }

    /// Number of callbacks in the current snapshot.
    pub fn len(&self) -> usize {
        self.store.load().len()
    }

    /// Whether the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.store.load().is_empty()
    }

    /// An independent delegate starting from the current snapshot.
    pub fn detach(&self) -> Self {
        Self::from_list(self.store.load())
    }

    /// Whether both handles refer to the same delegate.
    pub fn same_delegate(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    /// Append `callback`'s leaves.
    pub fn add(&self, callback: impl IntoCallbacks<A, R>) {
        let leaves = callback.into_callbacks();
        if leaves.is_empty() {
            return;
        }
        self.store.update("add", |cur| Some(algebra::append(cur, &leaves)));
    }

    /// Remove the rightmost contiguous occurrence of `callback`'s leaves.
    ///
    /// Returns whether anything was removed.
    pub fn remove(&self, callback: impl IntoCallbacks<A, R>) -> bool {
        let leaves = callback.into_callbacks();
        self.store.update("remove", |cur| algebra::remove_last(cur, &leaves))
    }

    /// Remove every occurrence of `callback`'s leaves, rightmost first.
    ///
    /// Returns whether anything was removed.
    pub fn remove_all(&self, callback: impl IntoCallbacks<A, R>) -> bool {
        let leaves = callback.into_callbacks();
        self.store.update("remove_all", |cur| algebra::remove_all(cur, &leaves))
    }

    /// Concatenate two delegates into a new one.
    ///
    /// An absent operand is the identity: the result holds the other
    /// operand's list but is still a separate delegate.
    pub fn combine(a: Option<&Self>, b: Option<&Self>) -> Option<Self> {
        match (a, b) {
            (None, None) => None,
            (Some(only), None) | (None, Some(only)) => Some(only.detach()),
            (Some(a), Some(b)) => Some(Self::from_entries(algebra::append(
                &a.invocation_list(),
                &b.invocation_list(),
            ))),
        }
    }

    /// Concatenate any number of delegates in argument order, skipping
    /// absent ones.
    pub fn combine_all<'a, I>(operands: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<&'a Self>>,
    {
        operands
            .into_iter()
            .fold(None, |acc, next| Self::combine(acc.as_ref(), next))
    }

    /// A new delegate equal to `source` minus the rightmost occurrence of
    /// `value`'s list. An absent `value` returns `source` unchanged.
    pub fn remove_from(source: Option<&Self>, value: Option<&Self>) -> Result<Self, DelegateError> {
        Self::remove_with(source, value, algebra::remove_last)
    }

    /// A new delegate equal to `source` minus every occurrence of `value`'s
    /// list. An absent `value` returns `source` unchanged.
    pub fn remove_all_from(source: Option<&Self>, value: Option<&Self>) -> Result<Self, DelegateError> {
        Self::remove_with(source, value, algebra::remove_all)
    }

    fn remove_with(
        source: Option<&Self>,
        value: Option<&Self>,
        op: fn(&[Callback<A, R>], &[Callback<A, R>]) -> Option<Vec<Callback<A, R>>>,
    ) -> Result<Self, DelegateError> {
        let source = require(source, "source")?;
        let Some(value) = value else {
            return Ok(source.detach());
        };

        let list = source.invocation_list();
        Ok(match op(&list, &value.invocation_list()) {
            Some(remaining) => Self::from_entries(remaining),
            None => Self::from_list(list),
        })
    }

    /// The only callback, if there is exactly one.
    pub fn single(&self) -> Option<Callback<A, R>> {
        match self.store.load().as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }

    /// Receiver of the only callback, when there is exactly one and it is a
    /// bound method.
    pub fn target(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.single().and_then(|cb| cb.target().cloned())
    }

    /// Code address of the only callback, when there is exactly one and it
    /// is a function pointer or bound method.
    pub fn method(&self) -> Option<usize> {
        self.single().and_then(|cb| cb.method_address())
    }

    /// Convert into a delegate of another shape.
    ///
    /// Each leaf is wrapped so that `args` maps the new argument tuple onto
    /// this one and `ret` maps results back. The returned delegate is
    /// independent of this one.
    pub fn adapt<B, S, FA, FR>(&self, args: FA, ret: FR) -> Delegate<B, S>
    where
        B: 'static,
        S: 'static,
        FA: Fn(B) -> A + Send + Sync + 'static,
        FR: Fn(R) -> S + Send + Sync + 'static,
    {
        let map = Arc::new((args, ret));
        let entries = self
            .invocation_list()
            .iter()
            .map(|cb| cb.clone().adapt_with(Arc::clone(&map)))
            .collect();
        Delegate::from_entries(entries)
    }
}

impl<A: Clone + 'static, R: 'static> Delegate<A, R> {
    /// Call every callback in order and return the last result, or
    /// `R::default()` when there are none.
    pub fn invoke(&self, args: A) -> R
    where
        R: Default,
    {
        self.invoke_last(args).unwrap_or_default()
    }

    /// Call every callback in order and return the last result, if any.
    pub fn invoke_last(&self, args: A) -> Option<R> {
        self.store.load().invoke_last(args)
    }

    /// Convert into a plain callback that dispatches to this delegate's
    /// current list.
    ///
    /// Admitting the result into any delegate unwraps it back into leaves.
    pub fn to_callback(&self) -> Callback<A, R>
    where
        R: Default,
    {
        Callback::dispatch(Arc::clone(&self.store))
    }
}

impl<A: Clone + 'static, T: 'static, E: 'static> Delegate<A, Result<T, E>> {
    /// Call every callback in order, stopping at the first error.
    ///
    /// Returns the last success, or `Ok(None)` when there are no callbacks.
    pub fn try_invoke(&self, args: A) -> Result<Option<T>, E> {
        let mut last = None;
        for callback in &self.store.load() {
            last = Some(callback.call(args.clone())?);
        }
        Ok(last)
    }
}

impl<A, R> Clone for Delegate<A, R> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<A: 'static, R: 'static> Default for Delegate<A, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A, R> PartialEq for Delegate<A, R> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store) || self.store.load() == other.store.load()
    }
}

impl<A, R> Eq for Delegate<A, R> {}

impl<A, R> Hash for Delegate<A, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.store.load().hash(state);
    }
}

impl<A, R> fmt::Debug for Delegate<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("callbacks", &self.store.load())
            .finish()
    }
}

impl<A: 'static, R: 'static> From<Callback<A, R>> for Delegate<A, R> {
    fn from(callback: Callback<A, R>) -> Self {
        Self::new(callback)
    }
}

impl<A: 'static, R: 'static> TryFrom<Option<Callback<A, R>>> for Delegate<A, R> {
    type Error = DelegateError;

    fn try_from(callback: Option<Callback<A, R>>) -> Result<Self, Self::Error> {
        Self::try_new(callback)
    }
}

impl<A: Clone + 'static, R: Default + 'static> From<&Delegate<A, R>> for Callback<A, R> {
    fn from(delegate: &Delegate<A, R>) -> Self {
        delegate.to_callback()
    }
}

impl<A: 'static, R: 'static> IntoCallbacks<A, R> for &Delegate<A, R> {
    fn into_callbacks(self) -> Leaves<A, R> {
        self.store.load().iter().cloned().collect()
    }
}

impl<A: 'static, R: 'static> IntoCallbacks<A, R> for Delegate<A, R> {
    fn into_callbacks(self) -> Leaves<A, R> {
        (&self).into_callbacks()
    }
}

impl<A: 'static, R: 'static> Add for &Delegate<A, R> {
    type Output = Delegate<A, R>;

    fn add(self, rhs: Self) -> Self::Output {
        Delegate::from_entries(algebra::append(&self.invocation_list(), &rhs.invocation_list()))
    }
}

impl<A: 'static, R: 'static> Sub for &Delegate<A, R> {
    type Output = Delegate<A, R>;

    fn sub(self, rhs: Self) -> Self::Output {
        let list = self.invocation_list();
        match algebra::remove_last(&list, &rhs.invocation_list()) {
            Some(remaining) => Delegate::from_entries(remaining),
            None => Delegate::from_list(list),
        }
    }
}
