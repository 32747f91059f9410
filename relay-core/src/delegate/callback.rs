//! Callback Identity & Unwrapping
//!
//! A [`Callback`] is the plain, single-target representation of a callable:
//! what gets stored in an invocation list. Its identity follows the
//! "target + method" rule of multicast delegates:
//!
//! - a method bound to a receiver is identified by the receiver's address and
//!   the method's code address, so binding the same method to the same
//!   receiver twice yields equal callbacks;
//! - a function pointer is identified by its code address;
//! - a closure is identified by its allocation, so clones compare equal but
//!   two separately constructed closures do not.
//!
//! # Dispatch entries
//!
//! Converting a [`Delegate`](super::Delegate) into a `Callback` produces a
//! *dispatch entry*: a callback whose target is the delegate's own store and
//! whose body runs the delegate's current list. Dispatch entries carry a
//! reserved marker. When one is admitted into a delegate it is unwrapped into
//! the source delegate's current leaves, so invocation lists only ever hold
//! leaf callbacks and never nest.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use super::handler::{FnPointer, Handler, Method};
use super::store::{InvocationList, InvocationStore};

/// Buffer used while flattening callbacks on admission.
pub type Leaves<A, R> = SmallVec<[Callback<A, R>; 1]>;

/// Identity used for equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackId {
    /// A closure, by allocation address.
    Closure(usize),
    /// A plain function pointer, by code address.
    Function(usize),
    /// A method bound to a receiver.
    Method {
        /// Receiver address.
        target: usize,
        /// Method code address.
        method: usize,
    },
    /// A delegate's dispatch entry, by store address.
    Dispatch(usize),
}

type Expand<A, R> = Arc<dyn Fn() -> Leaves<A, R> + Send + Sync>;

enum Target<A, R> {
    None,
    Receiver(Arc<dyn Any + Send + Sync>),
    Delegate(Arc<InvocationStore<A, R>>),
    /// An adapted dispatch entry; expands to the source's adapted leaves.
    Adapted(Expand<A, R>),
}

impl<A, R> Clone for Target<A, R> {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Receiver(receiver) => Self::Receiver(Arc::clone(receiver)),
            Self::Delegate(store) => Self::Delegate(Arc::clone(store)),
            Self::Adapted(expand) => Self::Adapted(Arc::clone(expand)),
        }
    }
}

/// A single callable with a stable identity.
pub struct Callback<A, R = ()> {
    handler: Arc<dyn Handler<A, R>>,
    target: Target<A, R>,
    id: CallbackId,
}

fn address<T: ?Sized>(ptr: *const T) -> usize {
    ptr.cast::<()>() as usize
}

impl<A: 'static, R: 'static> Callback<A, R> {
    /// Wrap a closure. Identity is the new allocation.
    pub fn new<H: Handler<A, R>>(handler: H) -> Self {
        let handler: Arc<dyn Handler<A, R>> = Arc::new(handler);
        let id = CallbackId::Closure(address(Arc::as_ptr(&handler)));
        Self { handler, target: Target::None, id }
    }

    /// Wrap a function pointer. Callbacks built from the same function
    /// compare equal.
    pub fn function<P: FnPointer<A, R>>(function: P) -> Self {
        let id = CallbackId::Function(function.address());
        Self { handler: Arc::new(function), target: Target::None, id }
    }

    /// Bind `method` to `receiver`. Callbacks built from the same receiver
    /// allocation and method compare equal.
    pub fn method<Recv, M>(receiver: Arc<Recv>, method: M) -> Self
    where
        Recv: Send + Sync + 'static,
        M: Method<Recv, A, R>,
    {
        let id = CallbackId::Method {
            target: address(Arc::as_ptr(&receiver)),
            method: method.address(),
        };
        let target: Arc<dyn Any + Send + Sync> = receiver.clone();
        Self {
            handler: Arc::new(Bound { receiver, method }),
            target: Target::Receiver(target),
            id,
        }
    }

    /// Wrap this callback into one of a different shape.
    ///
    /// `args` converts incoming arguments into the ones this callback takes;
    /// `ret` converts its result into the caller's return type. The adapted
    /// callback has a fresh closure identity.
    ///
    /// Adapting a dispatch entry yields another dispatch entry: admitting it
    /// unwraps into the source delegate's current leaves, each adapted.
    pub fn adapt<B, S, FA, FR>(self, args: FA, ret: FR) -> Callback<B, S>
    where
        B: 'static,
        S: 'static,
        FA: Fn(B) -> A + Send + Sync + 'static,
        FR: Fn(R) -> S + Send + Sync + 'static,
    {
        self.adapt_with(Arc::new((args, ret)))
    }

    pub(crate) fn adapt_with<B, S, FA, FR>(self, map: Arc<(FA, FR)>) -> Callback<B, S>
    where
        B: 'static,
        S: 'static,
        FA: Fn(B) -> A + Send + Sync + 'static,
        FR: Fn(R) -> S + Send + Sync + 'static,
    {
        if !self.is_dispatch() {
            return Callback::new(Adapted { inner: self, map });
        }

        let source = self.clone();
        let leaf_map = Arc::clone(&map);
        let expand: Expand<B, S> = Arc::new(move || {
            source
                .clone()
                .flatten()
                .into_iter()
                .map(|leaf| leaf.adapt_with(Arc::clone(&leaf_map)))
                .collect()
        });

        let mut entry: Callback<B, S> = Callback::new(Adapted { inner: self, map });
        entry.target = Target::Adapted(expand);
        entry
    }

    pub(crate) fn dispatch(store: Arc<InvocationStore<A, R>>) -> Self
    where
        A: Clone,
        R: Default,
    {
        let id = CallbackId::Dispatch(address(Arc::as_ptr(&store)));
        Self {
            handler: Arc::new(DispatchEntry { store: Arc::clone(&store) }),
            target: Target::Delegate(store),
            id,
        }
    }

    /// Expand into leaf callbacks.
    ///
    /// A dispatch entry yields its delegate's current list; anything else
    /// yields itself.
    pub fn flatten(self) -> Leaves<A, R> {
        match &self.target {
            Target::Delegate(store) => store.load().iter().cloned().collect(),
            Target::Adapted(expand) => expand(),
            _ => smallvec![self],
        }
    }
}

impl<A: 'static, R: 'static> Callback<A, R> {
    /// Invoke the callback.
    pub fn call(&self, args: A) -> R {
        Handler::call(&*self.handler, args)
    }

    /// Identity used for equality and hashing.
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Receiver of a bound method.
    pub fn target(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        match &self.target {
            Target::Receiver(receiver) => Some(receiver),
            _ => None,
        }
    }

    /// Code address of a function pointer or bound method.
    pub fn method_address(&self) -> Option<usize> {
        match self.id {
            CallbackId::Function(method) | CallbackId::Method { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Whether this is a delegate's dispatch entry rather than a leaf.
    pub fn is_dispatch(&self) -> bool {
        matches!(self.target, Target::Delegate(_) | Target::Adapted(_))
    }
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            target: self.target.clone(),
            id: self.id,
        }
    }
}

impl<A, R> PartialEq for Callback<A, R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<A, R> Eq for Callback<A, R> {}

impl<A, R> Hash for Callback<A, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<A, R> fmt::Debug for Callback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.id).finish()
    }
}

struct Bound<Recv, M> {
    receiver: Arc<Recv>,
    method: M,
}

impl<Recv, M, A, R> Handler<A, R> for Bound<Recv, M>
where
    Recv: Send + Sync + 'static,
    M: Method<Recv, A, R>,
{
    fn call(&self, args: A) -> R {
        self.method.call(&self.receiver, args)
    }
}

struct Adapted<A, R, FA, FR> {
    inner: Callback<A, R>,
    map: Arc<(FA, FR)>,
}

impl<A, R, B, S, FA, FR> Handler<B, S> for Adapted<A, R, FA, FR>
where
    A: 'static,
    R: 'static,
    FA: Fn(B) -> A + Send + Sync + 'static,
    FR: Fn(R) -> S + Send + Sync + 'static,
{
    fn call(&self, args: B) -> S {
        let (map_args, map_ret) = &*self.map;
        map_ret(self.inner.call(map_args(args)))
    }
}

struct DispatchEntry<A, R> {
    store: Arc<InvocationStore<A, R>>,
}

impl<A, R> Handler<A, R> for DispatchEntry<A, R>
where
    A: Clone + 'static,
    R: Default + 'static,
{
    fn call(&self, args: A) -> R {
        self.store.load().invoke_last(args).unwrap_or_default()
    }
}

/// Anything that can be admitted into a delegate's list.
///
/// Absent values (`None`) and empty sequences admit nothing, which makes
/// `add`/`remove` with them a silent no-op.
pub trait IntoCallbacks<A, R> {
    /// Flatten into leaf callbacks, unwrapping dispatch entries.
    fn into_callbacks(self) -> Leaves<A, R>;
}

impl<A: 'static, R: 'static> IntoCallbacks<A, R> for Callback<A, R> {
    fn into_callbacks(self) -> Leaves<A, R> {
        self.flatten()
    }
}

impl<A: 'static, R: 'static> IntoCallbacks<A, R> for &Callback<A, R> {
    fn into_callbacks(self) -> Leaves<A, R> {
        self.clone().flatten()
    }
}

impl<A, R, T: IntoCallbacks<A, R>> IntoCallbacks<A, R> for Option<T> {
    fn into_callbacks(self) -> Leaves<A, R> {
        match self {
            Some(value) => value.into_callbacks(),
            None => Leaves::new(),
        }
    }
}

impl<A: 'static, R: 'static> IntoCallbacks<A, R> for &InvocationList<A, R> {
    fn into_callbacks(self) -> Leaves<A, R> {
        self.iter().cloned().flat_map(Callback::flatten).collect()
    }
}

impl<A: 'static, R: 'static> IntoCallbacks<A, R> for InvocationList<A, R> {
    fn into_callbacks(self) -> Leaves<A, R> {
        (&self).into_callbacks()
    }
}

impl<A: 'static, R: 'static> IntoCallbacks<A, R> for Vec<Callback<A, R>> {
    fn into_callbacks(self) -> Leaves<A, R> {
        self.into_iter().flat_map(Callback::flatten).collect()
    }
}
