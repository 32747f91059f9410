//! Multicast Delegates
//!
//! This module implements the invocation list container and its algebra.
//!
//! # Concepts
//!
//! ## Callbacks
//!
//! A [`Callback`] is a single callable with an identity: a closure, a
//! function pointer, or a method bound to a receiver. Two callbacks are equal
//! when their identities are, which is what removal matches against.
//!
//! ## Delegates
//!
//! A [`Delegate`] owns an ordered list of callbacks. It is generic over an
//! argument tuple and a return type, so `Delegate<(i32, String), bool>` holds
//! callbacks shaped like `Fn(i32, String) -> bool`. Callables of arity 0
//! through 16 are accepted.
//!
//! ## Invocation lists
//!
//! An [`InvocationList`] is an immutable snapshot of a delegate's callbacks.
//! Mutation publishes a new list atomically; existing snapshots are never
//! touched.
//!
//! # Implementation Notes
//!
//! Lists are kept flat. A delegate converted into a callback becomes a
//! dispatch entry, and admitting a dispatch entry into a delegate copies the
//! source delegate's leaves instead of nesting the entry.

pub mod algebra;
mod callback;
mod handler;
mod multicast;
mod store;

pub use callback::{Callback, CallbackId, IntoCallbacks, Leaves};
pub use handler::{FnPointer, Handler, Method};
pub use multicast::Delegate;
pub use store::InvocationList;
