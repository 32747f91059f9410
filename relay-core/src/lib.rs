//! Relay Core
//!
//! This crate provides strict-variance multicast delegates: ordered,
//! thread-safe lists of callbacks that are invoked together. It implements:
//!
//! - A lock-free, copy-on-write invocation list
//! - Combine/remove algebra mirroring multicast delegate semantics
//! - Flattening of delegates converted back into plain callbacks
//! - Async dispatch helpers with cooperative cancellation
//!
//! Every delegate has one fixed shape, an argument tuple and a return type.
//! Shapes are checked by the compiler, so callbacks of incompatible shapes
//! can never be combined. Converting between shapes is explicit, through
//! [`Delegate::adapt`].
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `delegate`: callbacks, invocation lists, and the delegate container
//! - `dispatch`: async and begin/end invocation on a worker pool
//! - `config`: settings for the fallback worker runtime
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use relay_core::{Callback, Delegate};
//!
//! let on_save = Delegate::<(String,)>::from_fn(|path: String| {
//!     println!("saved {path}");
//! });
//!
//! let audit = Callback::<(String,)>::new(|path: String| println!("audit {path}"));
//! on_save.add(&audit);
//! on_save.invoke(("notes.txt".to_string(),));
//!
//! on_save.remove(&audit);
//! assert_eq!(on_save.len(), 1);
//! ```

pub mod config;
pub mod delegate;
pub mod dispatch;
pub mod error;

pub use config::DispatchConfig;
pub use delegate::{Callback, CallbackId, Delegate, InvocationList};
pub use dispatch::{AsyncResult, PendingInvoke};
pub use error::{DelegateError, Result};
pub use tokio_util::sync::CancellationToken;
