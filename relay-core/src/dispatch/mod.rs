//! Async Dispatch
//!
//! Helpers that hand a whole multicast invocation to a worker and return
//! immediately:
//!
//! - [`Delegate::invoke_async`](crate::Delegate::invoke_async) returns a
//!   [`PendingInvoke`] future, which can also be waited on synchronously.
//! - [`Delegate::begin_invoke`](crate::Delegate::begin_invoke) and
//!   [`Delegate::end_invoke`](crate::Delegate::end_invoke) run the same
//!   batch in the begin/end pattern, with a completion callback and caller
//!   state carried in an [`AsyncResult`].
//!
//! The batch runs on a blocking worker: callbacks are ordinary synchronous
//! functions and must not stall the async workers. Cancellation is checked
//! once, right before the batch starts. A callback panic is caught on the
//! worker and surfaced as [`DelegateError::CallbackPanicked`].
//!
//! # Runtime selection
//!
//! Inside a tokio runtime the current runtime is used. Elsewhere a
//! process-wide fallback runtime is built on first use from the
//! [`DispatchConfig`] installed with [`configure`], or the default one.

mod async_result;
mod pending;

use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

pub use async_result::AsyncResult;
pub use pending::PendingInvoke;

use crate::config::DispatchConfig;
use crate::error::{DelegateError, Result};

static CONFIG: OnceLock<DispatchConfig> = OnceLock::new();
static FALLBACK: OnceLock<Runtime> = OnceLock::new();

/// Install the configuration used to build the fallback runtime.
///
/// Must be called before the first async invocation made outside a tokio
/// runtime, and at most once.
pub fn configure(config: DispatchConfig) -> Result<()> {
    config.validate()?;
    if FALLBACK.get().is_some() {
        return Err(DelegateError::Config(
            "fallback runtime already started".into(),
        ));
    }
    CONFIG
        .set(config)
        .map_err(|_| DelegateError::Config("dispatch already configured".into()))
}

/// The configuration in effect for the fallback runtime.
pub fn config() -> &'static DispatchConfig {
    CONFIG.get_or_init(DispatchConfig::default)
}

pub(crate) fn runtime_handle() -> Handle {
    if let Ok(handle) = Handle::try_current() {
        return handle;
    }

    let runtime = FALLBACK.get_or_init(|| {
        let config = config();
        tracing::debug!(
            worker_threads = config.worker_threads,
            max_blocking_threads = config.max_blocking_threads,
            thread_name = %config.thread_name,
            "dispatch.runtime.start"
        );
        Builder::new_multi_thread()
            .enable_all()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name(config.thread_name.clone())
            .build()
            .expect("failed to build relay dispatch runtime")
    });
    runtime.handle().clone()
}
