//! Dispatch Configuration
//!
//! Async invocation helpers run the whole multicast batch on a blocking
//! worker. When the caller is already inside a tokio runtime that runtime is
//! used; otherwise a process-wide fallback runtime is built lazily from a
//! [`DispatchConfig`].
//!
//! The configuration can be built in code or parsed from JSON:
//!
//! ```rust,ignore
//! let config = DispatchConfig::from_json(r#"{ "worker_threads": 4 }"#)?;
//! relay_core::dispatch::configure(config)?;
//! ```

use serde::Deserialize;

use crate::error::{DelegateError, Result};

/// Settings for the fallback worker runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Number of async worker threads.
    pub worker_threads: usize,

    /// Upper bound on threads used for blocking invocation batches.
    pub max_blocking_threads: usize,

    /// Name given to every runtime thread.
    pub thread_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            max_blocking_threads: 64,
            thread_name: "relay-dispatch".to_string(),
        }
    }
}

impl DispatchConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DelegateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings tokio would refuse at build time.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(DelegateError::Config("worker_threads must be at least 1".into()));
        }
        if self.max_blocking_threads == 0 {
            return Err(DelegateError::Config(
                "max_blocking_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
