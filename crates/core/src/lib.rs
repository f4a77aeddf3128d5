//! Shared infrastructure for the coastwalk workspace
//!
//! - **Error handling**: structured errors with codes, context and recovery suggestions
//! - **Caching**: a two-tier TTL cache with an injectable clock
//! - **Configuration**: `coastwalk.toml` loading with defaults and validation
//! - **Retry**: backoff policy and circuit breaker for remote calls
//!
//! # Example
//!
//! ```rust,no_run
//! use coastwalk_core::config::Config;
//!
//! let config = Config::load(None).expect("valid configuration");
//! println!("bucket: {}", config.schema.store.bucket);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod error;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{
        CacheConfig, CacheHit, CacheTier, Clock, FileSessionStore, ManualClock,
        MemorySessionStore, SessionStore, SystemClock, TieredCache,
    };
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
}
