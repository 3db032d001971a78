// crates/resilience/src/lib.rs
//! Resilience patterns for remote calls
//!
//! This module provides:
//! - Retry with exponential backoff
//! - Timeout handling
//!
//! # Example
//!
//! ```rust
//! use shelfcast_resilience::{retry_if, with_timeout, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(100));
//!
//! let result = with_timeout(
//!     Duration::from_secs(5),
//!     retry_if(&policy, |e: &String| !e.contains("404"), || async { Ok::<_, String>(1) }),
//! )
//! .await;
//! assert!(matches!(result, Ok(Ok(1))));
//! # }
//! ```

mod error;
mod retry;
mod timeout;

pub use error::{ResilienceError, ResilienceResult};
pub use retry::{retry_if, with_retry, RetryPolicy};
pub use timeout::{with_timeout, Timeout};
