//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures, checksum
//! mismatches) and linear backoff decisions shared by the download manager.
//! Descriptor fetches are single-attempt and never go through this module.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status, Classify};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
