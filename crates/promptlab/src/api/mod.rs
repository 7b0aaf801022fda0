//! API interaction layer: retry and usage accounting.
//!
//! These modules sit between the experiment code and the chat endpoint:
//!
//! - [`retry`] — transient error detection (429, 5xx, network timeouts) with
//!   configurable exponential backoff and jitter. Never retries 400/401 errors.
//! - [`usage`] — cumulative token tally across the calls of one run, with a
//!   one-line summary for the console and reports.

pub mod retry;
pub mod usage;

pub use retry::RetryConfig;
pub use usage::UsageTally;
