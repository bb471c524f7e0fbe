// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod blog;
pub mod config;
pub mod decision;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod predictions;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::api::{ApiClient, AuthToken};
pub use crate::config::ClientConfig;
pub use crate::decision::{fuse, fuse_labels, DecisionOutput, ModelDecision, Severity};
pub use crate::error::FetchError;
pub use crate::fetch::{FetchController, FetchState, FetchView, Liveness, RetryPolicy};
pub use crate::sentiment::Sentiment;
