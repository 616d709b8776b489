// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gnews;
pub mod images;
pub mod metrics;
pub mod pipeline;
pub mod strapi;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::PublisherConfig;
pub use crate::error::{BatchAbort, ItemError};
pub use crate::pipeline::{BatchRequest, BatchResult, ItemOutcome, OutcomeStatus, Publisher};
