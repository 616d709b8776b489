// src/error.rs
// Error taxonomy for the publishing pipeline.
//
// Two tiers: `BatchAbort` ends a batch before item processing starts;
// `ItemError` is captured into that item's outcome and never interrupts
// iteration over the rest of the batch.

use thiserror::Error;

/// Batch-level failure. No `BatchResult` is produced when one of these fires.
#[derive(Debug, Error)]
pub enum BatchAbort {
    /// Required configuration is absent. Raised before any network call.
    #[error("{0}")]
    MissingConfig(String),

    /// The source search API was unreachable or returned non-success.
    #[error("Failed to fetch or publish news: {0}")]
    Fetch(String),
}

/// Item-level failure. Recorded as text on the item's outcome.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("{0}")]
    ImageAcquisition(String),

    #[error("{0}")]
    ImageUpload(String),

    #[error("{0}")]
    RecordPublish(String),

    /// Catch-all so an unexpected error in one item cannot take the batch
    /// down with it.
    #[error("{0}")]
    Other(String),
}
