//! Bulk job module.
//!
//! Owns the job lifecycle: creation, asynchronous batch processing through
//! the platform gateway, retry, cooperative cancellation, status queries.
//!
//! Architecture:
//! - Domain: entities and the storage trait
//! - Infrastructure: in-process store implementation
//! - Processor: the batch/state machine plus the concurrency guard
//! - Handle: the façade consumed by the HTTP layer
pub mod domain;
pub mod handle;
pub mod infrastructure;
pub mod processor;

// Re-exports for easy access
pub use domain::{
    entities::{BatchResult, BulkJob, ErrorDigest, JobStatus},
    repository::{JobStatistics, JobStore},
};
pub use handle::JobHandle;
pub use infrastructure::InMemoryJobStore;
pub use processor::{BulkJobProcessor, JobStatusView};
