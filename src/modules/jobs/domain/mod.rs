pub mod entities;
pub mod repository;

pub use entities::{
    BatchResult, BulkJob, ErrorDigest, ItemTransportError, ItemValidationError, JobStatus,
    MAX_DIGEST_ENTRIES,
};
pub use repository::{JobStatistics, JobStore};
