//! Storage trait for job persistence.
//!
//! The core treats storage as an external collaborator; the only guarantee it
//! relies on is read-your-writes within the single processing instance.
//! Concurrency control lives in the processor's guard set, not here.
use crate::modules::jobs::domain::entities::BulkJob;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a newly created job record.
    async fn create(&self, job: BulkJob) -> AppResult<BulkJob>;

    /// Fetch a job by id, None if unknown.
    async fn get(&self, id: Uuid) -> AppResult<Option<BulkJob>>;

    /// Write back the full record (progress, digest, status transitions).
    async fn update(&self, job: &BulkJob) -> AppResult<()>;

    /// Most recent jobs first, optionally filtered by tenant.
    async fn list_recent(&self, tenant: Option<&str>, limit: usize) -> AppResult<Vec<BulkJob>>;

    /// Counts by status, for dashboards.
    async fn statistics(&self) -> AppResult<JobStatistics>;
}

/// Job counts by status
#[derive(Debug, Clone, Default)]
pub struct JobStatistics {
    pub pending_count: u64,
    pub running_count: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub total_count: u64,
}
