//! Thin façade between the HTTP layer and the processor.
//!
//! Translates request-level calls into processor calls and applies the
//! bulk-creation throttle; it owns no state of its own.
use crate::modules::jobs::domain::entities::BulkJob;
use crate::modules::jobs::processor::{BulkJobProcessor, JobStatusView};
use crate::modules::throttle::FixedWindowThrottle;
use crate::shared::errors::AppResult;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: usize = 20;

pub struct JobHandle {
    processor: Arc<BulkJobProcessor>,
    creation_throttle: Arc<FixedWindowThrottle>,
}

impl JobHandle {
    pub fn new(
        processor: Arc<BulkJobProcessor>,
        creation_throttle: Arc<FixedWindowThrottle>,
    ) -> Self {
        Self {
            processor,
            creation_throttle,
        }
    }

    /// Create a job and schedule its processing. Subject to the bulk-creation
    /// counter space, keyed by tenant.
    pub async fn create_job(
        &self,
        tenant: &str,
        item_ids: Vec<String>,
        target_value: &str,
    ) -> AppResult<BulkJob> {
        self.creation_throttle.check(tenant)?;
        self.processor.create_job(tenant, item_ids, target_value).await
    }

    pub async fn job_status(&self, job_id: Uuid) -> AppResult<JobStatusView> {
        self.processor.job_status(job_id).await
    }

    pub async fn retry_job(&self, job_id: Uuid) -> AppResult<BulkJob> {
        self.processor.retry_job(job_id).await
    }

    pub async fn cancel_job(&self, job_id: Uuid) -> AppResult<BulkJob> {
        self.processor.cancel_job(job_id).await
    }

    pub async fn list_recent_jobs(
        &self,
        tenant: Option<&str>,
        limit: Option<usize>,
    ) -> AppResult<Vec<BulkJob>> {
        self.processor
            .list_recent(tenant, limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await
    }
}
