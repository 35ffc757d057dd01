//! In-process implementation of JobStore.
//!
//! The pipeline is designed for a single processing instance, so a
//! DashMap-backed store is a complete implementation, not a test double.
//! Swapping in a database-backed store only requires implementing the trait.
use crate::modules::jobs::domain::entities::{BulkJob, JobStatus};
use crate::modules::jobs::domain::repository::{JobStatistics, JobStore};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, BulkJob>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: BulkJob) -> AppResult<BulkJob> {
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<BulkJob>> {
        Ok(self.jobs.get(&id).map(|entry| entry.clone()))
    }

    async fn update(&self, job: &BulkJob) -> AppResult<()> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn list_recent(&self, tenant: Option<&str>, limit: usize) -> AppResult<Vec<BulkJob>> {
        let mut jobs: Vec<BulkJob> = self
            .jobs
            .iter()
            .filter(|entry| tenant.map_or(true, |t| entry.tenant == t))
            .map(|entry| entry.clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn statistics(&self) -> AppResult<JobStatistics> {
        let mut stats = JobStatistics::default();
        for entry in self.jobs.iter() {
            match entry.status {
                JobStatus::Pending => stats.pending_count += 1,
                JobStatus::Running => stats.running_count += 1,
                JobStatus::Success => stats.success_count += 1,
                JobStatus::Failed => stats.failed_count += 1,
            }
            stats.total_count += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trip() {
        let store = InMemoryJobStore::new();
        let job = BulkJob::new("shop-a", vec!["v1".into()], "9.99");
        let id = job.id;

        store.create(job).await.unwrap();
        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.tenant, "shop-a");
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let store = InMemoryJobStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_recent_filters_by_tenant_and_orders_newest_first() {
        let store = InMemoryJobStore::new();

        let mut older = BulkJob::new("shop-a", vec!["v1".into()], "1.00");
        older.created_at = older.created_at - chrono::Duration::seconds(60);
        let newer = BulkJob::new("shop-a", vec!["v2".into()], "2.00");
        let other = BulkJob::new("shop-b", vec!["v3".into()], "3.00");

        let newer_id = newer.id;
        store.create(older).await.unwrap();
        store.create(newer).await.unwrap();
        store.create(other).await.unwrap();

        let listed = store.list_recent(Some("shop-a"), 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer_id);

        let limited = store.list_recent(None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn statistics_count_by_status() {
        let store = InMemoryJobStore::new();

        let pending = BulkJob::new("s", vec!["a".into()], "1");
        let mut failed = BulkJob::new("s", vec!["b".into()], "1");
        failed.status = JobStatus::Failed;

        store.create(pending).await.unwrap();
        store.create(failed).await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.total_count, 2);
    }
}
