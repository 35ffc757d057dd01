//! Bulk job processor: lifecycle, concurrency guard, batching, aggregation.
//!
//! One processing routine per job id at a time, enforced by an in-memory
//! guard set. Processing is cooperative: cancellation never interrupts an
//! in-flight call, it only stops the next batch from starting. The persisted
//! status is the authoritative stop signal, the guard entry the secondary one.
//!
//! Single-instance design: running two processes against the same store would
//! allow duplicate concurrent processing of one job. That is a documented
//! liveness caveat of this deployment model, not a hidden assumption.
use crate::modules::jobs::domain::entities::{BatchResult, BulkJob, JobStatus};
use crate::modules::jobs::domain::repository::JobStore;
use crate::modules::platform::credentials::CredentialProvider;
use crate::modules::platform::traits::GatewayFactory;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::events::{CoreEvent, EventSink};
use crate::{log_debug, log_info};
use chrono::Utc;
use dashmap::DashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Snapshot returned by status queries.
#[derive(Debug, Clone)]
pub struct JobStatusView {
    pub job: BulkJob,
    pub percent_complete: u32,
    pub in_flight: bool,
}

#[derive(Clone)]
pub struct BulkJobProcessor {
    store: Arc<dyn JobStore>,
    credentials: Arc<dyn CredentialProvider>,
    gateways: Arc<dyn GatewayFactory>,
    events: Arc<dyn EventSink>,
    batch_size: usize,
    /// Guard set: job ids with an active processing routine.
    in_flight: Arc<DashSet<Uuid>>,
}

/// Scoped guard entry; released on every exit path, including panics.
struct InFlightGuard {
    set: Arc<DashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

impl BulkJobProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        credentials: Arc<dyn CredentialProvider>,
        gateways: Arc<dyn GatewayFactory>,
        events: Arc<dyn EventSink>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            credentials,
            gateways,
            events,
            batch_size: batch_size.max(1),
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Persist a pending job and schedule its processing. Returns the record
    /// immediately; the caller never waits on (or learns about) the outcome
    /// of the spawned task.
    pub async fn create_job(
        &self,
        tenant: &str,
        item_ids: Vec<String>,
        target_value: &str,
    ) -> AppResult<BulkJob> {
        if item_ids.is_empty() {
            return Err(AppError::ValidationError(
                "A bulk job requires at least one item".to_string(),
            ));
        }

        let job = self
            .store
            .create(BulkJob::new(tenant, item_ids, target_value))
            .await?;

        self.events.emit(CoreEvent::JobCreated {
            job_id: job.id,
            tenant: job.tenant.clone(),
            total_count: job.total_count,
        });

        self.schedule(job.id);
        Ok(job)
    }

    /// Fire-and-forget scheduling; task failures land in the event sink.
    fn schedule(&self, id: Uuid) {
        let processor = self.clone();
        tokio::spawn(async move {
            processor.process_job(id).await;
        });
    }

    /// Run the processing routine for `id`. A no-op if the guard set already
    /// holds the id, which absorbs racing retries and double schedules.
    pub async fn process_job(&self, id: Uuid) {
        if !self.in_flight.insert(id) {
            log_debug!("Job {} already in flight, ignoring duplicate schedule", id);
            return;
        }
        let _guard = InFlightGuard {
            set: Arc::clone(&self.in_flight),
            id,
        };

        if let Err(e) = self.run(id).await {
            self.events.emit(CoreEvent::TaskFailure {
                job_id: id,
                message: e.to_string(),
            });
            // Leave nothing stuck in Running after an unexpected error.
            let _ = self
                .force_fail(id, &format!("Unexpected processing error: {}", e))
                .await;
        }
    }

    async fn run(&self, id: Uuid) -> AppResult<()> {
        let mut job = self.require(id).await?;

        // A cancel that landed between scheduling and now is authoritative.
        if job.status != JobStatus::Pending {
            log_debug!(
                "Job {} is {} at pickup, nothing to process",
                id,
                job.status
            );
            return Ok(());
        }

        job.status = JobStatus::Running;
        job.touch();
        self.store.update(&job).await?;
        self.events.emit(CoreEvent::JobStarted { job_id: id });

        let credentials = match self.credentials.credentials_for(&job.tenant).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                // Fatal to the job, not per-item: no batch runs.
                return self
                    .finish(
                        id,
                        1,
                        Some(format!("No credentials stored for tenant {}", job.tenant)),
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .finish(id, 1, Some(format!("Credential lookup failed: {}", e)))
                    .await;
            }
        };

        let gateway = self.gateways.gateway_for(credentials);

        let mut failure_count: u32 = 0;
        let item_ids = job.item_ids.clone();
        let target_value = job.target_value.clone();
        for chunk in item_ids.chunks(self.batch_size) {
            // Loop boundary check: the persisted status and the guard entry
            // are both consulted before each batch starts.
            let current = self.require(id).await?;
            if current.status != JobStatus::Running || !self.in_flight.contains(&id) {
                log_info!("Job {} stopped before next batch (status {})", id, current.status);
                return Ok(());
            }

            let batch = match gateway.bulk_update(chunk, &target_value).await {
                Ok(batch) => batch,
                // The whole batch is lost; every item in it counts as failed.
                Err(e) => BatchResult::full_failure(chunk, &e.to_string()),
            };

            // Re-read before persisting: a cancel that landed while the batch
            // was in flight owns the record now and must not be clobbered.
            let mut latest = self.require(id).await?;
            if latest.status != JobStatus::Running {
                log_info!(
                    "Job {} was stopped mid-batch (status {}), dropping batch bookkeeping",
                    id,
                    latest.status
                );
                return Ok(());
            }

            failure_count += batch.failure_count;
            for err in &batch.transport_errors {
                latest
                    .error_digest
                    .push(format!("{}: {}", err.item_id, err.message));
            }
            for err in &batch.validation_errors {
                let field = err.field.as_deref().unwrap_or("input");
                latest
                    .error_digest
                    .push(format!("{}: {} ({})", err.item_id, err.message, field));
            }

            latest.processed_count += chunk.len() as u32;
            latest.touch();
            self.store.update(&latest).await?;

            self.events.emit(CoreEvent::BatchCompleted {
                job_id: id,
                processed_count: latest.processed_count,
                total_count: latest.total_count,
                batch_failures: batch.failure_count,
            });
        }

        self.finish(id, failure_count, None).await
    }

    /// Terminal-state write: Success iff zero failures across all batches.
    /// Works on a fresh read so a concurrent cancel is never overwritten.
    async fn finish(
        &self,
        id: Uuid,
        failure_count: u32,
        fatal_message: Option<String>,
    ) -> AppResult<()> {
        let mut job = self.require(id).await?;
        if job.status.is_terminal() {
            return Ok(());
        }
        if let Some(message) = fatal_message {
            job.error_digest.push(message);
        }
        job.status = if failure_count == 0 {
            JobStatus::Success
        } else {
            JobStatus::Failed
        };
        job.completed_at = Some(Utc::now());
        job.touch();
        self.store.update(&job).await?;

        self.events.emit(CoreEvent::JobCompleted {
            job_id: job.id,
            success: failure_count == 0,
            failure_count,
        });
        Ok(())
    }

    async fn force_fail(&self, id: Uuid, message: &str) -> AppResult<()> {
        let mut job = self.require(id).await?;
        if job.status.is_terminal() {
            return Ok(());
        }
        job.status = JobStatus::Failed;
        job.error_digest.push(message.to_string());
        job.completed_at = Some(Utc::now());
        job.touch();
        self.store.update(&job).await
    }

    /// Reset a terminal job to pending and schedule it again. The item list
    /// and total count stay untouched.
    pub async fn retry_job(&self, id: Uuid) -> AppResult<BulkJob> {
        let mut job = self.require(id).await?;

        if !job.status.is_terminal() {
            return Err(AppError::ConflictError(format!(
                "Cannot retry job {} while it is {}",
                id, job.status
            )));
        }
        if self.in_flight.contains(&id) {
            // A cancelled routine that has not hit its next loop boundary yet.
            return Err(AppError::ConflictError(format!(
                "Job {} still has an active processing routine",
                id
            )));
        }

        job.status = JobStatus::Pending;
        job.processed_count = 0;
        job.error_digest = Default::default();
        job.completed_at = None;
        job.touch();
        self.store.update(&job).await?;

        self.events.emit(CoreEvent::JobRetried { job_id: id });
        self.schedule(id);
        Ok(job)
    }

    /// Cooperative cancellation: drops the guard entry and writes the
    /// terminal state. An in-flight batch finishes; the next one never starts.
    pub async fn cancel_job(&self, id: Uuid) -> AppResult<BulkJob> {
        let mut job = self.require(id).await?;

        if job.status.is_terminal() {
            return Err(AppError::ConflictError(format!(
                "Cannot cancel job {} in terminal state {}",
                id, job.status
            )));
        }

        self.in_flight.remove(&id);
        job.status = JobStatus::Failed;
        job.error_digest
            .push("Job cancelled before completion".to_string());
        job.completed_at = Some(Utc::now());
        job.touch();
        self.store.update(&job).await?;

        self.events.emit(CoreEvent::JobCancelled { job_id: id });
        Ok(job)
    }

    pub async fn job_status(&self, id: Uuid) -> AppResult<JobStatusView> {
        let job = self.require(id).await?;
        let percent_complete = job.percent_complete();
        let in_flight = self.in_flight.contains(&id);
        Ok(JobStatusView {
            job,
            percent_complete,
            in_flight,
        })
    }

    pub async fn list_recent(
        &self,
        tenant: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<BulkJob>> {
        self.store.list_recent(tenant, limit).await
    }

    async fn require(&self, id: Uuid) -> AppResult<BulkJob> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unknown job {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::infrastructure::InMemoryJobStore;
    use crate::modules::platform::credentials::TenantCredentials;
    use crate::modules::platform::traits::PlatformGateway;
    use crate::shared::events::LogEventSink;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Credentials {}

        #[async_trait]
        impl CredentialProvider for Credentials {
            async fn credentials_for(&self, tenant: &str) -> AppResult<Option<TenantCredentials>>;
        }
    }

    struct AllSuccessGateway;

    #[async_trait]
    impl PlatformGateway for AllSuccessGateway {
        async fn bulk_update(&self, item_ids: &[String], _value: &str) -> AppResult<BatchResult> {
            let mut result = BatchResult::default();
            for _ in item_ids {
                result.record_success();
            }
            Ok(result)
        }
    }

    struct StaticFactory;

    impl GatewayFactory for StaticFactory {
        fn gateway_for(&self, _credentials: TenantCredentials) -> Arc<dyn PlatformGateway> {
            Arc::new(AllSuccessGateway)
        }
    }

    fn processor(credentials: MockCredentials) -> Arc<BulkJobProcessor> {
        Arc::new(BulkJobProcessor::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(credentials),
            Arc::new(StaticFactory),
            Arc::new(LogEventSink),
            10,
        ))
    }

    async fn wait_terminal(processor: &BulkJobProcessor, id: Uuid) -> BulkJob {
        for _ in 0..100 {
            let view = processor.job_status(id).await.unwrap();
            if view.job.status.is_terminal() && !view.in_flight {
                return view.job;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", id);
    }

    fn with_credentials() -> MockCredentials {
        let mut mock = MockCredentials::new();
        mock.expect_credentials_for().returning(|tenant| {
            Ok(Some(TenantCredentials {
                shop_domain: format!("{}.myshopify.com", tenant),
                access_token: "token".to_string(),
            }))
        });
        mock
    }

    #[tokio::test]
    async fn create_job_rejects_empty_item_list() {
        let processor = processor(with_credentials());
        let result = processor.create_job("shop-a", vec![], "9.99").await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_job_without_batches() {
        let mut mock = MockCredentials::new();
        mock.expect_credentials_for().returning(|_| Ok(None));
        let processor = processor(mock);

        let job = processor
            .create_job("shop-a", vec!["v1".into(), "v2".into()], "9.99")
            .await
            .unwrap();

        let job = wait_terminal(&processor, job.id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.processed_count, 0);
        assert!(job.error_digest.summary().contains("No credentials"));
    }

    #[tokio::test]
    async fn duplicate_process_call_is_a_no_op() {
        let processor = processor(with_credentials());
        let job = processor
            .create_job("shop-a", vec!["v1".into()], "9.99")
            .await
            .unwrap();

        let first = {
            let p = Arc::clone(&processor);
            let id = job.id;
            tokio::spawn(async move { p.process_job(id).await })
        };
        let second = {
            let p = Arc::clone(&processor);
            let id = job.id;
            tokio::spawn(async move { p.process_job(id).await })
        };
        let _ = tokio::join!(first, second);

        // Both routines plus the scheduled one raced; the guard lets exactly
        // one of them do the work, so the totals are written once.
        let job = wait_terminal(&processor, job.id).await;
        assert_eq!(job.processed_count, 1);
        assert_eq!(job.status, JobStatus::Success);
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_not_found() {
        let processor = processor(with_credentials());
        let result = processor.job_status(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
