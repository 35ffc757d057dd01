//! Structured event emission boundary.
//!
//! The core reports lifecycle and throttling events through an [`EventSink`]
//! collaborator instead of logging directly, so the outer application can
//! route them to its metrics pipeline. [`LogEventSink`] is the default sink
//! and writes through the `log` macros.
use std::time::Duration;
use uuid::Uuid;

/// Events emitted by the bulk-operation pipeline.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    JobCreated {
        job_id: Uuid,
        tenant: String,
        total_count: u32,
    },
    JobStarted {
        job_id: Uuid,
    },
    BatchCompleted {
        job_id: Uuid,
        processed_count: u32,
        total_count: u32,
        batch_failures: u32,
    },
    JobCompleted {
        job_id: Uuid,
        success: bool,
        failure_count: u32,
    },
    JobRetried {
        job_id: Uuid,
    },
    JobCancelled {
        job_id: Uuid,
    },
    /// A spawned processing task died with an error that had nowhere to go.
    TaskFailure {
        job_id: Uuid,
        message: String,
    },
    ThrottleRejected {
        throttle: &'static str,
        key: String,
        retry_after: Duration,
    },
    RetryScheduled {
        item_id: String,
        attempt: u32,
        delay: Duration,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: CoreEvent);
}

/// Default sink: structured-ish lines through the `log` facade.
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: CoreEvent) {
        match event {
            CoreEvent::JobCreated {
                job_id,
                tenant,
                total_count,
            } => {
                log::info!(
                    "Job {} created for tenant {} ({} items)",
                    job_id,
                    tenant,
                    total_count
                );
            }
            CoreEvent::JobStarted { job_id } => log::info!("Job {} started", job_id),
            CoreEvent::BatchCompleted {
                job_id,
                processed_count,
                total_count,
                batch_failures,
            } => {
                log::debug!(
                    "Job {}: batch done, {}/{} processed ({} failures in batch)",
                    job_id,
                    processed_count,
                    total_count,
                    batch_failures
                );
            }
            CoreEvent::JobCompleted {
                job_id,
                success,
                failure_count,
            } => {
                if success {
                    log::info!("Job {} completed successfully", job_id);
                } else {
                    log::warn!("Job {} completed with {} failures", job_id, failure_count);
                }
            }
            CoreEvent::JobRetried { job_id } => log::info!("Job {} queued for retry", job_id),
            CoreEvent::JobCancelled { job_id } => log::info!("Job {} cancelled", job_id),
            CoreEvent::TaskFailure { job_id, message } => {
                log::error!("Processing task for job {} failed: {}", job_id, message);
            }
            CoreEvent::ThrottleRejected {
                throttle,
                key,
                retry_after,
            } => {
                log::warn!(
                    "Throttle '{}' rejected key {} (retry after {:?})",
                    throttle,
                    key,
                    retry_after
                );
            }
            CoreEvent::RetryScheduled {
                item_id,
                attempt,
                delay,
            } => {
                log::warn!(
                    "Retrying item {} (attempt {}) in {:?}",
                    item_id,
                    attempt,
                    delay
                );
            }
        }
    }
}
