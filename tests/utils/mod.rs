#![allow(dead_code)]
//! Shared fakes and builders for integration tests.
use async_trait::async_trait;
use repricer::modules::jobs::{BatchResult, BulkJobProcessor, InMemoryJobStore, JobStatusView};
use repricer::modules::platform::{
    CredentialProvider, GatewayFactory, PlatformGateway, TenantCredentials,
};
use repricer::shared::{AppError, AppResult, LogEventSink};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Credential provider that knows every tenant.
pub struct StaticCredentials;

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials_for(&self, tenant: &str) -> AppResult<Option<TenantCredentials>> {
        Ok(Some(TenantCredentials {
            shop_domain: format!("{}.myshopify.com", tenant),
            access_token: "test-token".to_string(),
        }))
    }
}

/// Factory that hands out one shared gateway regardless of credentials.
pub struct FixedGatewayFactory {
    gateway: Arc<dyn PlatformGateway>,
}

impl FixedGatewayFactory {
    pub fn new(gateway: Arc<dyn PlatformGateway>) -> Self {
        Self { gateway }
    }
}

impl GatewayFactory for FixedGatewayFactory {
    fn gateway_for(&self, _credentials: TenantCredentials) -> Arc<dyn PlatformGateway> {
        Arc::clone(&self.gateway)
    }
}

/// Gateway with scripted per-item outcomes; records every batch it receives.
#[derive(Default)]
pub struct ScriptedGateway {
    validation_failures: HashSet<String>,
    transport_failures: HashSet<String>,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGateway {
    pub fn all_success() -> Self {
        Self::default()
    }

    pub fn with_validation_failure(mut self, item_id: &str) -> Self {
        self.validation_failures.insert(item_id.to_string());
        self
    }

    pub fn with_transport_failure(mut self, item_id: &str) -> Self {
        self.transport_failures.insert(item_id.to_string());
        self
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.len())
            .collect()
    }
}

#[async_trait]
impl PlatformGateway for ScriptedGateway {
    async fn bulk_update(&self, item_ids: &[String], _value: &str) -> AppResult<BatchResult> {
        self.batches.lock().unwrap().push(item_ids.to_vec());

        let mut result = BatchResult::default();
        for item_id in item_ids {
            if self.validation_failures.contains(item_id) {
                result.record_validation_failure(
                    item_id,
                    Some("input.price".to_string()),
                    "Price is invalid".to_string(),
                );
            } else if self.transport_failures.contains(item_id) {
                result.record_transport_failure(item_id, "connection reset".to_string());
            } else {
                result.record_success();
            }
        }
        Ok(result)
    }
}

/// Gateway whose n-th batch call blows up entirely.
pub struct FailNthBatchGateway {
    fail_index: usize,
    calls: Mutex<usize>,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl FailNthBatchGateway {
    pub fn new(fail_index: usize) -> Self {
        Self {
            fail_index,
            calls: Mutex::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlatformGateway for FailNthBatchGateway {
    async fn bulk_update(&self, item_ids: &[String], _value: &str) -> AppResult<BatchResult> {
        self.batches.lock().unwrap().push(item_ids.to_vec());

        let call = {
            let mut calls = self.calls.lock().unwrap();
            let current = *calls;
            *calls += 1;
            current
        };
        if call == self.fail_index {
            return Err(AppError::TransportError(
                "admin API unreachable".to_string(),
            ));
        }

        let mut result = BatchResult::default();
        for _ in item_ids {
            result.record_success();
        }
        Ok(result)
    }
}

/// Gateway that parks each batch until released, for catching jobs mid-run.
pub struct BlockingGateway {
    pub release: Arc<tokio::sync::Notify>,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl BlockingGateway {
    pub fn new() -> Self {
        Self {
            release: Arc::new(tokio::sync::Notify::new()),
            batches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlatformGateway for BlockingGateway {
    async fn bulk_update(&self, item_ids: &[String], _value: &str) -> AppResult<BatchResult> {
        self.batches.lock().unwrap().push(item_ids.to_vec());
        self.release.notified().await;

        let mut result = BatchResult::default();
        for _ in item_ids {
            result.record_success();
        }
        Ok(result)
    }
}

pub fn build_processor(
    gateway: Arc<dyn PlatformGateway>,
    batch_size: usize,
) -> (Arc<BulkJobProcessor>, Arc<InMemoryJobStore>) {
    let store = Arc::new(InMemoryJobStore::new());
    let processor = Arc::new(BulkJobProcessor::new(
        store.clone(),
        Arc::new(StaticCredentials),
        Arc::new(FixedGatewayFactory::new(gateway)),
        Arc::new(LogEventSink),
        batch_size,
    ));
    (processor, store)
}

pub fn item_ids(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("item-{}", i)).collect()
}

/// Poll until the job reaches a terminal state.
pub async fn wait_for_terminal(processor: &Arc<BulkJobProcessor>, id: Uuid) -> JobStatusView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let view = processor.job_status(id).await.unwrap();
        if view.job.status.is_terminal() {
            return view;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} did not reach a terminal state in time",
            id
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {}",
            what
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
