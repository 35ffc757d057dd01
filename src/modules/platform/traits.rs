//! Seams between the job processor and the admin API client.
use crate::modules::jobs::domain::entities::BatchResult;
use crate::modules::platform::credentials::TenantCredentials;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use std::sync::Arc;

/// What the processor needs from the platform: apply one value to a batch of
/// items. Implementations own pacing and retries; per-item failures are
/// captured inside the `BatchResult`, an `Err` means the whole batch is lost.
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    async fn bulk_update(&self, item_ids: &[String], value: &str) -> AppResult<BatchResult>;
}

/// Builds a per-tenant gateway bound to one set of credentials.
pub trait GatewayFactory: Send + Sync {
    fn gateway_for(&self, credentials: TenantCredentials) -> Arc<dyn PlatformGateway>;
}
