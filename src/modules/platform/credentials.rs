//! Credential resolution boundary.
//!
//! Token storage, OAuth exchange, and decryption live in the outer
//! application; the core only asks for the resolved credentials of a tenant.
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Resolved access credentials for one tenant's shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantCredentials {
    /// Shop domain, e.g. "example.myshopify.com". Doubles as the throttle key.
    pub shop_domain: String,
    pub access_token: String,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolve credentials for a tenant; `None` means no installation exists,
    /// which is fatal to any job for that tenant.
    async fn credentials_for(&self, tenant: &str) -> AppResult<Option<TenantCredentials>>;
}
