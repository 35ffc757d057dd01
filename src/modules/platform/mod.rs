pub mod client;
pub mod credentials;
pub mod dto;
pub mod graphql;
pub mod retry_policy;
pub mod traits;

pub use client::{AdminApiClient, AdminGatewayFactory};
pub use credentials::{CredentialProvider, TenantCredentials};
pub use retry_policy::{RateLimitInfo, RetryPolicy};
pub use traits::{GatewayFactory, PlatformGateway};
