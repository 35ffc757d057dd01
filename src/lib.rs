//! Core of the bulk variant repricing pipeline.
//!
//! The outer application (HTTP layer, OAuth, exports, dashboard) plugs in a
//! `JobStore`, a `CredentialProvider`, and optionally an `EventSink`, then
//! drives everything through the [`modules::jobs::JobHandle`] façade.
pub mod modules;
pub mod shared;

use modules::jobs::{BulkJobProcessor, JobHandle, JobStore};
use modules::platform::{AdminGatewayFactory, CredentialProvider, RetryPolicy};
use modules::throttle::FixedWindowThrottle;
use shared::{CoreConfig, EventSink, LogEventSink};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Process-wide assembly of the core: throttle instances with their sweep
/// tasks, the per-tenant gateway factory, the processor, and the façade.
pub struct CoreRuntime {
    pub handle: JobHandle,
    /// Counter space for general inbound traffic, checked by the HTTP layer.
    pub inbound_throttle: Arc<FixedWindowThrottle>,
    /// Counter space for export requests, checked by the HTTP layer.
    pub export_throttle: Arc<FixedWindowThrottle>,
    shutdown: CancellationToken,
    sweepers: Vec<tokio::task::JoinHandle<()>>,
}

impl CoreRuntime {
    pub fn start(
        config: CoreConfig,
        store: Arc<dyn JobStore>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self::start_with_events(config, store, credentials, Arc::new(LogEventSink))
    }

    pub fn start_with_events(
        config: CoreConfig,
        store: Arc<dyn JobStore>,
        credentials: Arc<dyn CredentialProvider>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let shutdown = CancellationToken::new();

        let inbound_throttle = Arc::new(FixedWindowThrottle::inbound(&config));
        let bulk_creation_throttle = Arc::new(FixedWindowThrottle::bulk_creation(&config));
        let export_throttle = Arc::new(FixedWindowThrottle::export(&config));
        let outbound_throttle = Arc::new(FixedWindowThrottle::outbound(&config));

        let sweepers = vec![
            Arc::clone(&inbound_throttle).spawn_sweeper(config.sweep_interval, shutdown.clone()),
            Arc::clone(&bulk_creation_throttle)
                .spawn_sweeper(config.sweep_interval, shutdown.clone()),
            Arc::clone(&export_throttle).spawn_sweeper(config.sweep_interval, shutdown.clone()),
            Arc::clone(&outbound_throttle).spawn_sweeper(config.sweep_interval, shutdown.clone()),
        ];

        let gateways = Arc::new(AdminGatewayFactory::new(
            RetryPolicy::with_max_retries(config.max_retries),
            config.outbound_calls_per_second,
            Arc::clone(&outbound_throttle),
            Arc::clone(&events),
        ));

        let processor = Arc::new(BulkJobProcessor::new(
            store,
            credentials,
            gateways,
            events,
            config.batch_size,
        ));

        let handle = JobHandle::new(processor, bulk_creation_throttle);

        Self {
            handle,
            inbound_throttle,
            export_throttle,
            shutdown,
            sweepers,
        }
    }

    /// Stop the sweep tasks. In-flight job routines finish cooperatively.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for result in futures::future::join_all(self.sweepers).await {
            let _ = result;
        }
    }
}
