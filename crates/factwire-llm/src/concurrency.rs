//! Process-wide cap on in-flight provider calls

use crate::{ChatMessage, ChatResponse, GatewayError, ProviderGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Limits how many gateway calls run at once
///
/// Build one per process and share it; clones share the same semaphore.
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Default for ConcurrencyController {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ConcurrencyController {
    /// Create a controller allowing `capacity` concurrent calls (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        info!(capacity, "Concurrency controller initialized");
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Maximum concurrent calls
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run [`ProviderGateway::call_with_fallback`] while holding a permit
    pub async fn call(
        &self,
        gateway: &ProviderGateway,
        messages: &[ChatMessage],
        temperature: f64,
        timeout: Duration,
        retries: u32,
    ) -> Result<(ChatResponse, String), GatewayError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GatewayError::Closed)?;
        debug!(available = self.available(), "Acquired provider permit");

        gateway
            .call_with_fallback(messages, temperature, timeout, retries)
            .await
    }
}
