//! Provider gateway with per-provider retry and ordered failover

use crate::{BackoffPolicy, ChatMessage, ChatProvider, ChatRequest, ChatResponse, LlmError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors returned by the gateway
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The gateway was built without providers
    #[error("No LLM providers configured")]
    NoProviders,

    /// Every provider failed
    #[error("All providers exhausted after {attempts} attempts, last error: {last_error}")]
    AllProvidersExhausted {
        /// Calls made across all providers
        attempts: usize,
        /// Error of the final call
        last_error: LlmError,
    },

    /// The concurrency controller no longer hands out permits
    #[error("Concurrency controller closed")]
    Closed,
}

/// Routes chat calls across an ordered list of providers
///
/// Each provider gets `retries + 1` attempts. Transient errors back off and
/// retry the same provider; any other error moves on to the next provider
/// immediately.
pub struct ProviderGateway {
    providers: Vec<Arc<dyn ChatProvider>>,
    backoff: BackoffPolicy,
}

impl ProviderGateway {
    /// Create a gateway over `providers`, tried in the given order
    pub fn new(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        Self {
            providers,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Replace the backoff policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Provider names in failover order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Number of providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the gateway has no providers
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Call providers in order until one answers
    ///
    /// Returns the response and the name of the provider that served it.
    /// Every attempt is bounded by `timeout`.
    pub async fn call_with_fallback(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        timeout: Duration,
        retries: u32,
    ) -> Result<(ChatResponse, String), GatewayError> {
        if self.providers.is_empty() {
            return Err(GatewayError::NoProviders);
        }

        let request = ChatRequest::new(messages.to_vec(), temperature, timeout);
        let mut attempts = 0;
        let mut last_error = None;

        for provider in &self.providers {
            let name = provider.name();
            debug!(provider = %name, "Trying provider");

            for attempt in 0..=retries {
                attempts += 1;

                let result = match tokio::time::timeout(timeout, provider.chat(&request)).await {
                    Ok(result) => result,
                    Err(_) => Err(LlmError::Timeout(timeout)),
                };

                match result {
                    Ok(response) => {
                        info!(provider = %name, attempts, "Provider call succeeded");
                        return Ok((response, name.to_string()));
                    }
                    Err(e) if e.is_transient() && attempt < retries => {
                        let delay = self.backoff.delay(attempt + 1);
                        warn!(
                            provider = %name,
                            attempt = attempt + 1,
                            error = %e,
                            "Transient provider error, retrying in {:?}",
                            delay
                        );
                        last_error = Some(e);
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        warn!(provider = %name, error = %e, "Provider failed, trying next");
                        last_error = Some(e);
                        break;
                    }
                }
            }
        }

        let last_error =
            last_error.unwrap_or_else(|| LlmError::Other("no provider was called".to_string()));
        error!(attempts, error = %last_error, "All providers exhausted");
        Err(GatewayError::AllProvidersExhausted {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;

    fn gateway(providers: &[&MockProvider]) -> ProviderGateway {
        let providers: Vec<Arc<dyn ChatProvider>> = providers
            .iter()
            .map(|p| Arc::new((*p).clone()) as Arc<dyn ChatProvider>)
            .collect();
        ProviderGateway::new(providers)
            .with_backoff(BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(5)))
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("extract"), ChatMessage::user("text")]
    }

    #[tokio::test]
    async fn test_first_provider_serves() {
        let a = MockProvider::new("a", "from a");
        let b = MockProvider::new("b", "from b");

        let (response, provider) = gateway(&[&a, &b])
            .call_with_fallback(&messages(), 0.3, Duration::from_secs(1), 2)
            .await
            .unwrap();

        assert_eq!(provider, "a");
        assert_eq!(response.content, "from a");
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_fail_over_after_retries() {
        let a = MockProvider::failing("A", LlmError::Communication("connection reset".into()));
        let b = MockProvider::new("B", "ok");

        let (_, provider) = gateway(&[&a, &b])
            .call_with_fallback(&messages(), 0.3, Duration::from_secs(1), 2)
            .await
            .unwrap();

        assert_eq!(provider, "B");
        assert_eq!(a.call_count(), 3);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_transient_error_skips_retries() {
        let a = MockProvider::failing(
            "A",
            LlmError::Api {
                status: 401,
                message: "invalid key".into(),
            },
        );
        let b = MockProvider::new("B", "ok");

        let (_, provider) = gateway(&[&a, &b])
            .call_with_fallback(&messages(), 0.3, Duration::from_secs(1), 2)
            .await
            .unwrap();

        assert_eq!(provider, "B");
        assert_eq!(a.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_on_same_provider() {
        let a = MockProvider::new("A", "recovered");
        a.push_error(LlmError::RateLimitExceeded);
        let b = MockProvider::new("B", "unused");

        let (response, provider) = gateway(&[&a, &b])
            .call_with_fallback(&messages(), 0.3, Duration::from_secs(1), 1)
            .await
            .unwrap();

        assert_eq!(provider, "A");
        assert_eq!(response.content, "recovered");
        assert_eq!(a.call_count(), 2);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient_failure() {
        let slow = MockProvider::new("slow", "late").with_latency(Duration::from_millis(200));
        let fast = MockProvider::new("fast", "ok");

        let (_, provider) = gateway(&[&slow, &fast])
            .call_with_fallback(&messages(), 0.3, Duration::from_millis(20), 1)
            .await
            .unwrap();

        assert_eq!(provider, "fast");
        assert_eq!(slow.call_count(), 2);
    }

    #[tokio::test]
    async fn test_all_providers_exhausted() {
        let a = MockProvider::failing("A", LlmError::Communication("down".into()));
        let b = MockProvider::failing("B", LlmError::InvalidResponse("garbage".into()));

        let err = gateway(&[&a, &b])
            .call_with_fallback(&messages(), 0.3, Duration::from_secs(1), 2)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::AllProvidersExhausted {
                attempts: 4,
                last_error: LlmError::InvalidResponse("garbage".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_no_providers() {
        let err = ProviderGateway::new(Vec::new())
            .call_with_fallback(&messages(), 0.3, Duration::from_secs(1), 2)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::NoProviders);
    }

    #[tokio::test]
    async fn test_request_carries_messages_and_temperature() {
        let a = MockProvider::new("a", "ok");
        gateway(&[&a])
            .call_with_fallback(&messages(), 0.1, Duration::from_secs(3), 0)
            .await
            .unwrap();

        let requests = a.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, messages());
        assert_eq!(requests[0].temperature, 0.1);
        assert_eq!(requests[0].timeout, Duration::from_secs(3));
    }
}
