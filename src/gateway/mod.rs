//! Provider gateway for hosted chat completions.

pub mod error;
pub mod huggingface;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use huggingface::{ChatProvider, HuggingFaceAdapter};
use usage::{ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use error::{ErrorContext, ProviderError};
pub use types::*;
pub use usage::{NoopUsageSink, TracingUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Retry policy for the gateway.
///
/// The default is a single attempt; retries are opt-in.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_base_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

pub struct ProviderGateway<P: ChatProvider, U: UsageSinkTrait> {
    provider: P,
    usage_sink: Arc<U>,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<P: ChatProvider, U: UsageSinkTrait> ChatGateway for ProviderGateway<P, U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }
}

impl<U: UsageSinkTrait> ProviderGateway<HuggingFaceAdapter, U> {
    pub fn huggingface(
        adapter: HuggingFaceAdapter,
        usage_sink: Arc<U>,
        config: GatewayConfig,
    ) -> Self {
        Self::with_config(adapter, usage_sink, config)
    }
}

impl<P: ChatProvider, U: UsageSinkTrait> ProviderGateway<P, U> {
    pub fn with_config(provider: P, usage_sink: Arc<U>, config: GatewayConfig) -> Self {
        Self {
            provider,
            usage_sink,
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut attempt = 0;

        loop {
            match self.provider.chat(&req).await {
                Ok(resp) => {
                    self.record_usage(&req, &resp, attempt, None).await;
                    return Ok(resp);
                }
                Err(err) => {
                    let mut failed = ChatResponse::empty();
                    failed.request_id = err.request_id().map(str::to_string);
                    self.record_usage(&req, &failed, attempt, Some(err.code()))
                        .await;

                    if !err.is_retryable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }

                    let delay = backoff_delay(
                        self.config.retry_base_delay,
                        self.config.max_retry_delay,
                        attempt,
                        err.retry_after(),
                    );
                    tracing::warn!(
                        error = %err,
                        code = err.code(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retryable provider failure; backing off"
                    );
                    attempt += 1;
                    sleep(delay).await;
                }
            }
        }
    }

    async fn record_usage(
        &self,
        req: &ChatRequest,
        resp: &ChatResponse,
        attempt: u32,
        error_code: Option<&str>,
    ) {
        let record = ProviderCallRecord::new(
            req.model.provider(),
            "chat/completions",
            req.model.model_id(),
            req.attribution.caller,
        )
        .tokens(resp.input_tokens, resp.output_tokens)
        .player(req.attribution.player_id.clone())
        .attempt(attempt)
        .latency(resp.latency.as_millis() as u64)
        .request_id(resp.request_id.clone());

        let record = match error_code {
            Some(code) => record.error(code),
            None => record,
        };

        self.usage_sink.record(record).await;
    }
}

/// Exponential backoff with full jitter, capped at `max`.
///
/// A provider-supplied `retry_after` acts as a floor on the result.
fn backoff_delay(
    base: Duration,
    max: Duration,
    attempt: u32,
    retry_after: Option<Duration>,
) -> Duration {
    let multiplier = 2u32.pow(attempt.min(5));
    let ceiling = base.saturating_mul(multiplier).min(max);
    let jittered = if ceiling.is_zero() {
        ceiling
    } else {
        let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
        Duration::from_millis(millis)
    };
    match retry_after {
        Some(floor) => jittered.max(floor),
        None => jittered,
    }
}
