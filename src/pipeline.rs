//! Mission request pipeline: prompt → chat completion → sanitized contract.
//!
//! Each call is independent. Nothing is cached or carried between calls, and
//! a failure at any stage yields no mission at all.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::{ConfigError, GeneratorConfig};
use crate::gateway::huggingface::HuggingFaceAdapter;
use crate::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, FinishReason, ProviderError,
    ProviderGateway, TracingUsageSink,
};
use crate::mission::{DeliveryMode, MissionContract, PlayerContext};
use crate::prompts::build_messages;
use crate::sanitize::{parse_mission, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    /// Missing credential or unusable client settings. Fatal.
    #[error("configuration error: {0}")]
    Config(String),
    /// The remote call failed (transport, auth, rate limit, empty envelope).
    #[error("generation failed: {0}")]
    Generation(#[from] ProviderError),
    /// The model answered but the answer is not a valid mission.
    #[error("could not parse mission: {0}")]
    Parse(#[from] ParseError),
}

impl From<ConfigError> for MissionError {
    fn from(err: ConfigError) -> Self {
        MissionError::Config(err.to_string())
    }
}

impl MissionError {
    /// Only configuration errors should stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MissionError::Config(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            MissionError::Config(_) => "config_error",
            MissionError::Generation(err) => err.code(),
            MissionError::Parse(ParseError::Empty) => "parse_empty",
            MissionError::Parse(ParseError::Json { .. }) => "parse_json",
            MissionError::Parse(ParseError::Invalid(_)) => "parse_invalid",
        }
    }
}

/// Default gateway wiring: Hugging Face adapter, usage on the log stream.
pub type HuggingFaceGateway = ProviderGateway<HuggingFaceAdapter, TracingUsageSink>;

/// Sampling and schema settings for one pipeline.
#[derive(Debug, Clone)]
pub struct RequestSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub delivery_mode: DeliveryMode,
}

impl From<&GeneratorConfig> for RequestSettings {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            delivery_mode: config.delivery_mode,
        }
    }
}

pub struct MissionPipeline<G: ChatGateway> {
    gateway: G,
    settings: RequestSettings,
}

impl MissionPipeline<HuggingFaceGateway> {
    /// Resolve the credential and settings from the environment.
    ///
    /// Fails with [`MissionError::Config`] before any client is built when
    /// no credential is available.
    pub fn from_env() -> Result<Self, MissionError> {
        let config = GeneratorConfig::from_env()?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, MissionError> {
        let adapter =
            HuggingFaceAdapter::with_config(&config.api_key, &config.base_url, config.timeout)
                .map_err(|e| MissionError::Config(e.to_string()))?;
        let gateway = ProviderGateway::huggingface(
            adapter,
            Arc::new(TracingUsageSink),
            config.retry.clone(),
        );
        Ok(Self::new(gateway, RequestSettings::from(config)))
    }
}

impl<G: ChatGateway> MissionPipeline<G> {
    pub fn new(gateway: G, settings: RequestSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn settings(&self) -> &RequestSettings {
        &self.settings
    }

    /// Request one mission. All-or-nothing: no partial contract is returned.
    pub async fn generate(
        &self,
        context: Option<&PlayerContext>,
    ) -> Result<MissionContract, MissionError> {
        let mode = self.settings.delivery_mode;
        let messages = build_messages(context, mode);

        let attribution = match context {
            Some(ctx) => Attribution::new("pipeline::generate").with_player(&ctx.player_id),
            None => Attribution::new("pipeline::generate"),
        };

        let request = ChatRequest::new(
            ChatModel::huggingface(&self.settings.model),
            messages,
            attribution,
        )
        .temperature(self.settings.temperature)
        .max_tokens(self.settings.max_tokens);

        let response = self.gateway.chat(request).await?;

        debug!(
            model = %self.settings.model,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            latency_ms = response.latency.as_millis() as u64,
            "mission completion received"
        );
        if response.finish_reason == FinishReason::Length {
            warn!(
                max_tokens = self.settings.max_tokens,
                "completion hit the token budget; output may be truncated"
            );
        }

        let mission = parse_mission(&response.content, mode)?;
        Ok(mission)
    }

    /// Request one mission, logging any failure and returning `None`.
    pub async fn generate_or_none(
        &self,
        context: Option<&PlayerContext>,
    ) -> Option<MissionContract> {
        match self.generate(context).await {
            Ok(mission) => Some(mission),
            Err(err) => {
                error!(error = %err, code = err.code(), "no mission produced");
                None
            }
        }
    }

    /// Request `count` missions one after another. Each slot is independent.
    pub async fn generate_batch(
        &self,
        context: Option<&PlayerContext>,
        count: usize,
    ) -> Vec<Option<MissionContract>> {
        let mut missions = Vec::new();
        for _ in 0..count {
            missions.push(self.generate_or_none(context).await);
        }
        missions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ChatResponse, Message};
    use crate::mission::{ChallengeType, RewardType};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Gateway that replays canned results and records requests.
    struct ScriptedGateway {
        replies: Mutex<Vec<Result<String, ProviderError>>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatGateway for ScriptedGateway {
        async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.seen.lock().unwrap().push(req);
            let next = self.replies.lock().unwrap().remove(0);
            next.map(|content| ChatResponse {
                content,
                input_tokens: 1,
                output_tokens: 1,
                latency: Duration::from_millis(1),
                finish_reason: FinishReason::Stop,
                request_id: None,
            })
        }
    }

    fn settings(mode: DeliveryMode) -> RequestSettings {
        RequestSettings {
            model: "test/model".into(),
            max_tokens: 500,
            temperature: 1.0,
            delivery_mode: mode,
        }
    }

    const MISSION: &str = r#"```json
{"mission_name":"Tri Hard","flavor_text":"Corners, please.","challenge":{"type":"COND_SHAPE","target_value":"triangle"},"reward":{"type":"REW_SHIELD","target_value":2}}
```"#;

    #[tokio::test]
    async fn generate_builds_request_and_parses() {
        let gateway = ScriptedGateway::new(vec![Ok(MISSION.to_string())]);
        let pipeline = MissionPipeline::new(gateway, settings(DeliveryMode::Direct));
        let ctx = PlayerContext::sample();

        let mission = pipeline.generate(Some(&ctx)).await.unwrap();
        assert_eq!(mission.challenge.kind, ChallengeType::Shape);
        assert_eq!(mission.reward.kind, RewardType::Shield);

        let seen = pipeline.gateway.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let req = &seen[0];
        assert_eq!(req.model.model_id(), "test/model");
        assert_eq!(req.temperature, 1.0);
        assert_eq!(req.max_tokens, Some(500));
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.attribution.player_id.as_deref(), Some("runner_01"));
        assert!(matches!(req.messages[0], Message { role: crate::gateway::Role::System, .. }));
    }

    #[tokio::test]
    async fn provider_failure_collapses_to_none() {
        let gateway = ScriptedGateway::new(vec![Err(ProviderError::empty_response(
            "No choices in response",
        ))]);
        let pipeline = MissionPipeline::new(gateway, settings(DeliveryMode::Direct));

        let err = pipeline.generate(None).await.unwrap_err();
        assert!(matches!(err, MissionError::Generation(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn parse_failure_yields_none() {
        let gateway = ScriptedGateway::new(vec![Ok(r#"{"mission_name": }"#.to_string())]);
        let pipeline = MissionPipeline::new(gateway, settings(DeliveryMode::Direct));
        assert!(pipeline.generate_or_none(None).await.is_none());
    }

    #[tokio::test]
    async fn email_mode_rejects_missing_email_fields() {
        let gateway = ScriptedGateway::new(vec![Ok(MISSION.to_string())]);
        let pipeline = MissionPipeline::new(gateway, settings(DeliveryMode::Email));
        let err = pipeline.generate(None).await.unwrap_err();
        assert_eq!(err.code(), "parse_invalid");
    }

    #[tokio::test]
    async fn batch_slots_are_independent() {
        let gateway = ScriptedGateway::new(vec![
            Ok(MISSION.to_string()),
            Err(ProviderError::provider("huggingface", "boom", false)),
            Ok(MISSION.to_string()),
        ]);
        let pipeline = MissionPipeline::new(gateway, settings(DeliveryMode::Direct));
        let missions = pipeline.generate_batch(None, 3).await;
        assert_eq!(missions.len(), 3);
        assert!(missions[0].is_some());
        assert!(missions[1].is_none());
        assert!(missions[2].is_some());
    }

    #[test]
    fn config_error_is_fatal() {
        let err = MissionError::from(ConfigError::MissingApiKey);
        assert!(err.is_fatal());
        assert_eq!(err.code(), "config_error");
    }
}
