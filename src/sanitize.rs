//! Turn raw model output into a validated [`MissionContract`].
//!
//! Models wrap JSON in markdown fences and prose. Only the first fenced block
//! is considered; text outside it is discarded. Unfenced text is parsed as-is.

use serde::Deserialize;
use serde_json::Value;

use crate::mission::{
    ChallengeSpec, ChallengeType, DeliveryMode, MissionContract, RewardSpec, RewardType,
    ShapeName, TargetValue,
};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Raw-output preview length carried in parse errors.
const PREVIEW_CHARS: usize = 300;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("model output is empty after fence stripping")]
    Empty,
    #[error("mission JSON did not parse: {source} (raw: {preview})")]
    Json {
        #[source]
        source: serde_json::Error,
        preview: String,
    },
    #[error("invalid mission: {0}")]
    Invalid(String),
}

// =============================================================================
// Fence stripping
// =============================================================================

/// Extract the candidate JSON text from raw model output.
///
/// A ```json fence wins over an untagged one. An opening fence with no
/// closing fence yields everything after the opener.
pub fn strip_fences(raw: &str) -> &str {
    let inner = if let Some(start) = raw.find(JSON_FENCE) {
        until_fence(&raw[start + JSON_FENCE.len()..])
    } else if let Some(start) = raw.find(FENCE) {
        until_fence(&raw[start + FENCE.len()..])
    } else {
        raw
    };
    inner.trim()
}

fn until_fence(s: &str) -> &str {
    match s.find(FENCE) {
        Some(end) => &s[..end],
        None => s,
    }
}

// =============================================================================
// Parsing
// =============================================================================

#[derive(Deserialize)]
struct RawMission {
    mission_name: String,
    flavor_text: String,
    #[serde(default)]
    email_header: Option<String>,
    #[serde(default)]
    email_text: Option<String>,
    challenge: RawSpec,
    reward: RawSpec,
}

#[derive(Deserialize)]
struct RawSpec {
    #[serde(rename = "type")]
    kind: String,
    target_value: Value,
}

/// Strip fences, parse, and check vocabulary and delivery-mode fields.
pub fn parse_mission(raw: &str, mode: DeliveryMode) -> Result<MissionContract, ParseError> {
    let candidate = strip_fences(raw);
    if candidate.is_empty() {
        return Err(ParseError::Empty);
    }

    let parsed: RawMission = serde_json::from_str(candidate).map_err(|source| ParseError::Json {
        source,
        preview: candidate.chars().take(PREVIEW_CHARS).collect(),
    })?;

    validate(parsed, mode)
}

fn validate(raw: RawMission, mode: DeliveryMode) -> Result<MissionContract, ParseError> {
    let challenge = validate_challenge(raw.challenge)?;
    let reward = validate_reward(raw.reward)?;

    let (email_header, email_text) = if mode.requires_email_fields() {
        require_text("email_header", raw.email_header.as_deref())?;
        require_text("email_text", raw.email_text.as_deref())?;
        (raw.email_header, raw.email_text)
    } else {
        (non_blank(raw.email_header), non_blank(raw.email_text))
    };

    Ok(MissionContract {
        mission_name: raw.mission_name,
        flavor_text: raw.flavor_text,
        email_header,
        email_text,
        challenge,
        reward,
    })
}

fn validate_challenge(spec: RawSpec) -> Result<ChallengeSpec, ParseError> {
    let kind = ChallengeType::parse(&spec.kind)
        .ok_or_else(|| ParseError::Invalid(format!("unknown challenge type: {}", spec.kind)))?;

    let target_value = if kind.takes_shape() {
        let name = spec.target_value.as_str().ok_or_else(|| {
            ParseError::Invalid(format!(
                "{} target_value must be a shape name, got {}",
                kind.as_str(),
                spec.target_value
            ))
        })?;
        let shape = ShapeName::parse(name)
            .ok_or_else(|| ParseError::Invalid(format!("unknown shape: {name}")))?;
        TargetValue::Shape(shape)
    } else {
        TargetValue::Number(number(kind.as_str(), &spec.target_value)?)
    };

    Ok(ChallengeSpec { kind, target_value })
}

fn validate_reward(spec: RawSpec) -> Result<RewardSpec, ParseError> {
    let kind = RewardType::parse(&spec.kind)
        .ok_or_else(|| ParseError::Invalid(format!("unknown reward type: {}", spec.kind)))?;
    let target_value = number(kind.as_str(), &spec.target_value)?;
    Ok(RewardSpec { kind, target_value })
}

fn number(kind: &str, value: &Value) -> Result<f64, ParseError> {
    value.as_f64().ok_or_else(|| {
        ParseError::Invalid(format!("{kind} target_value must be a number, got {value}"))
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require_text(field: &str, value: Option<&str>) -> Result<(), ParseError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ParseError::Invalid(format!(
            "{field} is required for email delivery"
        ))),
    }
}
