//! Mission contract types.

use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Vocabularies
// =============================================================================

/// Closed vocabulary of challenge conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeType {
    /// Zone must resemble a named shape.
    #[serde(rename = "COND_SHAPE")]
    Shape,
    /// Enclosed area must exceed the target (m^2).
    #[serde(rename = "COND_AREA")]
    Area,
    /// Zone must be finished within the target (minutes).
    #[serde(rename = "COND_TIME")]
    Time,
    /// New zone must touch at least the target number of existing zones.
    #[serde(rename = "COND_INTERSECT")]
    Intersect,
    /// New zone must be at least the target (meters) from the player's zones.
    #[serde(rename = "COND_DISTANCE")]
    Distance,
}

impl ChallengeType {
    pub const ALL: [ChallengeType; 5] = [
        Self::Shape,
        Self::Area,
        Self::Time,
        Self::Intersect,
        Self::Distance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shape => "COND_SHAPE",
            Self::Area => "COND_AREA",
            Self::Time => "COND_TIME",
            Self::Intersect => "COND_INTERSECT",
            Self::Distance => "COND_DISTANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Unit of `target_value` for this condition.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Shape => "shape",
            Self::Area => "m^2",
            Self::Time => "minutes",
            Self::Intersect => "count",
            Self::Distance => "meters",
        }
    }

    /// Whether the target is a shape name rather than a number.
    pub fn takes_shape(self) -> bool {
        matches!(self, Self::Shape)
    }
}

/// Closed vocabulary of rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardType {
    /// Zone is immune to attacks for the target (hours).
    #[serde(rename = "REW_LOCK")]
    Lock,
    /// Zone generates points at the target multiplier.
    #[serde(rename = "REW_SCORE_MULT")]
    ScoreMult,
    /// Zone gains the target number of extra defense layers.
    #[serde(rename = "REW_SHIELD")]
    Shield,
}

impl RewardType {
    pub const ALL: [RewardType; 3] = [Self::Lock, Self::ScoreMult, Self::Shield];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "REW_LOCK",
            Self::ScoreMult => "REW_SCORE_MULT",
            Self::Shield => "REW_SHIELD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Lock => "hours",
            Self::ScoreMult => "multiplier",
            Self::Shield => "count",
        }
    }
}

/// Shapes a `COND_SHAPE` challenge may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeName {
    Star,
    Square,
    Circle,
    Triangle,
    Heart,
}

impl ShapeName {
    pub const ALL: [ShapeName; 5] = [
        Self::Star,
        Self::Square,
        Self::Circle,
        Self::Triangle,
        Self::Heart,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Star => "star",
            Self::Square => "square",
            Self::Circle => "circle",
            Self::Triangle => "triangle",
            Self::Heart => "heart",
        }
    }

    /// Case-insensitive lookup.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == lower)
    }
}

// =============================================================================
// Specs
// =============================================================================

/// Challenge target: a number for most conditions, a shape for `COND_SHAPE`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    Number(f64),
    Shape(ShapeName),
}

impl Serialize for TargetValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TargetValue::Number(n) => serialize_number(*n, serializer),
            TargetValue::Shape(s) => serializer.serialize_str(s.as_str()),
        }
    }
}

/// Integral values keep their integer spelling (`150`, not `150.0`).
fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() < (i64::MAX as f64) {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

fn serialize_reward_value<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serialize_number(*n, serializer)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSpec {
    #[serde(rename = "type")]
    pub kind: ChallengeType,
    pub target_value: TargetValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSpec {
    #[serde(rename = "type")]
    pub kind: RewardType,
    #[serde(serialize_with = "serialize_reward_value")]
    pub target_value: f64,
}

// =============================================================================
// Contract
// =============================================================================

/// Which optional output fields a mission must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Shown in the app; email fields are optional.
    #[default]
    Direct,
    /// Delivered by email; `email_header` and `email_text` are required.
    Email,
}

impl DeliveryMode {
    pub fn requires_email_fields(self) -> bool {
        matches!(self, DeliveryMode::Email)
    }
}

/// A challenge plus a reward, ready to present to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionContract {
    pub mission_name: String,
    pub flavor_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_text: Option<String>,
    pub challenge: ChallengeSpec,
    pub reward: RewardSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_lookup_is_exact() {
        assert_eq!(ChallengeType::parse("COND_AREA"), Some(ChallengeType::Area));
        assert_eq!(ChallengeType::parse("cond_area"), None);
        assert_eq!(RewardType::parse("REW_SHIELD"), Some(RewardType::Shield));
        assert_eq!(RewardType::parse("REW_GOLD"), None);
    }

    #[test]
    fn shape_lookup_ignores_case() {
        assert_eq!(ShapeName::parse(" Heart "), Some(ShapeName::Heart));
        assert_eq!(ShapeName::parse("hexagon"), None);
    }

    #[test]
    fn integral_targets_serialize_without_fraction() {
        let mission = MissionContract {
            mission_name: "Park Run".into(),
            flavor_text: "Go!".into(),
            email_header: None,
            email_text: None,
            challenge: ChallengeSpec {
                kind: ChallengeType::Area,
                target_value: TargetValue::Number(150.0),
            },
            reward: RewardSpec {
                kind: RewardType::ScoreMult,
                target_value: 1.5,
            },
        };
        let json = serde_json::to_string(&mission).unwrap();
        assert_eq!(
            json,
            r#"{"mission_name":"Park Run","flavor_text":"Go!","challenge":{"type":"COND_AREA","target_value":150},"reward":{"type":"REW_SCORE_MULT","target_value":1.5}}"#
        );
    }

    #[test]
    fn shape_target_serializes_as_name() {
        let spec = ChallengeSpec {
            kind: ChallengeType::Shape,
            target_value: TargetValue::Shape(ShapeName::Star),
        };
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            serde_json::json!({"type": "COND_SHAPE", "target_value": "star"})
        );
    }

    #[test]
    fn units_follow_type() {
        assert_eq!(ChallengeType::Time.unit(), "minutes");
        assert_eq!(RewardType::Lock.unit(), "hours");
        assert!(ChallengeType::Shape.takes_shape());
        assert!(!ChallengeType::Distance.takes_shape());
    }
}
