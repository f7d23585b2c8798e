//! Player context sent to the model alongside the system instruction.

use serde::{Deserialize, Serialize};

/// How the player tends to play. Unknown labels are carried through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayStyle {
    Strategist,
    Sprinter,
    Explorer,
    Defender,
    Other(String),
}

impl PlayStyle {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Strategist => "Strategist",
            Self::Sprinter => "Sprinter",
            Self::Explorer => "Explorer",
            Self::Defender => "Defender",
            Self::Other(label) => label.as_str(),
        }
    }
}

impl From<String> for PlayStyle {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "strategist" => Self::Strategist,
            "sprinter" => Self::Sprinter,
            "explorer" => Self::Explorer,
            "defender" => Self::Defender,
            _ => Self::Other(s),
        }
    }
}

impl From<PlayStyle> for String {
    fn from(style: PlayStyle) -> Self {
        style.as_str().to_string()
    }
}

/// Conditions at the moment the player starts a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Local time of day, e.g. "13:00".
    pub time: String,
    /// Weather label, e.g. "Sunny".
    pub weather: String,
    /// Kind of place, e.g. "Park".
    pub location_type: String,
}

/// Immutable caller-supplied description of the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerContext {
    pub player_id: String,
    pub level: u32,
    pub play_style: PlayStyle,
    /// Free-text tag such as "conquered_3_zones".
    pub recent_history: String,
    pub current_conditions: Conditions,
}

impl PlayerContext {
    /// An advanced strategist in a park on a sunny afternoon.
    pub fn sample() -> Self {
        Self {
            player_id: "runner_01".into(),
            level: 8,
            play_style: PlayStyle::Strategist,
            recent_history: "conquered_3_zones".into(),
            current_conditions: Conditions {
                time: "13:00".into(),
                weather: "Sunny".into(),
                location_type: "Park".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_serializes_with_wire_field_names() {
        let value = serde_json::to_value(PlayerContext::sample()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "player_id": "runner_01",
                "level": 8,
                "play_style": "Strategist",
                "recent_history": "conquered_3_zones",
                "current_conditions": {
                    "time": "13:00",
                    "weather": "Sunny",
                    "location_type": "Park"
                }
            })
        );
    }

    #[test]
    fn unknown_play_style_is_preserved() {
        let style: PlayStyle = serde_json::from_str(r#""Night Owl""#).unwrap();
        assert_eq!(style, PlayStyle::Other("Night Owl".into()));
        assert_eq!(serde_json::to_string(&style).unwrap(), r#""Night Owl""#);

        let known: PlayStyle = serde_json::from_str(r#""sprinter""#).unwrap();
        assert_eq!(known, PlayStyle::Sprinter);
    }
}
