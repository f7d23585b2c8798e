//! Prompt templates for mission generation.
//!
//! The system instruction is constant per delivery mode; the only variable
//! part of a request is the serialized player context.

use crate::gateway::Message;
use crate::mission::{DeliveryMode, PlayerContext};

// =============================================================================
// Prompt templates
// =============================================================================

/// A fixed system instruction.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
}

impl PromptTemplate {
    pub fn for_mode(mode: DeliveryMode) -> Self {
        match mode {
            DeliveryMode::Direct => MISSION_DIRECT,
            DeliveryMode::Email => MISSION_EMAIL,
        }
    }

    /// Assemble the message sequence: system first, then the context if any.
    pub fn render(&self, context: Option<&PlayerContext>) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system.trim())];
        if let Some(ctx) = context {
            messages.push(Message::user(render_context(ctx)));
        }
        messages
    }
}

/// Message sequence for one mission request.
pub fn build_messages(context: Option<&PlayerContext>, mode: DeliveryMode) -> Vec<Message> {
    PromptTemplate::for_mode(mode).render(context)
}

fn render_context(ctx: &PlayerContext) -> String {
    // PlayerContext is plain strings and integers; serialization cannot fail.
    let payload = serde_json::to_string(ctx).unwrap_or_else(|_| "{}".to_string());
    format!("CURRENT PLAYER CONTEXT:\n{payload}")
}

// =============================================================================
// Standard prompts
// =============================================================================

macro_rules! mission_system_prompt {
    ($extra_fields:literal) => {
        concat!(
            r#"
You are the Game Master of a GPS territory game. Players claim real-world zones by walking or running their outline. Write one 'Mission Contract' for the player described in the context.

### RULES:
1. Output valid JSON only. No conversational text, no explanations.
2. Pick exactly ONE challenge type and ONE reward type from the lists below. Vary your picks: do not keep returning the same challenge and reward pair.
3. Balance difficulty: bad weather makes the challenge easier, a high player level makes it harder.

### CHALLENGE TYPES:
- COND_SHAPE: the zone must resemble the shape named in target_value. One of: star, square, circle, triangle, heart.
- COND_AREA: the zone must enclose more than target_value square meters.
- COND_TIME: the zone must be completed in under target_value minutes.
- COND_INTERSECT: the new zone must touch at least target_value existing zones.
- COND_DISTANCE: the new zone must be at least target_value meters away from the player's own zones.

### REWARD TYPES:
- REW_LOCK: the zone cannot be attacked for target_value hours.
- REW_SCORE_MULT: the zone earns points at target_value times the normal rate.
- REW_SHIELD: the zone gets target_value extra defense layers.

### OUTPUT FORMAT:
{
  "mission_name": "Creative Name",
  "flavor_text": "Short, catchy, slightly passive-aggressive encouragement.","#,
            $extra_fields,
            r#"
  "challenge": {
    "type": "ONE_OF_THE_CHALLENGE_TYPES",
    "target_value": 100
  },
  "reward": {
    "type": "ONE_OF_THE_REWARD_TYPES",
    "target_value": 2.0
  }
}
"#
        )
    };
}

pub const MISSION_DIRECT: PromptTemplate = PromptTemplate {
    slug: "mission_direct_v1",
    system: mission_system_prompt!(""),
};

pub const MISSION_EMAIL: PromptTemplate = PromptTemplate {
    slug: "mission_email_v1",
    system: mission_system_prompt!(
        r#"
  "email_header": "Subject line for the mission email",
  "email_text": "Two or three sentences of email body introducing the mission.","#
    ),
};

pub const PROMPTS: &[PromptTemplate] = &[MISSION_DIRECT, MISSION_EMAIL];

pub fn prompt_by_slug(slug: &str) -> Option<PromptTemplate> {
    PROMPTS.iter().find(|t| t.slug == slug).copied()
}

// =============================================================================
// TESTS
// =============================================================================
