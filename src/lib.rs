#![forbid(unsafe_code)]

//! # ares-missions
//!
//! Mission contracts for a GPS territory-conquest game, written by a hosted
//! chat model and checked before anyone gets to play them.
//!
//! A request is one straight line: a constant system instruction (plus the
//! player's context, when there is one) goes to a chat-completion endpoint,
//! and whatever comes back is stripped of markdown fences, parsed, and
//! checked against the closed challenge and reward vocabularies. Either a
//! complete [`MissionContract`] comes out, or nothing does.
//!
//! The geometry and scoring that give `COND_*` and `REW_*` their meaning live
//! in the game server, not here.

pub mod config;
pub mod gateway;
pub mod mission;
pub mod pipeline;
pub mod prompts;
pub mod sanitize;

pub use config::{ConfigError, GeneratorConfig};
pub use gateway::{Attribution, ChatGateway, GatewayConfig, ProviderError, ProviderGateway};
pub use mission::{
    ChallengeSpec, ChallengeType, DeliveryMode, MissionContract, PlayerContext, RewardSpec,
    RewardType, TargetValue,
};
pub use pipeline::{MissionError, MissionPipeline, RequestSettings};
pub use sanitize::{parse_mission, strip_fences, ParseError};
