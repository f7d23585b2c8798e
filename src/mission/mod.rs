//! Mission data model: player context in, mission contract out.

pub mod context;
pub mod types;

pub use context::{Conditions, PlayStyle, PlayerContext};
pub use types::{
    ChallengeSpec, ChallengeType, DeliveryMode, MissionContract, RewardSpec, RewardType,
    ShapeName, TargetValue,
};
