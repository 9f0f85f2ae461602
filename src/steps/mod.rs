//! Step & Reward Engine.
//!
//! Steps are the only input that moves distance, CO2 and earned points.
//! Goals are journeys to destinations sharing one traveler's distance.
//! Points are spent on partner rewards, each redeemable once.

/// Engine handle and commands.
pub mod engine;
/// Snapshot types and derived values.
pub mod state;

pub use engine::{Redemption, StepEngine, CODE_ALPHABET, CODE_LENGTH};
pub use state::{
    default_rewards, goal_id, Community, Friend, Goal, Reward, StepState, CALORIES_PER_STEP,
    CO2_KG_PER_KM, SCAN_BONUS_POINTS, STEPS_PER_POINT, STRIDE_METERS,
};
