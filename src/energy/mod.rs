//! Energy Simulation Engine.
//!
//! A fixed household roster, a solar array and a battery, advanced by a
//! one-second tick while connected.

/// Engine handle and commands.
pub mod engine;
/// The tick algorithm and load profiles.
pub mod simulation;
/// Snapshot types and derived values.
pub mod state;

pub use engine::EnergyEngine;
pub use simulation::{load_profile, LoadProfile};
pub use state::{
    default_appliances, Appliance, EnergyState, DEFAULT_GRID_FACTOR_KG_PER_KWH, SOC_MAX, SOC_MIN,
};
