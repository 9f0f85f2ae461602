//! # EcoSync - step rewards and household energy simulation
//!
//! Two independent engines, each owning an immutable snapshot that commands
//! replace atomically:
//!
//! - **Step & Reward Engine**: steps, derived distance/CO2/points, travel
//!   goals to real destinations, and a partner reward catalog.
//! - **Energy Simulation Engine**: a fixed appliance roster, solar output and
//!   a battery, advanced by a one-second tick while connected.
//!
//! Engines are plain handles owned by the caller; there is no global.
//!
//! ## Usage
//!
//! ```rust
//! use ecosync::{EcoResult, StepEngine, StepEngineConfig};
//!
//! fn main() -> EcoResult<()> {
//!     let steps = StepEngine::new(StepEngineConfig::default())?;
//!     steps.add_or_select_goal_by_name("Mars");
//!     let snapshot = steps.add_steps(5_000);
//!     assert_eq!(snapshot.points, 50);
//!     assert_eq!(snapshot.selected_goal().map(|g| g.id.as_str()), Some("mars"));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod destination;
pub mod error;
pub mod geo;
pub mod snapshot;
pub mod ticker;

pub mod energy;
pub mod steps;

pub use config::{EnergyEngineConfig, StepEngineConfig};
pub use destination::{DestCategory, Destination, DestinationLookup, StaticDestinations};
pub use energy::{Appliance, EnergyEngine, EnergyState};
pub use error::{ConfigError, EcoError, EcoResult, RedeemError, RuntimeError};
pub use snapshot::{SnapshotCell, SnapshotStream, SubscriptionId};
pub use steps::{Goal, Redemption, Reward, StepEngine, StepState};
