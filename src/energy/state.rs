//! Energy snapshot types.

use serde::{Deserialize, Serialize};

/// Lowest battery state of charge the simulation allows, in percent.
pub const SOC_MIN: i32 = 5;
/// Highest battery state of charge the simulation allows, in percent.
pub const SOC_MAX: i32 = 95;
/// Default grid emission factor, kg CO2 per kWh.
pub const DEFAULT_GRID_FACTOR_KG_PER_KWH: f64 = 0.7;

/// A household appliance. The roster is fixed; only `is_on` is user-controlled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appliance {
    /// Stable roster id. Also selects the load profile.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Instantaneous draw, refreshed every tick.
    pub watts: u32,
    /// Energy used today. Never decreases.
    pub kwh_today: f64,
    /// User toggle.
    pub is_on: bool,
}

impl Appliance {
    /// Creates a roster entry.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, watts: u32, kwh_today: f64, is_on: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            watts,
            kwh_today,
            is_on,
        }
    }
}

/// The household roster at start.
#[must_use]
pub fn default_appliances() -> Vec<Appliance> {
    vec![
        Appliance::new("lights", "Lights", 120, 0.35, true),
        Appliance::new("hvac", "HVAC", 850, 4.9, true),
        Appliance::new("fridge", "Fridge", 90, 1.1, true),
        Appliance::new("washer", "Washer", 0, 0.7, false),
        Appliance::new("ev", "EV Charger", 0, 0.0, false),
        Appliance::new("custom", "Custom", 30, 0.2, true),
    ]
}

/// Snapshot of the Energy Simulation Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyState {
    /// Incremented by every committed transition.
    pub revision: u64,
    /// Whether the simulation ticker runs.
    pub connected: bool,
    /// Solar generation, watts.
    pub solar_watts: u32,
    /// Household load, the sum of appliance draws.
    pub house_watts: u32,
    /// Battery charge in percent, always within `[SOC_MIN, SOC_MAX]`.
    pub battery_soc: i32,
    /// Fixed roster, in display order.
    pub appliances: Vec<Appliance>,
}

impl EnergyState {
    /// Disconnected initial state with the default roster.
    #[must_use]
    pub fn new(battery_soc: i32) -> Self {
        Self {
            revision: 0,
            connected: false,
            solar_watts: 0,
            house_watts: 0,
            battery_soc: battery_soc.clamp(SOC_MIN, SOC_MAX),
            appliances: default_appliances(),
        }
    }

    /// Generation minus load. Positive means surplus.
    #[must_use]
    pub fn net_watts(&self) -> i64 {
        i64::from(self.solar_watts) - i64::from(self.house_watts)
    }

    /// Sum of every appliance's energy today.
    #[must_use]
    pub fn total_kwh_today(&self) -> f64 {
        self.appliances.iter().map(|a| a.kwh_today).sum()
    }

    /// Instantaneous share of solar in generation plus load; 0 when both are 0.
    #[must_use]
    pub fn solar_fraction(&self) -> f64 {
        let total = f64::from(self.solar_watts) + f64::from(self.house_watts);
        if total == 0.0 {
            return 0.0;
        }
        f64::from(self.solar_watts) / total
    }

    /// Estimated CO2 avoided today.
    ///
    /// This multiplies the cumulative appliance energy by the *current* solar
    /// share, so it swings with every tick. It is an approximation, not an
    /// integral of solar energy actually used or exported.
    #[must_use]
    pub fn co2_saved_kg_today(&self, grid_factor_kg_per_kwh: f64) -> f64 {
        self.total_kwh_today() * self.solar_fraction() * grid_factor_kg_per_kwh
    }

    /// Roster entry by id.
    #[must_use]
    pub fn appliance(&self, id: &str) -> Option<&Appliance> {
        self.appliances.iter().find(|a| a.id == id)
    }
}
