//! Step & Reward snapshot types.
//!
//! `StepState` is immutable once published. The engine clones it, applies
//! one command to the clone, and publishes the result; the methods here are
//! the pure pieces of those transitions.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::destination::Destination;

/// Average stride length.
pub const STRIDE_METERS: f64 = 0.78;
/// CO2 avoided per kilometer walked instead of driven.
pub const CO2_KG_PER_KM: f64 = 0.192;
/// Steps that earn one point.
pub const STEPS_PER_POINT: u64 = 100;
/// Rough energy cost of one step.
pub const CALORIES_PER_STEP: f64 = 0.04;
/// Points awarded when an external scan is confirmed.
pub const SCAN_BONUS_POINTS: u64 = 2;

/// A travel target. Every goal shares the same traveler, so `progress_km`
/// is the engine's current distance for all goals at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Derived from the name, see [`goal_id`].
    pub id: String,
    /// Destination name.
    pub name: String,
    /// Whole kilometers to the destination.
    pub target_km: u64,
    /// Distance walked so far.
    pub progress_km: f64,
}

impl Goal {
    /// Progress as a fraction in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.target_km == 0 {
            return 1.0;
        }
        (self.progress_km / self.target_km as f64).clamp(0.0, 1.0)
    }
}

/// Goal id for a destination name: lower-cased, spaces replaced by underscores.
///
/// # Examples
///
/// ```
/// assert_eq!(ecosync::steps::goal_id("France (Paris)"), "france_(paris)");
/// ```
#[must_use]
pub fn goal_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// A partner reward. Redemption happens at most once.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub points_required: u64,
    pub partner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Reward {
    /// Creates an unredeemed reward.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        points_required: u64,
        partner: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            points_required,
            partner: partner.into(),
            redeemed_at: None,
            code: None,
        }
    }

    /// True once a code has been issued.
    #[must_use]
    pub const fn is_redeemed(&self) -> bool {
        self.redeemed_at.is_some()
    }
}

/// Leaderboard entry.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub name: String,
    pub steps: u64,
    pub points: u64,
}

impl Friend {
    /// Creates a leaderboard entry.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: u64, points: u64) -> Self {
        Self {
            name: name.into(),
            steps,
            points,
        }
    }
}

/// A named group of friends.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub members: Vec<Friend>,
}

impl Community {
    /// Members ordered by steps, then points, both descending.
    #[must_use]
    pub fn ranked_members(&self) -> Vec<Friend> {
        ranked(&self.members)
    }
}

fn ranked(friends: &[Friend]) -> Vec<Friend> {
    let mut out = friends.to_vec();
    // Stable, so ties keep insertion order.
    out.sort_by_key(|f| (Reverse(f.steps), Reverse(f.points)));
    out
}

/// Snapshot of the Step & Reward Engine.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    /// Incremented by every committed transition.
    pub revision: u64,
    pub steps_today: u64,
    /// Whether the automatic step ticker is running.
    pub is_auto: bool,
    pub km: f64,
    pub co2_kg: f64,
    /// Spendable balance: step-earned + bonus - redeemed.
    pub points: u64,
    /// Cumulative bonus credits.
    pub bonus_points: u64,
    /// Cumulative redemption debits.
    pub redeemed_points: u64,
    pub daily_goal_steps: u64,
    pub origin_lat: f64,
    pub origin_lon: f64,
    /// Creation order.
    pub goals: Vec<Goal>,
    pub selected_goal_id: Option<String>,
    pub rewards: Vec<Reward>,
    pub friends: Vec<Friend>,
    pub communities: Vec<Community>,
}

impl StepState {
    /// Initial state with the seeded reward catalog and friend list.
    #[must_use]
    pub fn new(origin: (f64, f64), daily_goal_steps: u64) -> Self {
        Self {
            revision: 0,
            steps_today: 0,
            is_auto: false,
            km: 0.0,
            co2_kg: 0.0,
            points: 0,
            bonus_points: 0,
            redeemed_points: 0,
            daily_goal_steps: daily_goal_steps.max(1),
            origin_lat: origin.0,
            origin_lon: origin.1,
            goals: Vec::new(),
            selected_goal_id: None,
            rewards: default_rewards(),
            friends: default_friends(),
            communities: Vec::new(),
        }
    }

    /// Points earned from steps alone.
    #[must_use]
    pub const fn step_points(&self) -> u64 {
        self.steps_today / STEPS_PER_POINT
    }

    /// Fraction of the daily goal reached, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn daily_progress(&self) -> f64 {
        (self.steps_today as f64 / self.daily_goal_steps.max(1) as f64).clamp(0.0, 1.0)
    }

    /// Estimated kcal burned today.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn calories_burned(&self) -> f64 {
        self.steps_today as f64 * CALORIES_PER_STEP
    }

    /// Steps still needed before `points_required` is affordable.
    #[must_use]
    pub const fn steps_needed_for_reward(&self, points_required: u64) -> u64 {
        points_required.saturating_sub(self.points).saturating_mul(STEPS_PER_POINT)
    }

    /// True if the balance covers `points_required`.
    #[must_use]
    pub const fn can_redeem(&self, points_required: u64) -> bool {
        self.points >= points_required
    }

    /// Tracked goal by id.
    #[must_use]
    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    /// The selected goal, if any.
    #[must_use]
    pub fn selected_goal(&self) -> Option<&Goal> {
        self.selected_goal_id.as_deref().and_then(|id| self.goal(id))
    }

    /// Catalog entry by id.
    #[must_use]
    pub fn reward(&self, id: &str) -> Option<&Reward> {
        self.rewards.iter().find(|r| r.id == id)
    }

    /// Friends ordered by steps, then points, both descending.
    #[must_use]
    pub fn leaderboard(&self) -> Vec<Friend> {
        ranked(&self.friends)
    }

    /// Adds steps and recomputes every derived value.
    pub(crate) fn add_steps(&mut self, n: u64) {
        self.steps_today = self.steps_today.saturating_add(n);
        self.recompute();
    }

    pub(crate) fn add_bonus(&mut self, n: u64) {
        self.bonus_points = self.bonus_points.saturating_add(n);
        self.recompute();
    }

    /// Debits a redemption. The caller has already checked the balance.
    pub(crate) fn debit(&mut self, n: u64) {
        self.redeemed_points = self.redeemed_points.saturating_add(n);
        self.recompute();
    }

    #[allow(clippy::cast_precision_loss)]
    fn recompute(&mut self) {
        self.km = self.steps_today as f64 * STRIDE_METERS / 1000.0;
        self.co2_kg = self.km * CO2_KG_PER_KM;
        self.points = self
            .step_points()
            .saturating_add(self.bonus_points)
            .saturating_sub(self.redeemed_points);
        for goal in &mut self.goals {
            goal.progress_km = self.km;
        }
    }

    /// Appends a goal named `name` unless one with the same id exists, then
    /// selects it. The id and name come from the queried name, not from
    /// `dest.name`, so a lookup that normalizes names cannot split goals.
    pub(crate) fn add_or_select_goal(&mut self, name: &str, dest: &Destination) -> String {
        let id = goal_id(name);
        if self.goal(&id).is_none() {
            self.goals.push(Goal {
                id: id.clone(),
                name: name.to_string(),
                target_km: dest.target_km(self.origin_lat, self.origin_lon),
                progress_km: self.km,
            });
        }
        self.selected_goal_id = Some(id.clone());
        id
    }
}

/// Seeded partner rewards.
#[must_use]
pub fn default_rewards() -> Vec<Reward> {
    vec![
        Reward::new("bus10", "Ten percent off Bus pass", 1200, "City Transit"),
        Reward::new("tree1", "Plant one tree", 2000, "GreenEarth"),
        Reward::new("cafe5", "5 % off on any Small Latte", 500, "Local Cafe"),
    ]
}

/// Seeded friend list.
#[must_use]
pub fn default_friends() -> Vec<Friend> {
    vec![
        Friend::new("Mustafa", 9800, 120),
        Friend::new("Aisha", 8600, 105),
        Friend::new("Leo", 7400, 92),
    ]
}

/// Demo communities installed by `setup_demo_communities`.
#[must_use]
pub fn demo_communities() -> Vec<Community> {
    vec![
        Community {
            id: "uc_staff".to_string(),
            name: "UC Teaching Staff".to_string(),
            members: vec![
                Friend::new("Mustafa", 9800, 120),
                Friend::new("Dr. Kim", 11250, 140),
                Friend::new("Sophie", 9050, 118),
                Friend::new("Arjun", 7800, 100),
            ],
        },
        Community {
            id: "kpmg_account".to_string(),
            name: "KPMG Account team".to_string(),
            members: vec![
                Friend::new("Zara", 10100, 132),
                Friend::new("Mateo", 9600, 125),
                Friend::new("Priya", 8800, 110),
            ],
        },
    ]
}
