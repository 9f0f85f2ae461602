//! Step & Reward Engine.
//!
//! All commands run under one writer lock: read the current snapshot, build
//! the next one, publish it. Readers go straight to the snapshot cell and
//! never wait on a command.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::StepEngineConfig;
use crate::destination::{DestCategory, Destination, DestinationLookup, StaticDestinations};
use crate::error::{EcoResult, RedeemError};
use crate::geo::is_valid_coordinate;
use crate::snapshot::{SnapshotCell, SnapshotStream};
use crate::ticker::{TickControl, Ticker};

use super::state::{demo_communities, Friend, StepState};

/// Symbols used in redemption codes. I, O, 0 and 1 are left out.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Redemption code length.
pub const CODE_LENGTH: usize = 8;

/// A successful redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    /// Redeemed reward.
    pub reward_id: String,
    /// Issued code.
    pub code: String,
    /// Points debited.
    pub points_debited: u64,
    /// Balance after the debit.
    pub points_remaining: u64,
    /// Snapshot revision that recorded the redemption.
    pub revision: u64,
}

struct StepWriter {
    rng: StdRng,
    ticker: Option<Ticker>,
    next_epoch: u64,
}

struct StepInner {
    config: StepEngineConfig,
    destinations: Arc<dyn DestinationLookup>,
    writer: Mutex<StepWriter>,
    snapshots: SnapshotCell<StepState>,
}

impl StepInner {
    fn lock(&self) -> MutexGuard<'_, StepWriter> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `next` as the successor of `current`. Call with the writer lock held.
    fn commit(&self, current: &StepState, mut next: StepState, op: &'static str) -> Arc<StepState> {
        next.revision = current.revision + 1;
        debug!(
            target: "ecosync::steps",
            op,
            revision = next.revision,
            steps = next.steps_today,
            points = next.points,
            "committed"
        );
        self.snapshots.publish(next)
    }

    fn auto_step(&self, epoch: u64) -> TickControl {
        let mut w = self.lock();
        if w.ticker.as_ref().map(Ticker::epoch) != Some(epoch) {
            return TickControl::Stop;
        }
        let n = w.rng.gen_range(self.config.step_increment.clone());
        let current = self.snapshots.current();
        let mut next = (*current).clone();
        next.add_steps(n);
        self.commit(&current, next, "auto_step");
        TickControl::Continue
    }
}

/// Handle to a Step & Reward Engine. Clones share the same engine.
#[derive(Clone)]
pub struct StepEngine {
    inner: Arc<StepInner>,
}

impl StepEngine {
    /// Creates an engine over the built-in destination table.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: StepEngineConfig) -> EcoResult<Self> {
        Self::with_destinations(config, Arc::new(StaticDestinations::default()))
    }

    /// Creates an engine over a caller-supplied destination lookup.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn with_destinations(config: StepEngineConfig, destinations: Arc<dyn DestinationLookup>) -> EcoResult<Self> {
        config.validate()?;
        let rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let mut initial = StepState::new(config.origin, config.daily_goal_steps);
        initial.rewards.clone_from(&config.rewards);
        let snapshots = SnapshotCell::new("steps", initial, config.stream_capacity);
        Ok(Self {
            inner: Arc::new(StepInner {
                config,
                destinations,
                writer: Mutex::new(StepWriter {
                    rng,
                    ticker: None,
                    next_epoch: 1,
                }),
                snapshots,
            }),
        })
    }

    /// The latest committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<StepState> {
        self.inner.snapshots.current()
    }

    /// Subscribe to every future snapshot, starting with the current one.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotStream<StepState> {
        self.inner.snapshots.subscribe()
    }

    /// Snapshots a slow subscriber missed.
    #[must_use]
    pub fn dropped_snapshots(&self) -> u64 {
        self.inner.snapshots.dropped_snapshots()
    }

    /// Destinations in a category, straight from the lookup.
    #[must_use]
    pub fn destinations(&self, category: DestCategory) -> Vec<Destination> {
        self.inner.destinations.by_category(category)
    }

    /// True while an automatic step ticker is alive.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.inner.lock().ticker.is_some()
    }

    /// Flips automatic stepping. Turning it on starts the ticker if none is
    /// running; turning it off cancels it before returning.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the ticker thread cannot be spawned; the
    /// snapshot is left unchanged.
    pub fn toggle_auto(&self) -> EcoResult<Arc<StepState>> {
        let mut w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let enable = !current.is_auto;

        if enable {
            if w.ticker.is_none() {
                let epoch = w.next_epoch;
                let weak: Weak<StepInner> = Arc::downgrade(&self.inner);
                let ticker = Ticker::spawn("steps", epoch, self.inner.config.tick_interval, move || {
                    weak.upgrade().map_or(TickControl::Stop, |inner| inner.auto_step(epoch))
                })?;
                w.next_epoch += 1;
                w.ticker = Some(ticker);
            }
        } else if let Some(ticker) = w.ticker.take() {
            ticker.stop();
        }

        let mut next = (*current).clone();
        next.is_auto = enable;
        info!(target: "ecosync::steps", is_auto = enable, "auto stepping toggled");
        Ok(self.inner.commit(&current, next, "toggle_auto"))
    }

    /// Adds `n` steps and recomputes distance, CO2, points and goal progress.
    pub fn add_steps(&self, n: u64) -> Arc<StepState> {
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        next.add_steps(n);
        self.inner.commit(&current, next, "add_steps")
    }

    /// Applies one automatic-step increment synchronously.
    pub fn step_once(&self) -> Arc<StepState> {
        let mut w = self.inner.lock();
        let n = w.rng.gen_range(self.inner.config.step_increment.clone());
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        next.add_steps(n);
        self.inner.commit(&current, next, "step_once")
    }

    /// Sets the daily goal; values below 1 are clamped to 1.
    pub fn set_daily_goal(&self, steps: i64) -> Arc<StepState> {
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        next.daily_goal_steps = u64::try_from(steps.max(1)).unwrap_or(1);
        self.inner.commit(&current, next, "set_daily_goal")
    }

    /// Adds a goal for the named destination, or selects it if already tracked.
    /// Unknown names leave the snapshot unchanged.
    pub fn add_or_select_goal_by_name(&self, name: &str) -> Arc<StepState> {
        let Some(dest) = self.inner.destinations.find_by_name(name) else {
            warn!(target: "ecosync::steps", name, "destination not found");
            return self.snapshot();
        };
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        let id = next.add_or_select_goal(name, &dest);
        debug!(target: "ecosync::steps", goal = %id, goals = next.goals.len(), "goal selected");
        self.inner.commit(&current, next, "add_or_select_goal")
    }

    /// Moves the origin and recomputes every goal's target. Progress is kept.
    /// A latitude outside `[-90, 90]` or longitude outside `[-180, 180]`
    /// leaves the snapshot unchanged.
    pub fn set_origin(&self, lat: f64, lon: f64) -> Arc<StepState> {
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        if !is_valid_coordinate(lat, lon) {
            warn!(target: "ecosync::steps", lat, lon, "origin off the globe ignored");
            return current;
        }
        let mut next = (*current).clone();
        next.origin_lat = lat;
        next.origin_lon = lon;
        for goal in &mut next.goals {
            // A goal whose destination vanished from the lookup keeps its old target.
            if let Some(dest) = self.inner.destinations.find_by_name(&goal.name) {
                goal.target_km = dest.target_km(lat, lon);
            }
        }
        self.inner.commit(&current, next, "set_origin")
    }

    /// Selects a tracked goal. Unknown ids are ignored.
    pub fn select_goal(&self, id: &str) -> Arc<StepState> {
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        if current.goal(id).is_none() {
            warn!(target: "ecosync::steps", goal = id, "unknown goal");
            return current;
        }
        let mut next = (*current).clone();
        next.selected_goal_id = Some(id.to_string());
        self.inner.commit(&current, next, "select_goal")
    }

    /// Steps still needed before `points_required` is affordable.
    #[must_use]
    pub fn steps_needed_for_reward(&self, points_required: u64) -> u64 {
        self.snapshot().steps_needed_for_reward(points_required)
    }

    /// True if the current balance covers `points_required`.
    #[must_use]
    pub fn can_redeem(&self, points_required: u64) -> bool {
        self.snapshot().can_redeem(points_required)
    }

    /// Redeems a reward: issues a code, stamps the time and debits the points
    /// in one transition.
    ///
    /// # Errors
    ///
    /// Returns a `RedeemError` for an unknown reward, a reward already
    /// redeemed, or an insufficient balance. The snapshot is unchanged.
    pub fn redeem(&self, id: &str) -> Result<Redemption, RedeemError> {
        let mut w = self.inner.lock();
        let current = self.inner.snapshots.current();

        let refused = match current.reward(id) {
            None => Some(RedeemError::UnknownReward { id: id.to_string() }),
            Some(r) if r.is_redeemed() => Some(RedeemError::AlreadyRedeemed { id: id.to_string() }),
            Some(r) if !current.can_redeem(r.points_required) => Some(RedeemError::InsufficientPoints {
                id: id.to_string(),
                required: r.points_required,
                available: current.points,
            }),
            Some(_) => None,
        };
        if let Some(err) = refused {
            warn!(target: "ecosync::steps", reward = id, error = %err, "redemption refused");
            return Err(err);
        }

        let code = generate_code(&mut w.rng);
        let mut next = (*current).clone();
        let mut debited = 0;
        if let Some(reward) = next.rewards.iter_mut().find(|r| r.id == id) {
            reward.redeemed_at = Some(Utc::now());
            reward.code = Some(code.clone());
            debited = reward.points_required;
        }
        next.debit(debited);

        let committed = self.inner.commit(&current, next, "redeem");
        info!(
            target: "ecosync::steps",
            reward = id,
            points_debited = debited,
            points_remaining = committed.points,
            "reward redeemed"
        );
        Ok(Redemption {
            reward_id: id.to_string(),
            code,
            points_debited: debited,
            points_remaining: committed.points,
            revision: committed.revision,
        })
    }

    /// Credits bonus points, e.g. `SCAN_BONUS_POINTS` for a confirmed scan.
    pub fn add_bonus_points(&self, n: u64) -> Arc<StepState> {
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        next.add_bonus(n);
        self.inner.commit(&current, next, "add_bonus_points")
    }

    /// Appends a friend. Blank names are ignored; negative counts become 0.
    pub fn add_friend(&self, name: &str, steps: i64, points: i64) -> Arc<StepState> {
        let name = name.trim();
        if name.is_empty() {
            return self.snapshot();
        }
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        next.friends.push(Friend::new(
            name,
            u64::try_from(steps).unwrap_or(0),
            u64::try_from(points).unwrap_or(0),
        ));
        self.inner.commit(&current, next, "add_friend")
    }

    /// Replaces the community list with the demo groups.
    pub fn setup_demo_communities(&self) -> Arc<StepState> {
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        next.communities = demo_communities();
        self.inner.commit(&current, next, "setup_demo_communities")
    }
}

impl std::fmt::Debug for StepEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepEngine")
            .field("revision", &self.snapshot().revision)
            .finish_non_exhaustive()
    }
}

fn generate_code(rng: &mut StdRng) -> String {
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect()
}
