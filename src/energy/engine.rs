//! Energy Simulation Engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::EnergyEngineConfig;
use crate::error::EcoResult;
use crate::snapshot::{SnapshotCell, SnapshotStream};
use crate::ticker::{TickControl, Ticker};

use super::simulation;
use super::state::EnergyState;

struct EnergyWriter {
    rng: StdRng,
    ticker: Option<Ticker>,
    next_epoch: u64,
}

struct EnergyInner {
    config: EnergyEngineConfig,
    writer: Mutex<EnergyWriter>,
    snapshots: SnapshotCell<EnergyState>,
}

impl EnergyInner {
    fn lock(&self) -> MutexGuard<'_, EnergyWriter> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, current: &EnergyState, mut next: EnergyState, op: &'static str) -> Arc<EnergyState> {
        next.revision = current.revision + 1;
        debug!(
            target: "ecosync::energy",
            op,
            revision = next.revision,
            solar_watts = next.solar_watts,
            house_watts = next.house_watts,
            battery_soc = next.battery_soc,
            "committed"
        );
        self.snapshots.publish(next)
    }

    fn tick_locked(&self, w: &mut EnergyWriter, op: &'static str) -> Arc<EnergyState> {
        let current = self.snapshots.current();
        let mut next = (*current).clone();
        simulation::tick(&mut next, &mut w.rng);
        self.commit(&current, next, op)
    }

    fn scheduled_tick(&self, epoch: u64) -> TickControl {
        let mut w = self.lock();
        // A disconnect (or reconnect) since this thread started retires it.
        if w.ticker.as_ref().map(Ticker::epoch) != Some(epoch) {
            return TickControl::Stop;
        }
        self.tick_locked(&mut w, "tick");
        TickControl::Continue
    }
}

/// Handle to an Energy Simulation Engine. Clones share the same engine.
#[derive(Clone)]
pub struct EnergyEngine {
    inner: Arc<EnergyInner>,
}

impl EnergyEngine {
    /// Creates a disconnected engine with the default roster.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: EnergyEngineConfig) -> EcoResult<Self> {
        config.validate()?;
        let rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let snapshots = SnapshotCell::new("energy", EnergyState::new(config.initial_battery_soc), config.stream_capacity);
        Ok(Self {
            inner: Arc::new(EnergyInner {
                config,
                writer: Mutex::new(EnergyWriter {
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
    pub fn snapshot(&self) -> Arc<EnergyState> {
        self.inner.snapshots.current()
    }

    /// Subscribe to every future snapshot, starting with the current one.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotStream<EnergyState> {
        self.inner.snapshots.subscribe()
    }

    /// Snapshots a slow subscriber missed.
    #[must_use]
    pub fn dropped_snapshots(&self) -> u64 {
        self.inner.snapshots.dropped_snapshots()
    }

    /// True while a simulation ticker is alive.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.inner.lock().ticker.is_some()
    }

    /// Starts the simulation. Calling it while connected changes nothing and
    /// returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the ticker thread cannot be spawned; the
    /// engine stays disconnected.
    pub fn connect(&self) -> EcoResult<Arc<EnergyState>> {
        let mut w = self.inner.lock();
        let current = self.inner.snapshots.current();
        if current.connected && w.ticker.is_some() {
            return Ok(current);
        }

        let epoch = w.next_epoch;
        let weak: Weak<EnergyInner> = Arc::downgrade(&self.inner);
        let ticker = Ticker::spawn("energy", epoch, self.inner.config.tick_interval, move || {
            weak.upgrade().map_or(TickControl::Stop, |inner| inner.scheduled_tick(epoch))
        })?;
        w.next_epoch += 1;
        w.ticker = Some(ticker);

        let mut next = (*current).clone();
        next.connected = true;
        info!(target: "ecosync::energy", epoch, "connected");
        Ok(self.inner.commit(&current, next, "connect"))
    }

    /// Stops the simulation. No tick is applied after this returns.
    pub fn disconnect(&self) -> Arc<EnergyState> {
        let mut w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let stopped = w.ticker.take().map(Ticker::stop).is_some();
        if !current.connected {
            return current;
        }
        let mut next = (*current).clone();
        next.connected = false;
        info!(target: "ecosync::energy", stopped, "disconnected");
        self.inner.commit(&current, next, "disconnect")
    }

    /// Flips an appliance's switch. Unknown ids leave the snapshot unchanged.
    /// The new draw shows up on the next tick.
    pub fn toggle(&self, appliance_id: &str) -> Arc<EnergyState> {
        let _w = self.inner.lock();
        let current = self.inner.snapshots.current();
        let mut next = (*current).clone();
        let Some(appliance) = next.appliances.iter_mut().find(|a| a.id == appliance_id) else {
            warn!(target: "ecosync::energy", appliance = appliance_id, "unknown appliance");
            return current;
        };
        appliance.is_on = !appliance.is_on;
        debug!(target: "ecosync::energy", appliance = appliance_id, is_on = appliance.is_on, "appliance toggled");
        self.inner.commit(&current, next, "toggle")
    }

    /// Applies exactly one tick now, connected or not.
    pub fn step_once(&self) -> Arc<EnergyState> {
        let mut w = self.inner.lock();
        self.inner.tick_locked(&mut w, "step_once")
    }

    /// Generation minus load in the current snapshot.
    #[must_use]
    pub fn net_watts(&self) -> i64 {
        self.snapshot().net_watts()
    }

    /// See [`EnergyState::co2_saved_kg_today`].
    #[must_use]
    pub fn co2_saved_kg_today(&self, grid_factor_kg_per_kwh: f64) -> f64 {
        self.snapshot().co2_saved_kg_today(grid_factor_kg_per_kwh)
    }
}

impl std::fmt::Debug for EnergyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.snapshot();
        f.debug_struct("EnergyEngine")
            .field("revision", &s.revision)
            .field("connected", &s.connected)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::energy::state::{SOC_MAX, SOC_MIN};

    fn engine(interval: Duration) -> EnergyEngine {
        EnergyEngine::new(EnergyEngineConfig {
            tick_interval: interval,
            seed: Some(21),
            ..EnergyEngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn toggle_flips_and_unknown_is_no_op() {
        let engine = engine(Duration::from_secs(1));
        let s = engine.toggle("washer");
        assert!(s.appliance("washer").unwrap().is_on);
        assert_eq!(s.revision, 1);

        let before = engine.snapshot();
        assert!(Arc::ptr_eq(&before, &engine.toggle("jacuzzi")));
    }

    #[test]
    fn toggled_on_appliance_draws_on_range_after_one_tick() {
        // hvac starts on, so two flips leave it off and then on again.
        let engine = engine(Duration::from_secs(1));
        engine.toggle("hvac");
        let off = engine.step_once();
        assert_eq!(off.appliance("hvac").unwrap().watts, 10);

        engine.toggle("hvac");
        let on = engine.step_once();
        let watts = on.appliance("hvac").unwrap().watts;
        assert!((620..880).contains(&watts), "got {watts}");
    }

    #[test]
    fn step_once_works_while_disconnected() {
        let engine = engine(Duration::from_secs(1));
        let s = engine.step_once();
        assert!(!s.connected);
        assert!(s.solar_watts <= 4200);
        assert_eq!(s.house_watts, s.appliances.iter().map(|a| a.watts).sum::<u32>());
        assert_eq!(engine.net_watts(), s.net_watts());
        assert!((SOC_MIN..=SOC_MAX).contains(&s.battery_soc));
    }

    #[test]
    fn connect_is_idempotent_and_disconnect_stops_ticks() {
        let engine = engine(Duration::from_millis(5));
        let first = engine.connect().unwrap();
        let second = engine.connect().unwrap();
        assert!(first.connected);
        assert!(second.connected);
        assert!(engine.is_ticking());

        std::thread::sleep(Duration::from_millis(40));
        let off = engine.disconnect();
        assert!(!off.connected);
        assert!(!engine.is_ticking());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.snapshot().revision, off.revision);

        let again = engine.disconnect();
        assert!(Arc::ptr_eq(&off, &again));
    }

    #[test]
    fn co2_saved_matches_snapshot() {
        let engine = engine(Duration::from_secs(1));
        engine.step_once();
        let s = engine.snapshot();
        assert_eq!(engine.co2_saved_kg_today(0.7), s.co2_saved_kg_today(0.7));
        assert!(engine.co2_saved_kg_today(0.7) > 0.0);
    }
}
