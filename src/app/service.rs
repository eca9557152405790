//! Application service: the hexagonal core.
//!
//! [`MachineService`] owns the [`MachineContext`] (ledger + pump
//! registry), the sequencers, the pump-table store and the machine-wide
//! [`Interlock`].  It exposes a hardware-agnostic API; actuators, event
//! sinks, delays and usage collaborators are injected at call sites, so
//! the whole service runs against mocks on the host.
//!
//! ```text
//!                 ┌──────────────────────────────┐ ──▶ EventSink
//!  ActuatorPort ◀─│        MachineService        │ ──▶ UsageSink
//!                 │ Ledger · Registry · Interlock│
//!  LevelStore  ◀─▶│ Dispense · Cleaning · Cal    │◀─▶ PumpStore
//!                 └──────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::availability::{self, Availability};
use crate::config::MachineConfig;
use crate::error::{CalibrationError, Error, ValidationError};
use crate::inventory::{IngredientLevel, LevelDefaults, Ledger};
use crate::pumps::{PumpConfig, PumpId, PumpRegistry};
use crate::recipe::{Cocktail, RecipeItem, scale};
use crate::safety::{CancelToken, Interlock, InterlockGuard, Operation};
use crate::sequencer::calibration::{self, CalibrationSession};
use crate::sequencer::cleaning::{CleaningReport, CleaningSequencer};
use crate::sequencer::dispense::{
    DispenseFailure, DispenseReport, DispenseRequest, DispenseSequencer,
};
use crate::sequencer::{CleaningState, DispenseState, MachineContext};

use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink, LevelStore, PumpStore, StorageError, TimePort, UsageSink};

// ───────────────────────────────────────────────────────────────
// MachineService
// ───────────────────────────────────────────────────────────────

pub struct MachineService<S: LevelStore, C: TimePort, P: PumpStore> {
    config: MachineConfig,
    ctx: MachineContext<S, C>,
    pump_store: P,
    interlock: Interlock,
    cancel: CancelToken,
    dispense: DispenseSequencer,
    cleaning: CleaningSequencer,
    /// Reference pulse awaiting its measurement.
    calibration: Option<CalibrationSession>,
}

impl<S: LevelStore, C: TimePort, P: PumpStore> MachineService<S, C, P> {
    /// Load the pump table and the ledger.
    ///
    /// A missing or unreadable pump table falls back to the factory
    /// table, which is written back so later boots find it.  Every bound
    /// ingredient the ledger does not know yet is tracked with defaults.
    pub fn boot(config: MachineConfig, level_store: S, clock: C, pump_store: P) -> Self {
        let registry = match pump_store.load_pumps().map(PumpRegistry::new) {
            Ok(Ok(registry)) => {
                info!("MachineService: {} pump(s) loaded", registry.len());
                registry
            }
            Ok(Err(e)) => {
                warn!("MachineService: stored pump table rejected ({}), using factory table", e);
                Self::factory_registry(&pump_store)
            }
            Err(StorageError::NotFound) => {
                info!("MachineService: first boot, writing factory pump table");
                Self::factory_registry(&pump_store)
            }
            Err(e) => {
                warn!("MachineService: pump table unreadable ({}), using factory table", e);
                Self::factory_registry(&pump_store)
            }
        };

        let mut ledger = Ledger::load(level_store, clock, LevelDefaults::from_config(&config));
        for id in registry.bound_ingredients() {
            ledger.level(id);
        }
        let dispense = DispenseSequencer::new(config.max_actuation_ms);
        let cleaning = CleaningSequencer::new(config.flush_duration_ms, config.cleaning_prepare_ms);

        Self {
            config,
            ctx: MachineContext::new(ledger, registry),
            pump_store,
            interlock: Interlock::new(),
            cancel: CancelToken::new(),
            dispense,
            cleaning,
            calibration: None,
        }
    }

    /// Share an interlock with another owner of the same pump manifold.
    pub fn with_interlock(mut self, interlock: Interlock) -> Self {
        self.interlock = interlock;
        self
    }

    /// Take the interlock for `op`.  Any other pump run invalidates a
    /// reference pulse still waiting for its measurement.
    fn claim(
        interlock: &Interlock,
        pending: &mut Option<CalibrationSession>,
        op: Operation,
    ) -> Result<InterlockGuard, Error> {
        let guard = interlock.try_acquire(op)?;
        if op != Operation::Calibration {
            if let Some(session) = pending.take() {
                info!(
                    "MachineService: {:?} discards pending calibration of pump {}",
                    op, session.pump
                );
            }
        }
        Ok(guard)
    }

    fn factory_registry(store: &P) -> PumpRegistry {
        let registry = PumpRegistry::factory_default();
        if let Err(e) = store.save_pumps(registry.pumps()) {
            warn!("MachineService: saving factory pump table failed ({})", e);
        }
        registry
    }

    // ── Dispensing ────────────────────────────────────────────

    /// Pour `cocktail` at one of the configured serving sizes.  The usage
    /// collaborator hears about it only once the sequence completes.
    pub fn make_cocktail(
        &mut self,
        cocktail: &Cocktail,
        size_ml: u32,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        usage: &mut impl UsageSink,
    ) -> Result<DispenseReport, DispenseFailure> {
        if !self.config.is_serving_size(size_ml) {
            return Err(DispenseFailure::before_actuation(
                ValidationError::UnsupportedSize(size_ml).into(),
            ));
        }
        let _guard = Self::claim(&self.interlock, &mut self.calibration, Operation::Dispense)
            .map_err(DispenseFailure::before_actuation)?;

        let request = DispenseRequest {
            label: &cocktail.name,
            items: &cocktail.recipe,
            target_ml: size_ml,
        };
        let report = self.dispense.run(&mut self.ctx, request, actuator, sink)?;
        usage.record(&cocktail.id, &cocktail.name);
        Ok(report)
    }

    /// Pour a single shot of one bound ingredient.
    pub fn make_shot(
        &mut self,
        ingredient_id: &str,
        size_ml: u32,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<DispenseReport, DispenseFailure> {
        if !self.config.is_shot_size(size_ml) {
            return Err(DispenseFailure::before_actuation(
                ValidationError::UnsupportedSize(size_ml).into(),
            ));
        }
        let _guard = Self::claim(&self.interlock, &mut self.calibration, Operation::Shot)
            .map_err(DispenseFailure::before_actuation)?;

        let items = [RecipeItem::automatic(ingredient_id, size_ml)];
        let label = format!("{} shot", ingredient_id);
        let request = DispenseRequest {
            label: &label,
            items: &items,
            target_ml: size_ml,
        };
        self.dispense.run(&mut self.ctx, request, actuator, sink)
    }

    /// Would `cocktail` at `size_ml` pour right now?  Advisory only.
    pub fn check_cocktail(&self, cocktail: &Cocktail, size_ml: u32) -> Result<Availability, Error> {
        let recipe = scale(&cocktail.recipe, size_ml)?;
        Ok(availability::check(&recipe, &self.ctx.registry, &self.ctx.ledger))
    }

    // ── Calibration ───────────────────────────────────────────

    /// Run the reference pulse on `pump`.  The measurement goes to
    /// [`finish_calibration`](Self::finish_calibration).
    pub fn begin_calibration(
        &mut self,
        pump: PumpId,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<CalibrationSession, Error> {
        let config = self
            .ctx
            .registry
            .get(pump)
            .ok_or(ValidationError::UnknownPump(pump))?;
        let _guard = self.interlock.try_acquire(Operation::Calibration)?;
        self.calibration = None;
        let session = calibration::pulse(config, self.config.calibration_reference_ms, actuator, sink)?;
        self.calibration = Some(session);
        Ok(session)
    }

    /// Accept the measured volume for the last pulse.  On rejection the
    /// previous flow rate stays and the pulse may be measured again.
    pub fn finish_calibration(
        &mut self,
        pump: PumpId,
        measured_ml: f32,
        sink: &mut impl EventSink,
    ) -> Result<f32, Error> {
        let session = self.calibration.ok_or(CalibrationError::NoPulse)?;
        let flow_rate = session.flow_rate(pump, measured_ml)?;

        let mut table: Vec<PumpConfig> = self.ctx.registry.pumps().to_vec();
        if let Some(p) = table.iter_mut().find(|p| p.id == pump) {
            p.flow_rate_ml_s = flow_rate;
        }
        self.pump_store.save_pumps(&table)?;
        self.ctx.registry.set_flow_rate(pump, flow_rate)?;
        self.calibration = None;

        info!("MachineService: pump {} calibrated to {:.2} mL/s", pump, flow_rate);
        sink.emit(&AppEvent::Calibrated {
            pump,
            flow_rate_ml_s: flow_rate,
        });
        Ok(flow_rate)
    }

    pub fn pending_calibration(&self) -> Option<CalibrationSession> {
        self.calibration
    }

    // ── Cleaning ──────────────────────────────────────────────

    /// Flush every pump in id order.  Cancel through [`cancel_token`](Self::cancel_token).
    pub fn clean_all(
        &mut self,
        actuator: &mut impl ActuatorPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<CleaningReport, Error> {
        let _guard = Self::claim(&self.interlock, &mut self.calibration, Operation::Cleaning)?;
        self.cancel.reset();
        Ok(self
            .cleaning
            .run_full(&self.ctx.registry, actuator, delay, &self.cancel, sink))
    }

    /// Flush one pump.
    pub fn clean_pump(
        &mut self,
        pump: PumpId,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let config = self
            .ctx
            .registry
            .get(pump)
            .ok_or(ValidationError::UnknownPump(pump))?;
        let _guard = Self::claim(&self.interlock, &mut self.calibration, Operation::Flush)?;
        self.cleaning.flush_one(config, actuator, sink)?;
        Ok(())
    }

    /// Handle for cancelling a running full cleaning cycle from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // ── Inventory ─────────────────────────────────────────────

    pub fn refill(&mut self, ingredient_id: &str, amount_ml: u32) -> Result<IngredientLevel, Error> {
        Ok(self.ctx.ledger.refill(ingredient_id, amount_ml)?)
    }

    pub fn refill_all(&mut self, sink: &mut impl EventSink) {
        self.ctx.ledger.refill_all();
        sink.emit(&AppEvent::LevelsRefilled);
    }

    pub fn set_level(
        &mut self,
        ingredient_id: &str,
        amount_ml: u32,
        capacity_ml: Option<u32>,
    ) -> IngredientLevel {
        self.ctx.ledger.set_absolute(ingredient_id, amount_ml, capacity_ml)
    }

    pub fn set_capacity(&mut self, ingredient_id: &str, capacity_ml: u32) -> IngredientLevel {
        self.ctx.ledger.set_capacity(ingredient_id, capacity_ml)
    }

    /// Reset the ledger to one default entry per bound ingredient.
    pub fn reset_levels(&mut self, sink: &mut impl EventSink) {
        let bound: Vec<String> = self
            .ctx
            .registry
            .bound_ingredients()
            .map(str::to_string)
            .collect();
        self.ctx.ledger.reset_all(bound.iter().map(String::as_str));
        sink.emit(&AppEvent::LevelsReset);
    }

    // ── Pump table ────────────────────────────────────────────

    /// Connect `ingredient` to `pump` (or disconnect with `None`).
    /// Persisted before it takes effect.
    pub fn rebind_pump(&mut self, pump: PumpId, ingredient: Option<String>) -> Result<(), Error> {
        if self.interlock.is_busy() {
            return Err(Error::Busy);
        }
        let mut table: Vec<PumpConfig> = self.ctx.registry.pumps().to_vec();
        let entry = table
            .iter_mut()
            .find(|p| p.id == pump)
            .ok_or(ValidationError::UnknownPump(pump))?;
        entry.ingredient = ingredient.clone();
        self.pump_store.save_pumps(&table)?;
        self.ctx.registry.rebind(pump, ingredient.clone())?;

        match ingredient {
            Some(id) => {
                info!("MachineService: pump {} now carries '{}'", pump, id);
                self.ctx.ledger.level(&id);
            }
            None => info!("MachineService: pump {} unbound", pump),
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PumpRegistry {
        &self.ctx.registry
    }

    pub fn ledger(&self) -> &Ledger<S, C> {
        &self.ctx.ledger
    }

    pub fn levels(&self) -> impl Iterator<Item = &IngredientLevel> {
        self.ctx.ledger.levels()
    }

    pub fn interlock(&self) -> Interlock {
        self.interlock.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.interlock.is_busy()
    }

    pub fn dispense_state(&self) -> DispenseState {
        self.dispense.state()
    }

    pub fn cleaning_state(&self) -> CleaningState {
        self.cleaning.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::nvs::NvsAdapter;
    use crate::adapters::time::FixedClock;

    type Service<'a> = MachineService<&'a NvsAdapter, FixedClock, &'a NvsAdapter>;

    fn boot(nvs: &NvsAdapter) -> Service<'_> {
        MachineService::boot(MachineConfig::default(), nvs, FixedClock(0), nvs)
    }

    #[test]
    fn first_boot_writes_factory_table() {
        let nvs = NvsAdapter::default();
        let svc = boot(&nvs);
        assert_eq!(svc.registry().len(), 15);
        assert_eq!(nvs.load_pumps().unwrap().len(), 15);
    }

    #[test]
    fn rebind_persists_and_tracks_ingredient() {
        let nvs = NvsAdapter::default();
        let mut svc = boot(&nvs);
        svc.rebind_pump(3, Some("mezcal".into())).unwrap();
        assert_eq!(svc.registry().binding_for("mezcal").map(|p| p.id), Some(3));
        assert_eq!(svc.ledger().peek("mezcal").unwrap().current_ml, 700);

        let again = boot(&nvs);
        assert_eq!(again.registry().binding_for("mezcal").map(|p| p.id), Some(3));
        assert!(again.registry().binding_for("malibu").is_none());
    }

    #[test]
    fn finish_without_pulse_is_rejected() {
        struct Quiet;
        impl EventSink for Quiet {
            fn emit(&mut self, _event: &AppEvent) {}
        }
        let nvs = NvsAdapter::default();
        let mut svc = boot(&nvs);
        assert_eq!(
            svc.finish_calibration(1, 50.0, &mut Quiet),
            Err(Error::Calibration(CalibrationError::NoPulse))
        );
    }

    #[test]
    fn check_reports_shortage_without_side_effects() {
        let nvs = NvsAdapter::default();
        let mut svc = boot(&nvs);
        svc.set_level("vodka", 50, None);
        svc.set_level("orange-juice", 700, None);
        let cocktail = Cocktail {
            id: "screwdriver".into(),
            name: "Screwdriver".into(),
            description: String::new(),
            alcoholic: true,
            recipe: vec![
                RecipeItem::automatic("vodka", 40),
                RecipeItem::automatic("orange-juice", 120),
            ],
        };
        let report = svc.check_cocktail(&cocktail, 300).unwrap();
        assert_eq!(report.insufficient, ["vodka"]);
        assert_eq!(svc.ledger().peek("vodka").unwrap().current_ml, 50);
    }
}
