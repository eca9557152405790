//! Dispense sequencer.
//!
//! Drives one serving through `Idle → Validating → Executing(i) →
//! Completed | Failed`.  Validation failures leave no side effects.  An
//! actuator failure mid-run stops the sequence where it is: consumption
//! already committed for earlier items stands and the failure carries the
//! progress reached.

use core::fmt;

use log::{debug, error, info, warn};

use super::{DispenseState, MachineContext, percent};
use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink, LevelStore, TimePort};
use crate::availability;
use crate::error::{Error, ValidationError};
use crate::recipe::{RecipeItem, ScaledRecipe, scale};

/// One serving to pour.
#[derive(Debug, Clone, Copy)]
pub struct DispenseRequest<'a> {
    /// Display name used in status strings ("Screwdriver", "vodka shot").
    pub label: &'a str,
    pub items: &'a [RecipeItem],
    pub target_ml: u32,
}

/// Outcome of a sequence that reached `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct DispenseReport {
    pub recipe: ScaledRecipe,
    /// Number of pump actuations performed.
    pub actuations: usize,
    pub dispensed_ml: u32,
    pub status: String,
}

/// Outcome of a sequence that reached `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub struct DispenseFailure {
    pub error: Error,
    /// Percentage of the automatic volume dispensed before the failure.
    pub progress: u8,
    /// Automatic items fully dispensed (and consumed) before the failure.
    pub items_completed: usize,
}

impl DispenseFailure {
    pub(crate) fn before_actuation(error: Error) -> Self {
        Self {
            error,
            progress: 0,
            items_completed: 0,
        }
    }
}

impl fmt::Display for DispenseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items_completed == 0 {
            write!(f, "{}", self.error)
        } else {
            write!(
                f,
                "{} after {} item(s), {}% dispensed",
                self.error, self.items_completed, self.progress
            )
        }
    }
}

impl std::error::Error for DispenseFailure {}

impl From<DispenseFailure> for Error {
    fn from(f: DispenseFailure) -> Self {
        f.error
    }
}

pub struct DispenseSequencer {
    state: DispenseState,
    max_actuation_ms: u32,
}

impl DispenseSequencer {
    pub fn new(max_actuation_ms: u32) -> Self {
        Self {
            state: DispenseState::Idle,
            max_actuation_ms,
        }
    }

    pub fn state(&self) -> DispenseState {
        self.state
    }

    /// Run one dispense to a terminal state.
    ///
    /// Pumps are actuated strictly one after another; each
    /// [`ActuatorPort::activate`] call returns only once its pump has
    /// stopped.
    pub fn run<S: LevelStore, C: TimePort>(
        &mut self,
        ctx: &mut MachineContext<S, C>,
        request: DispenseRequest<'_>,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<DispenseReport, DispenseFailure> {
        self.transition(DispenseState::Validating, sink);

        let recipe = match self.validate(ctx, &request) {
            Ok(r) => r,
            Err(e) => return Err(self.fail(DispenseFailure::before_actuation(e), sink)),
        };

        let total = recipe.total_automatic_ml();
        let mut dispensed: u32 = 0;
        let mut actuations = 0usize;

        for (index, item) in recipe.automatic().enumerate() {
            self.transition(DispenseState::Executing { index }, sink);
            let progress = percent(dispensed, total);
            let fail = |error: Error| DispenseFailure {
                error,
                progress,
                items_completed: index,
            };

            // Ledger and bindings may have changed since the gate ran.
            let Some(pump) = ctx.registry.binding_for(&item.ingredient_id) else {
                let e = ValidationError::MissingPumpBinding(item.ingredient_id.clone());
                return Err(self.fail(fail(e.into()), sink));
            };
            if !ctx.ledger.check_available(&item.ingredient_id, item.amount_ml) {
                let e = Error::InsufficientInventory(vec![item.ingredient_id.clone()]);
                return Err(self.fail(fail(e), sink));
            }

            let duration_ms = pump.duration_ms(item.amount_ml as f32);
            if duration_ms > 0 {
                debug!(
                    "Dispense: pump {} ({}) {} ml for {} ms",
                    pump.id, item.ingredient_id, item.amount_ml, duration_ms
                );
                if let Err(e) = actuator.activate(pump.id, pump.channel, duration_ms) {
                    error!("Dispense: pump {} failed: {}", pump.id, e);
                    return Err(self.fail(fail(e.into()), sink));
                }
                actuations += 1;
            }

            ctx.ledger.consume(&item.ingredient_id, item.amount_ml);
            dispensed += item.amount_ml;
            sink.emit(&AppEvent::DispenseProgress {
                percent: percent(dispensed, total),
                status: format!("Dispensing {}...", item.ingredient_id),
            });
        }

        let status = format!("{} ({} ml) ready", request.label, request.target_ml);
        self.transition(DispenseState::Completed, sink);
        sink.emit(&AppEvent::DispenseProgress {
            percent: 100,
            status: status.clone(),
        });
        sink.emit(&AppEvent::DispenseCompleted {
            cocktail: request.label.to_string(),
            size_ml: request.target_ml,
        });
        info!("Dispense: {}", status);

        Ok(DispenseReport {
            recipe,
            actuations,
            dispensed_ml: dispensed,
            status,
        })
    }

    fn validate<S: LevelStore, C: TimePort>(
        &self,
        ctx: &MachineContext<S, C>,
        request: &DispenseRequest<'_>,
    ) -> Result<ScaledRecipe, Error> {
        let recipe = scale(request.items, request.target_ml)?;
        if recipe.has_automatic() {
            availability::check(&recipe, &ctx.registry, &ctx.ledger).into_result()?;
        }
        // The registry cannot change during the run, so every duration is
        // known before the first pump starts.
        for item in recipe.automatic() {
            let pump = ctx
                .registry
                .binding_for(&item.ingredient_id)
                .ok_or_else(|| ValidationError::MissingPumpBinding(item.ingredient_id.clone()))?;
            let duration_ms = pump.duration_ms(item.amount_ml as f32);
            if duration_ms > self.max_actuation_ms {
                return Err(ValidationError::ActuationTooLong {
                    pump: pump.id,
                    duration_ms,
                }
                .into());
            }
        }
        Ok(recipe)
    }

    fn fail(&mut self, failure: DispenseFailure, sink: &mut impl EventSink) -> DispenseFailure {
        warn!("Dispense failed: {}", failure);
        self.transition(DispenseState::Failed, sink);
        sink.emit(&AppEvent::DispenseFailed {
            reason: failure.error.to_string(),
            percent: failure.progress,
        });
        failure
    }

    fn transition(&mut self, to: DispenseState, sink: &mut impl EventSink) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!("Dispense: {:?} -> {:?}", from, to);
        self.state = to;
        sink.emit(&AppEvent::DispenseStateChanged { from, to });
    }
}
