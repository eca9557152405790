//! Availability gate: pre-flight check for a scaled recipe.
//!
//! A recipe with no automatic items is always available.  Otherwise every
//! automatic item needs a pump bound to its ingredient **and** enough of
//! that ingredient in the ledger.  The check is advisory: the dispense
//! sequencer re-checks each item right before it actuates.

use crate::app::ports::{LevelStore, TimePort};
use crate::error::{Error, ValidationError};
use crate::inventory::Ledger;
use crate::pumps::PumpRegistry;
use crate::recipe::ScaledRecipe;

/// Outcome of the gate.  Both lists keep recipe order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    /// Automatic ingredients with no pump bound.
    pub missing_bindings: Vec<String>,
    /// Automatic ingredients below their scaled amount (or never tracked).
    pub insufficient: Vec<String>,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.missing_bindings.is_empty() && self.insufficient.is_empty()
    }

    /// Convert into the error the sequencer reports.  A missing binding
    /// outranks a shortage: refilling cannot fix an unconnected bottle.
    pub fn into_result(self) -> Result<(), Error> {
        if let Some(id) = self.missing_bindings.into_iter().next() {
            return Err(ValidationError::MissingPumpBinding(id).into());
        }
        if !self.insufficient.is_empty() {
            return Err(Error::InsufficientInventory(self.insufficient));
        }
        Ok(())
    }
}

pub fn check<S: LevelStore, C: TimePort>(
    recipe: &ScaledRecipe,
    registry: &PumpRegistry,
    ledger: &Ledger<S, C>,
) -> Availability {
    let mut report = Availability::default();
    for item in recipe.automatic() {
        let id = &item.ingredient_id;
        if registry.binding_for(id).is_none() && !report.missing_bindings.contains(id) {
            report.missing_bindings.push(id.clone());
        }
        // Repeated ingredients are gated on their combined amount.
        let needed: u32 = recipe
            .automatic()
            .filter(|i| &i.ingredient_id == id)
            .map(|i| i.amount_ml)
            .sum();
        if !ledger.check_available(id, needed) && !report.insufficient.contains(id) {
            report.insufficient.push(id.clone());
        }
    }
    report
}
