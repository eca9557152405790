//! Pump registry.
//!
//! A fixed-size table of [`PumpConfig`] entries, kept sorted by pump id.
//! The id order is the actuation order for full-cycle operations such as
//! cleaning.  The table is mutated only by calibration (flow rate) and by
//! rebinding (ingredient); its cardinality is set when the machine is
//! built.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::pins;

/// Stable pump identifier (1-based).
pub type PumpId = u8;

/// Maximum number of pumps the manifold can carry.
pub const MAX_PUMPS: usize = 16;

/// Factory flow rate before calibration (mL/s).
pub const DEFAULT_FLOW_RATE_ML_S: f32 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpConfig {
    pub id: PumpId,
    /// Relay channel (GPIO number) driving this pump.
    pub channel: u8,
    /// Ingredient currently connected to the pump inlet.
    pub ingredient: Option<String>,
    /// Calibrated flow rate in mL/s.
    pub flow_rate_ml_s: f32,
}

impl PumpConfig {
    /// Actuation time needed to move `volume_ml` at this pump's flow rate.
    pub fn duration_ms(&self, volume_ml: f32) -> u32 {
        duration_ms(volume_ml, self.flow_rate_ml_s)
    }
}

/// `round(volume / flow_rate * 1000)`.
pub fn duration_ms(volume_ml: f32, flow_rate_ml_s: f32) -> u32 {
    (f64::from(volume_ml) / f64::from(flow_rate_ml_s) * 1000.0).round() as u32
}

pub struct PumpRegistry {
    pumps: Vec<PumpConfig, MAX_PUMPS>,
}

impl PumpRegistry {
    /// Build a registry, sorting by id and rejecting malformed tables.
    pub fn new(pumps: impl IntoIterator<Item = PumpConfig>) -> Result<Self, ValidationError> {
        let mut table: Vec<PumpConfig, MAX_PUMPS> = Vec::new();
        for pump in pumps {
            if pump.id == 0 {
                return Err(ValidationError::InvalidPumpTable("pump id must be > 0"));
            }
            if !(pump.flow_rate_ml_s > 0.0 && pump.flow_rate_ml_s.is_finite()) {
                return Err(ValidationError::InvalidPumpTable("flow rate must be > 0"));
            }
            if table.iter().any(|p| p.id == pump.id) {
                return Err(ValidationError::InvalidPumpTable("duplicate pump id"));
            }
            if table.iter().any(|p| p.channel == pump.channel) {
                return Err(ValidationError::InvalidPumpTable("duplicate channel"));
            }
            table
                .push(pump)
                .map_err(|_| ValidationError::InvalidPumpTable("too many pumps"))?;
        }
        table.sort_unstable_by_key(|p| p.id);
        Ok(Self { pumps: table })
    }

    /// Factory table: one pump per relay channel in [`pins::PUMP_RELAY_GPIOS`],
    /// bound to the ingredients the machine ships with.
    pub fn factory_default() -> Self {
        let pumps = pins::PUMP_RELAY_GPIOS
            .iter()
            .zip(FACTORY_BINDINGS)
            .enumerate()
            .map(|(idx, (&channel, ingredient))| PumpConfig {
                id: idx as PumpId + 1,
                channel,
                ingredient: Some((*ingredient).to_string()),
                flow_rate_ml_s: DEFAULT_FLOW_RATE_ML_S,
            });
        let mut table: Vec<PumpConfig, MAX_PUMPS> = Vec::new();
        for pump in pumps {
            // PUMP_RELAY_GPIOS is shorter than MAX_PUMPS.
            let _ = table.push(pump);
        }
        Self { pumps: table }
    }

    /// All pumps in id order.
    pub fn pumps(&self) -> &[PumpConfig] {
        &self.pumps
    }

    pub fn len(&self) -> usize {
        self.pumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pumps.is_empty()
    }

    pub fn get(&self, id: PumpId) -> Option<&PumpConfig> {
        self.pumps.iter().find(|p| p.id == id)
    }

    /// The pump an ingredient is connected to.  If several pumps carry the
    /// same ingredient, the lowest id wins.
    pub fn binding_for(&self, ingredient_id: &str) -> Option<&PumpConfig> {
        self.pumps
            .iter()
            .find(|p| p.ingredient.as_deref() == Some(ingredient_id))
    }

    /// Ids of every ingredient currently connected to a pump, in pump order.
    pub fn bound_ingredients(&self) -> impl Iterator<Item = &str> {
        self.pumps.iter().filter_map(|p| p.ingredient.as_deref())
    }

    pub fn set_flow_rate(&mut self, id: PumpId, flow_rate_ml_s: f32) -> Result<(), ValidationError> {
        if !(flow_rate_ml_s > 0.0 && flow_rate_ml_s.is_finite()) {
            return Err(ValidationError::InvalidPumpTable("flow rate must be > 0"));
        }
        let pump = self.get_mut(id)?;
        pump.flow_rate_ml_s = flow_rate_ml_s;
        Ok(())
    }

    /// Connect `ingredient` to pump `id` (or disconnect with `None`).
    pub fn rebind(&mut self, id: PumpId, ingredient: Option<String>) -> Result<(), ValidationError> {
        let pump = self.get_mut(id)?;
        pump.ingredient = ingredient;
        Ok(())
    }

    fn get_mut(&mut self, id: PumpId) -> Result<&mut PumpConfig, ValidationError> {
        self.pumps
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ValidationError::UnknownPump(id))
    }
}

/// Ingredients the machine ships with, in pump order.
const FACTORY_BINDINGS: &[&str] = &[
    "vodka",
    "dark-rum",
    "malibu",
    "peach-liqueur",
    "tequila",
    "triple-sec",
    "blue-curacao",
    "gin",
    "lime-juice",
    "grenadine",
    "vanilla-syrup",
    "orange-juice",
    "pineapple-juice",
    "passion-fruit-juice",
    "almond-syrup",
];
