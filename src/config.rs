//! Machine configuration parameters
//!
//! All tunable parameters for the CocktailBot engine.
//! Values can be overridden via NVS (non-volatile storage).

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Maximum number of selectable serving or shot sizes.
pub const MAX_SIZES: usize = 8;

/// Core machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    // --- Ledger defaults ---
    /// Starting fill (mL) for an ingredient the ledger has never seen
    pub default_level_ml: u32,
    /// Bottle capacity (mL) for an ingredient the ledger has never seen
    pub default_capacity_ml: u32,

    // --- Serving ---
    /// Allowed cocktail sizes (mL)
    pub serving_sizes_ml: Vec<u32, MAX_SIZES>,
    /// Allowed single-shot sizes (mL)
    pub shot_sizes_ml: Vec<u32, MAX_SIZES>,

    // --- Pumps ---
    /// Reference pulse length for flow-rate calibration (milliseconds)
    pub calibration_reference_ms: u32,
    /// Flush time per pump during cleaning (milliseconds)
    pub flush_duration_ms: u32,
    /// Pause before the first flush so the operator can place the rinse container
    pub cleaning_prepare_ms: u32,
    /// Upper bound on any single dispense actuation (milliseconds)
    pub max_actuation_ms: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            // Ledger
            default_level_ml: 700,
            default_capacity_ml: 1000,

            // Serving
            serving_sizes_ml: Vec::from_slice(&[200, 300, 400]).unwrap_or_default(),
            shot_sizes_ml: Vec::from_slice(&[20, 40]).unwrap_or_default(),

            // Pumps
            calibration_reference_ms: 2000,
            flush_duration_ms: 10_000,
            cleaning_prepare_ms: 2000,
            max_actuation_ms: 60_000,
        }
    }
}

impl MachineConfig {
    pub fn is_serving_size(&self, ml: u32) -> bool {
        self.serving_sizes_ml.contains(&ml)
    }

    pub fn is_shot_size(&self, ml: u32) -> bool {
        self.shot_sizes_ml.contains(&ml)
    }
}

/// Errors from [`validate_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRangeError(pub &'static str);

impl core::fmt::Display for ConfigRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0)
    }
}

/// Range-check every field before the config is persisted or applied.
pub fn validate_config(cfg: &MachineConfig) -> Result<(), ConfigRangeError> {
    if cfg.default_capacity_ml == 0 {
        return Err(ConfigRangeError("default_capacity_ml must be > 0"));
    }
    if cfg.default_level_ml > cfg.default_capacity_ml {
        return Err(ConfigRangeError(
            "default_level_ml must not exceed default_capacity_ml",
        ));
    }
    if cfg.serving_sizes_ml.is_empty() || cfg.serving_sizes_ml.contains(&0) {
        return Err(ConfigRangeError("serving_sizes_ml must be non-empty and > 0"));
    }
    if cfg.shot_sizes_ml.contains(&0) {
        return Err(ConfigRangeError("shot_sizes_ml must be > 0"));
    }
    if !(100..=30_000).contains(&cfg.calibration_reference_ms) {
        return Err(ConfigRangeError(
            "calibration_reference_ms must be 100–30000",
        ));
    }
    if !(1000..=120_000).contains(&cfg.flush_duration_ms) {
        return Err(ConfigRangeError("flush_duration_ms must be 1000–120000"));
    }
    if cfg.cleaning_prepare_ms > 60_000 {
        return Err(ConfigRangeError("cleaning_prepare_ms must be <= 60000"));
    }
    if !(1000..=300_000).contains(&cfg.max_actuation_ms) {
        return Err(ConfigRangeError("max_actuation_ms must be 1000–300000"));
    }
    Ok(())
}
