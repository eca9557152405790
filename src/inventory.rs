//! Inventory ledger: per-ingredient fill levels.
//!
//! The ledger exclusively owns every [`IngredientLevel`].  It keeps an
//! in-memory map as the authoritative copy and writes each touched record
//! through to a [`LevelStore`] after every mutation.
//!
//! ## Invariant
//!
//! Every mutator keeps `0 <= current_ml <= capacity_ml`.  Volumes are
//! unsigned, so the lower bound is enforced by saturating arithmetic and
//! the upper bound by explicit clamping.
//!
//! ## Persistence failures
//!
//! A failed write is logged and the in-memory state still advances:
//! liquid that has left the bottle must be accounted for even if flash
//! is unavailable.  The next successful write of that record heals it.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{LevelStore, TimePort};
use crate::config::MachineConfig;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLevel {
    pub ingredient_id: String,
    pub current_ml: u32,
    pub capacity_ml: u32,
    /// Epoch seconds of the last refill or manual level change.
    pub last_refill: u64,
}

/// Values for entries the ledger creates on first reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDefaults {
    pub current_ml: u32,
    pub capacity_ml: u32,
}

impl LevelDefaults {
    pub fn from_config(config: &MachineConfig) -> Self {
        Self {
            current_ml: config.default_level_ml,
            capacity_ml: config.default_capacity_ml,
        }
    }
}

impl Default for LevelDefaults {
    fn default() -> Self {
        Self::from_config(&MachineConfig::default())
    }
}

pub struct Ledger<S: LevelStore, C: TimePort> {
    levels: BTreeMap<String, IngredientLevel>,
    store: S,
    clock: C,
    defaults: LevelDefaults,
}

impl<S: LevelStore, C: TimePort> Ledger<S, C> {
    /// Load every stored record.  A store that cannot be read yields an
    /// empty ledger; entries are then recreated lazily.
    pub fn load(store: S, clock: C, defaults: LevelDefaults) -> Self {
        let levels = match store.load_levels() {
            Ok(records) => {
                info!("Ledger: loaded {} level record(s)", records.len());
                records
                    .into_iter()
                    .map(|mut l| {
                        l.current_ml = l.current_ml.min(l.capacity_ml);
                        (l.ingredient_id.clone(), l)
                    })
                    .collect()
            }
            Err(e) => {
                warn!("Ledger: level load failed ({}), starting empty", e);
                BTreeMap::new()
            }
        };
        Self {
            levels,
            store,
            clock,
            defaults,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Existing entry, without creating one.
    pub fn peek(&self, ingredient_id: &str) -> Option<&IngredientLevel> {
        self.levels.get(ingredient_id)
    }

    /// All tracked entries ordered by ingredient id.
    pub fn levels(&self) -> impl Iterator<Item = &IngredientLevel> {
        self.levels.values()
    }

    /// `true` only if the ingredient is already tracked **and** holds at
    /// least `amount_ml`.  Never creates an entry: an ingredient the
    /// ledger has never seen counts as unavailable.
    pub fn check_available(&self, ingredient_id: &str, amount_ml: u32) -> bool {
        self.levels
            .get(ingredient_id)
            .is_some_and(|l| l.current_ml >= amount_ml)
    }

    // ── Mutators ──────────────────────────────────────────────

    /// The entry for `ingredient_id`, created with defaults on first use.
    pub fn level(&mut self, ingredient_id: &str) -> IngredientLevel {
        if let Some(existing) = self.levels.get(ingredient_id) {
            return existing.clone();
        }
        let created = self.default_level(ingredient_id);
        info!(
            "Ledger: tracking '{}' ({}/{} ml)",
            ingredient_id, created.current_ml, created.capacity_ml
        );
        self.commit(created)
    }

    /// Remove `amount_ml`, clamping at zero.  Never fails; the availability
    /// gate is responsible for preventing over-consumption.  An untracked
    /// ingredient is left untracked.
    pub fn consume(&mut self, ingredient_id: &str, amount_ml: u32) {
        let Some(level) = self.levels.get(ingredient_id) else {
            warn!("Ledger: consume of untracked '{}' ignored", ingredient_id);
            return;
        };
        let mut updated = level.clone();
        updated.current_ml = updated.current_ml.saturating_sub(amount_ml);
        self.commit(updated);
    }

    /// Set the fill level outright, optionally changing capacity first.
    /// The new amount is clamped into `[0, capacity]`.
    ///
    /// A capacity of `Some(0)` leaves the capacity unchanged.  A missing
    /// entry is created with capacity `new_capacity` or
    /// `max(new_amount, default capacity)`.
    pub fn set_absolute(
        &mut self,
        ingredient_id: &str,
        new_amount_ml: u32,
        new_capacity_ml: Option<u32>,
    ) -> IngredientLevel {
        let now = self.clock.now_epoch_secs();
        let mut level = match self.levels.get(ingredient_id) {
            Some(l) => l.clone(),
            None => IngredientLevel {
                ingredient_id: ingredient_id.to_string(),
                current_ml: 0,
                capacity_ml: new_amount_ml.max(self.defaults.capacity_ml),
                last_refill: now,
            },
        };
        if let Some(capacity) = new_capacity_ml.filter(|&c| c > 0) {
            level.capacity_ml = capacity;
        }
        level.current_ml = new_amount_ml.min(level.capacity_ml);
        level.last_refill = now;
        self.commit(level)
    }

    /// Change the bottle capacity, clamping the current level into it.
    /// A missing entry is created empty.
    pub fn set_capacity(&mut self, ingredient_id: &str, capacity_ml: u32) -> IngredientLevel {
        let level = match self.levels.get(ingredient_id) {
            Some(l) => IngredientLevel {
                capacity_ml,
                current_ml: l.current_ml.min(capacity_ml),
                ..l.clone()
            },
            None => IngredientLevel {
                ingredient_id: ingredient_id.to_string(),
                current_ml: 0,
                capacity_ml,
                last_refill: self.clock.now_epoch_secs(),
            },
        };
        self.commit(level)
    }

    /// Top up one tracked ingredient by `amount_ml`, capped at capacity.
    pub fn refill(
        &mut self,
        ingredient_id: &str,
        amount_ml: u32,
    ) -> Result<IngredientLevel, ValidationError> {
        let Some(level) = self.levels.get(ingredient_id) else {
            return Err(ValidationError::UnknownIngredient(ingredient_id.to_string()));
        };
        let updated = IngredientLevel {
            current_ml: level.current_ml.saturating_add(amount_ml).min(level.capacity_ml),
            last_refill: self.clock.now_epoch_secs(),
            ..level.clone()
        };
        Ok(self.commit(updated))
    }

    /// Fill every tracked ingredient to capacity.
    pub fn refill_all(&mut self) {
        let now = self.clock.now_epoch_secs();
        let refilled: Vec<IngredientLevel> = self
            .levels
            .values()
            .map(|l| IngredientLevel {
                current_ml: l.capacity_ml,
                last_refill: now,
                ..l.clone()
            })
            .collect();
        info!("Ledger: refilled {} ingredient(s)", refilled.len());
        for level in refilled {
            self.commit(level);
        }
    }

    /// Discard every entry and reseed default levels for `seed` (normally
    /// the ingredients currently bound to pumps).
    pub fn reset_all<'a>(&mut self, seed: impl IntoIterator<Item = &'a str>) {
        if let Err(e) = self.store.clear_levels() {
            warn!("Ledger: clearing stored levels failed ({})", e);
        }
        self.levels.clear();
        for id in seed {
            if !self.levels.contains_key(id) {
                let level = self.default_level(id);
                self.commit(level);
            }
        }
        info!("Ledger: reset to defaults ({} entries)", self.levels.len());
    }

    // ── Internal ──────────────────────────────────────────────

    fn default_level(&self, ingredient_id: &str) -> IngredientLevel {
        IngredientLevel {
            ingredient_id: ingredient_id.to_string(),
            current_ml: self.defaults.current_ml.min(self.defaults.capacity_ml),
            capacity_ml: self.defaults.capacity_ml,
            last_refill: self.clock.now_epoch_secs(),
        }
    }

    /// Write-through: persist then replace the in-memory record.
    fn commit(&mut self, level: IngredientLevel) -> IngredientLevel {
        debug_assert!(level.current_ml <= level.capacity_ml);
        if let Err(e) = self.store.save_level(&level) {
            warn!(
                "Ledger: persisting '{}' failed ({}), keeping in-memory value",
                level.ingredient_id, e
            );
        }
        self.levels.insert(level.ingredient_id.clone(), level.clone());
        level
    }
}
