//! Mock adapters for integration tests.
//!
//! Records every actuator call and every emitted event so tests can
//! assert on the full history without touching real relays or flash.

use cocktailbot::adapters::nvs::NvsAdapter;
use cocktailbot::adapters::time::FixedClock;
use cocktailbot::app::events::AppEvent;
use cocktailbot::app::ports::{
    ActuatorPort, EventSink, LevelStore, PumpStore, StorageError, UsageSink,
};
use cocktailbot::app::service::MachineService;
use cocktailbot::config::MachineConfig;
use cocktailbot::error::ActuatorError;
use cocktailbot::inventory::IngredientLevel;
use cocktailbot::pumps::{PumpConfig, PumpId};
use cocktailbot::recipe::{Cocktail, RecipeItem};
use cocktailbot::safety::CancelToken;
use embedded_hal::delay::DelayNs;

// ── Actuator ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub pump: PumpId,
    pub channel: u8,
    pub duration_ms: u32,
}

#[derive(Default)]
pub struct MockActuator {
    pub calls: Vec<Activation>,
    /// Every activation of this pump fails with a timeout.
    pub fail_on: Option<PumpId>,
    /// Trip the token once this many activations succeeded.
    pub cancel_after: Option<(usize, CancelToken)>,
}

#[allow(dead_code)]
impl MockActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(pump: PumpId) -> Self {
        Self {
            fail_on: Some(pump),
            ..Self::default()
        }
    }

    pub fn pumps(&self) -> Vec<PumpId> {
        self.calls.iter().map(|a| a.pump).collect()
    }
}

impl ActuatorPort for MockActuator {
    fn activate(&mut self, pump: PumpId, channel: u8, duration_ms: u32) -> Result<(), ActuatorError> {
        if self.fail_on == Some(pump) {
            return Err(ActuatorError::Timeout(pump));
        }
        self.calls.push(Activation {
            pump,
            channel,
            duration_ms,
        });
        if let Some((n, token)) = &self.cancel_after {
            if self.calls.len() == *n {
                token.cancel();
            }
        }
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::DispenseProgress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Usage ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingUsage {
    pub records: Vec<(String, String)>,
}

impl UsageSink for RecordingUsage {
    fn record(&mut self, cocktail_id: &str, cocktail_name: &str) {
        self.records
            .push((cocktail_id.to_string(), cocktail_name.to_string()));
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Returns immediately, remembering how long it was asked to wait.
#[derive(Default)]
pub struct NoDelay {
    pub total_ms: u32,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ms += ns / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
    }
}

// ── Stores ────────────────────────────────────────────────────

/// Level store whose writes always fail.
pub struct BrokenLevelStore;

impl LevelStore for BrokenLevelStore {
    fn load_levels(&self) -> Result<Vec<IngredientLevel>, StorageError> {
        Err(StorageError::IoError)
    }

    fn save_level(&self, _level: &IngredientLevel) -> Result<(), StorageError> {
        Err(StorageError::Full)
    }

    fn clear_levels(&self) -> Result<(), StorageError> {
        Err(StorageError::IoError)
    }
}

/// Pump store whose writes always fail; reads report an empty flash.
pub struct ReadOnlyPumpStore;

impl PumpStore for ReadOnlyPumpStore {
    fn load_pumps(&self) -> Result<Vec<PumpConfig>, StorageError> {
        Err(StorageError::NotFound)
    }

    fn save_pumps(&self, _pumps: &[PumpConfig]) -> Result<(), StorageError> {
        Err(StorageError::IoError)
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub type TestService<'a> = MachineService<&'a NvsAdapter, FixedClock, &'a NvsAdapter>;

/// Service on the factory pump table with every bound ingredient at 700 ml.
pub fn factory_service(nvs: &NvsAdapter) -> TestService<'_> {
    MachineService::boot(MachineConfig::default(), nvs, FixedClock(1_700_000_000), nvs)
}

/// Service on `count` unbound pumps (ids 1..=count).
#[allow(dead_code)]
pub fn service_with_pumps(nvs: &NvsAdapter, count: u8) -> TestService<'_> {
    let table: Vec<PumpConfig> = (1..=count)
        .map(|id| PumpConfig {
            id,
            channel: id + 3,
            ingredient: None,
            flow_rate_ml_s: 25.0,
        })
        .collect();
    nvs.save_pumps(&table).expect("seed pump table");
    factory_service(nvs)
}

#[allow(dead_code)]
pub fn screwdriver() -> Cocktail {
    Cocktail {
        id: "screwdriver".into(),
        name: "Screwdriver".into(),
        description: String::new(),
        alcoholic: true,
        recipe: vec![
            RecipeItem::automatic("vodka", 40),
            RecipeItem::automatic("orange-juice", 120),
        ],
    }
}

#[allow(dead_code)]
pub fn ice_only() -> Cocktail {
    Cocktail {
        id: "ice".into(),
        name: "Glass of Ice".into(),
        description: String::new(),
        alcoholic: false,
        recipe: vec![RecipeItem::manual("ice", 200, "fill the glass")],
    }
}
