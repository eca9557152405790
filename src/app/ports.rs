//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MachineService (domain)
//! ```
//!
//! Driven adapters (pump relays, event sinks, storage, clocks) implement
//! these traits.  The [`MachineService`](super::service::MachineService)
//! and the sequencers consume them via generics, so the engine never
//! touches hardware or flash directly.
//!
//! ## Contracts
//!
//! - **ActuatorPort** implementations MUST NOT return `Ok` before the
//!   physical window has elapsed, and MUST fail promptly for an unknown
//!   channel.
//! - **LevelStore** / **PumpStore** writes MUST be atomic per record.

use crate::config::MachineConfig;
use crate::error::ActuatorError;
use crate::inventory::IngredientLevel;
use crate::pumps::{PumpConfig, PumpId};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to run a pump.
pub trait ActuatorPort {
    /// Run pump `pump` (wired to `channel`) for `duration_ms`, blocking
    /// until the pump has stopped again.
    fn activate(&mut self, pump: PumpId, channel: u8, duration_ms: u32)
    -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// display, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Usage statistics port (domain → statistics collaborator)
// ───────────────────────────────────────────────────────────────

/// Notified exactly once per cocktail that reached `Completed`.
pub trait UsageSink {
    fn record(&mut self, cocktail_id: &str, cocktail_name: &str);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for refill timestamps.
pub trait TimePort {
    /// Seconds since the Unix epoch (0 if the clock is not set).
    fn now_epoch_secs(&self) -> u64;
}

impl<T: TimePort + ?Sized> TimePort for &T {
    fn now_epoch_secs(&self) -> u64 {
        (**self).now_epoch_secs()
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists machine configuration.
///
/// Implementations MUST validate config values before persisting.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`MachineConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<MachineConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &MachineConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Ledger persistence (domain ↔ KV store keyed by ingredient id)
// ───────────────────────────────────────────────────────────────

pub trait LevelStore {
    /// Every stored level record.  An empty store yields an empty list.
    fn load_levels(&self) -> Result<Vec<IngredientLevel>, StorageError>;

    /// Insert or replace the record for `level.ingredient_id`.
    fn save_level(&self, level: &IngredientLevel) -> Result<(), StorageError>;

    /// Drop every stored record.
    fn clear_levels(&self) -> Result<(), StorageError>;
}

impl<T: LevelStore + ?Sized> LevelStore for &T {
    fn load_levels(&self) -> Result<Vec<IngredientLevel>, StorageError> {
        (**self).load_levels()
    }

    fn save_level(&self, level: &IngredientLevel) -> Result<(), StorageError> {
        (**self).save_level(level)
    }

    fn clear_levels(&self) -> Result<(), StorageError> {
        (**self).clear_levels()
    }
}

// ───────────────────────────────────────────────────────────────
// Pump table persistence
// ───────────────────────────────────────────────────────────────

pub trait PumpStore {
    /// The stored pump table, or [`StorageError::NotFound`] on first boot.
    fn load_pumps(&self) -> Result<Vec<PumpConfig>, StorageError>;

    /// Replace the stored pump table.
    fn save_pumps(&self, pumps: &[PumpConfig]) -> Result<(), StorageError>;
}

impl<T: PumpStore + ?Sized> PumpStore for &T {
    fn load_pumps(&self) -> Result<Vec<PumpConfig>, StorageError> {
        (**self).load_pumps()
    }

    fn save_pumps(&self, pumps: &[PumpConfig]) -> Result<(), StorageError> {
        (**self).save_pumps(pumps)
    }
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for NVS blobs.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

impl<T: StoragePort + ?Sized> StoragePort for &mut T {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        (**self).read(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        (**self).delete(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        (**self).exists(namespace, key)
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Stored blob failed to decode.
    Corrupted,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::Corrupted => write!(f, "stored record corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
