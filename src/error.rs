//! Unified error types for the CocktailBot engine.
//!
//! A single [`Error`] enum that every subsystem converts into, so the
//! service layer and the console can report failures uniformly.  Each
//! variant names a distinct operator-facing cause: a malformed request,
//! insufficient inventory, a hardware fault, or bad calibration input.

use core::fmt;

use crate::app::ports::StorageError;
use crate::pumps::PumpId;

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible engine operation funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The request is malformed or references something that is not set up.
    /// Raised strictly before any actuation.
    Validation(ValidationError),
    /// One or more automatic ingredients are below the required amount.
    /// Carries the offending ingredient ids. Raised before actuation.
    InsufficientInventory(Vec<String>),
    /// A pump actuation failed.
    Actuator(ActuatorError),
    /// Calibration input was rejected.
    Calibration(CalibrationError),
    /// Another dispense, cleaning cycle or calibration holds the interlock.
    Busy,
    /// Persistence backend failure.
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "invalid request: {e}"),
            Self::InsufficientInventory(ids) => {
                write!(f, "insufficient inventory: {}", ids.join(", "))
            }
            Self::Actuator(e) => write!(f, "hardware fault: {e}"),
            Self::Calibration(e) => write!(f, "calibration rejected: {e}"),
            Self::Busy => write!(f, "machine busy"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Recipe has items but their amounts sum to zero.
    ZeroTotalVolume,
    /// Requested size is not one of the configured serving or shot sizes.
    UnsupportedSize(u32),
    /// An automatic ingredient has no pump bound to it.
    MissingPumpBinding(String),
    /// Ingredient is not tracked by the ledger.
    UnknownIngredient(String),
    /// No pump with this id exists in the registry.
    UnknownPump(PumpId),
    /// Pump table is malformed (duplicate id, zero flow rate, too many pumps).
    InvalidPumpTable(&'static str),
    /// A computed actuation exceeds the configured ceiling.
    ActuationTooLong { pump: PumpId, duration_ms: u32 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroTotalVolume => write!(f, "recipe amounts sum to zero"),
            Self::UnsupportedSize(ml) => write!(f, "unsupported size {ml} ml"),
            Self::MissingPumpBinding(id) => write!(f, "no pump bound to '{id}'"),
            Self::UnknownIngredient(id) => write!(f, "unknown ingredient '{id}'"),
            Self::UnknownPump(id) => write!(f, "unknown pump {id}"),
            Self::InvalidPumpTable(why) => write!(f, "invalid pump table: {why}"),
            Self::ActuationTooLong { pump, duration_ms } => {
                write!(f, "pump {pump} would run {duration_ms} ms")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// No relay is wired to this channel.
    InvalidChannel(u8),
    /// GPIO set failed.
    GpioWriteFailed(u8),
    /// The pump did not report completion in time.
    Timeout(PumpId),
    /// The pump is already running.
    PumpBusy(PumpId),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(ch) => write!(f, "invalid channel {ch}"),
            Self::GpioWriteFailed(ch) => write!(f, "GPIO write failed on channel {ch}"),
            Self::Timeout(id) => write!(f, "pump {id} timed out"),
            Self::PumpBusy(id) => write!(f, "pump {id} already running"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    /// Measured volume was zero, negative or not a number.
    NonPositiveVolume(f32),
    /// The measurement was submitted for a different pump than the pulse ran on.
    PumpMismatch { expected: PumpId, got: PumpId },
    /// A measurement arrived without a preceding reference pulse.
    NoPulse,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveVolume(v) => write!(f, "measured volume must be > 0 (got {v})"),
            Self::PumpMismatch { expected, got } => {
                write!(f, "measurement for pump {got}, but pump {expected} was pulsed")
            }
            Self::NoPulse => write!(f, "no reference pulse has run"),
        }
    }
}

impl std::error::Error for CalibrationError {}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
