//! Outbound application events.
//!
//! The sequencers and the [`MachineService`](super::service::MachineService)
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them (log to
//! serial, drive a progress bar).

use crate::pumps::PumpId;
use crate::sequencer::{CleaningState, DispenseState};

/// Structured events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The dispense state machine moved between states.
    DispenseStateChanged { from: DispenseState, to: DispenseState },

    /// Progress after an actuation completed (or the terminal 100%).
    DispenseProgress { percent: u8, status: String },

    /// A serving finished.
    DispenseCompleted { cocktail: String, size_ml: u32 },

    /// A serving stopped before completion.
    DispenseFailed { reason: String, percent: u8 },

    /// The cleaning cycle moved between states.
    CleaningStateChanged { from: CleaningState, to: CleaningState },

    /// One pump finished its flush.
    PumpFlushed { pump: PumpId, percent: u8 },

    /// One pump failed its flush; the cycle continues.
    FlushFailed { pump: PumpId, reason: String },

    /// The calibration reference pulse ran.
    CalibrationPulse { pump: PumpId, duration_ms: u32 },

    /// A new flow rate was accepted and persisted.
    Calibrated { pump: PumpId, flow_rate_ml_s: f32 },

    /// Every tracked ingredient was filled to capacity.
    LevelsRefilled,

    /// The ledger was reset to defaults.
    LevelsReset,
}
