//! Actuation sequencers.
//!
//! Each sequencer is a small explicit state machine that borrows the
//! [`MachineContext`] for the duration of one operation and drives pumps
//! strictly one at a time through the
//! [`ActuatorPort`](crate::app::ports::ActuatorPort).
//!
//! ```text
//!  Dispense:  Idle ─▶ Validating ─▶ Executing(0..n) ─▶ Completed
//!                          │               │
//!                          └──────┬────────┘
//!                                 ▼
//!                               Failed
//!
//!  Cleaning:  Idle ─▶ Preparing ─▶ Cleaning(pump) ─▶ Complete
//!                          │            │
//!                          └─────┬──────┘
//!                                ▼
//!                            Cancelled
//! ```
//!
//! Progress is derived only from actuation completions, so what the
//! operator sees never runs ahead of what the pumps did.

pub mod calibration;
pub mod cleaning;
pub mod dispense;

use crate::app::ports::{LevelStore, TimePort};
use crate::inventory::Ledger;
use crate::pumps::PumpRegistry;

/// The state a sequencer borrows: the ledger and the pump registry.
pub struct MachineContext<S: LevelStore, C: TimePort> {
    pub ledger: Ledger<S, C>,
    pub registry: PumpRegistry,
}

impl<S: LevelStore, C: TimePort> MachineContext<S, C> {
    pub fn new(ledger: Ledger<S, C>, registry: PumpRegistry) -> Self {
        Self { ledger, registry }
    }
}

// ---------------------------------------------------------------------------
// State identities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispenseState {
    Idle,
    Validating,
    /// Actuating the automatic item at `index` (0-based, automatic items only).
    Executing { index: usize },
    Completed,
    Failed,
}

impl DispenseState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleaningState {
    Idle,
    Preparing,
    Cleaning { pump: crate::pumps::PumpId },
    Complete,
    Cancelled,
}

/// `round(done / total * 100)`, with an empty total counting as done.
pub(crate) fn percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    ((f64::from(done) / f64::from(total)) * 100.0).round().min(100.0) as u8
}
