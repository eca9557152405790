//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A display or MQTT adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::DispenseStateChanged { from, to } => {
                info!("DISPENSE | {:?} -> {:?}", from, to);
            }
            AppEvent::DispenseProgress { percent, status } => {
                info!("DISPENSE | {:>3}% | {}", percent, status);
            }
            AppEvent::DispenseCompleted { cocktail, size_ml } => {
                info!("DISPENSE | done | {} {}ml", cocktail, size_ml);
            }
            AppEvent::DispenseFailed { reason, percent } => {
                warn!("DISPENSE | failed at {}% | {}", percent, reason);
            }
            AppEvent::CleaningStateChanged { from, to } => {
                info!("CLEAN | {:?} -> {:?}", from, to);
            }
            AppEvent::PumpFlushed { pump, percent } => {
                info!("CLEAN | pump={} flushed | {:>3}%", pump, percent);
            }
            AppEvent::FlushFailed { pump, reason } => {
                warn!("CLEAN | pump={} failed | {}", pump, reason);
            }
            AppEvent::CalibrationPulse { pump, duration_ms } => {
                info!("CAL | pump={} pulsed {}ms, awaiting measurement", pump, duration_ms);
            }
            AppEvent::Calibrated {
                pump,
                flow_rate_ml_s,
            } => {
                info!("CAL | pump={} flow={:.2}mL/s", pump, flow_rate_ml_s);
            }
            AppEvent::LevelsRefilled => {
                info!("LEDGER | all ingredients refilled");
            }
            AppEvent::LevelsReset => {
                info!("LEDGER | reset to defaults");
            }
        }
    }
}
