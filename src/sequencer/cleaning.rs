//! Cleaning sequencer.
//!
//! Full cycle: wait out the preparation delay (operator swaps bottles for
//! water), then flush every registered pump in id order for the configured
//! flush duration.  The [`CancelToken`] is polled after preparation and
//! before each pump; a flush that has started always finishes.
//!
//! A pump that fails its flush is logged and recorded, and the cycle moves
//! on to the next pump.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::{CleaningState, percent};
use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink};
use crate::error::ActuatorError;
use crate::pumps::{PumpConfig, PumpId, PumpRegistry};
use crate::safety::CancelToken;

/// What a full cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    /// Pumps flushed successfully, in order.
    pub flushed: Vec<PumpId>,
    /// Pumps whose flush failed.
    pub failed: Vec<(PumpId, ActuatorError)>,
    pub cancelled: bool,
}

impl CleaningReport {
    /// Pumps that were attempted, successfully or not.
    pub fn attempted(&self) -> usize {
        self.flushed.len() + self.failed.len()
    }
}

pub struct CleaningSequencer {
    state: CleaningState,
    flush_duration_ms: u32,
    prepare_ms: u32,
}

impl CleaningSequencer {
    pub fn new(flush_duration_ms: u32, prepare_ms: u32) -> Self {
        Self {
            state: CleaningState::Idle,
            flush_duration_ms,
            prepare_ms,
        }
    }

    pub fn state(&self) -> CleaningState {
        self.state
    }

    /// Run the full cycle over every pump in `registry`.
    pub fn run_full(
        &mut self,
        registry: &PumpRegistry,
        actuator: &mut impl ActuatorPort,
        delay: &mut impl DelayNs,
        cancel: &CancelToken,
        sink: &mut impl EventSink,
    ) -> CleaningReport {
        let mut report = CleaningReport::default();
        let total = registry.len() as u32;

        self.transition(CleaningState::Preparing, sink);
        info!(
            "Cleaning: preparing {} pump(s), starting in {} ms",
            total, self.prepare_ms
        );
        delay.delay_ms(self.prepare_ms);

        for (done, pump) in registry.pumps().iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Cleaning: cancelled after {} pump(s)", done);
                report.cancelled = true;
                self.transition(CleaningState::Cancelled, sink);
                return report;
            }

            self.transition(CleaningState::Cleaning { pump: pump.id }, sink);
            match self.flush(pump, actuator) {
                Ok(()) => {
                    report.flushed.push(pump.id);
                    sink.emit(&AppEvent::PumpFlushed {
                        pump: pump.id,
                        percent: percent(done as u32 + 1, total),
                    });
                }
                Err(e) => {
                    warn!("Cleaning: pump {} flush failed ({}), continuing", pump.id, e);
                    report.failed.push((pump.id, e));
                    sink.emit(&AppEvent::FlushFailed {
                        pump: pump.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.transition(CleaningState::Complete, sink);
        info!(
            "Cleaning: complete ({} flushed, {} failed)",
            report.flushed.len(),
            report.failed.len()
        );
        report
    }

    /// Flush a single pump, independent of the full-cycle state.
    pub fn flush_one(
        &self,
        pump: &PumpConfig,
        actuator: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), ActuatorError> {
        self.flush(pump, actuator)?;
        sink.emit(&AppEvent::PumpFlushed {
            pump: pump.id,
            percent: 100,
        });
        Ok(())
    }

    fn flush(&self, pump: &PumpConfig, actuator: &mut impl ActuatorPort) -> Result<(), ActuatorError> {
        debug!("Cleaning: pump {} for {} ms", pump.id, self.flush_duration_ms);
        actuator.activate(pump.id, pump.channel, self.flush_duration_ms)
    }

    fn transition(&mut self, to: CleaningState, sink: &mut impl EventSink) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        sink.emit(&AppEvent::CleaningStateChanged { from, to });
    }
}
