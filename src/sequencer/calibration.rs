//! Pump calibration.
//!
//! 1. The operator picks a pump; [`pulse`] runs it for the reference
//!    duration and returns a [`CalibrationSession`].
//! 2. The operator measures what came out and submits it.
//! 3. [`CalibrationSession::flow_rate`] turns the measurement into mL/s:
//!    `measured / (reference_ms / 1000)`.
//!
//! A rejected measurement leaves the pump's previous flow rate in place;
//! committing the accepted rate is up to the caller.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink};
use crate::error::{ActuatorError, CalibrationError};
use crate::pumps::{PumpConfig, PumpId};

/// A reference pulse that ran and awaits its measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSession {
    pub pump: PumpId,
    pub reference_ms: u32,
}

impl CalibrationSession {
    /// Flow rate for `measured_ml` dispensed by this session's pulse.
    pub fn flow_rate(&self, pump: PumpId, measured_ml: f32) -> Result<f32, CalibrationError> {
        if pump != self.pump {
            return Err(CalibrationError::PumpMismatch {
                expected: self.pump,
                got: pump,
            });
        }
        flow_rate_from_measurement(measured_ml, self.reference_ms)
    }
}

/// Run `pump` for `reference_ms`.
pub fn pulse(
    pump: &PumpConfig,
    reference_ms: u32,
    actuator: &mut impl ActuatorPort,
    sink: &mut impl EventSink,
) -> Result<CalibrationSession, ActuatorError> {
    info!("Calibration: pulsing pump {} for {} ms", pump.id, reference_ms);
    actuator.activate(pump.id, pump.channel, reference_ms)?;
    sink.emit(&AppEvent::CalibrationPulse {
        pump: pump.id,
        duration_ms: reference_ms,
    });
    Ok(CalibrationSession {
        pump: pump.id,
        reference_ms,
    })
}

pub fn flow_rate_from_measurement(measured_ml: f32, reference_ms: u32) -> Result<f32, CalibrationError> {
    // `!(x > 0)` also rejects NaN.
    if !(measured_ml > 0.0) || !measured_ml.is_finite() {
        return Err(CalibrationError::NonPositiveVolume(measured_ml));
    }
    Ok(measured_ml / (reference_ms as f32 / 1000.0))
}
