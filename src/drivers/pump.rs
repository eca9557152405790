//! Relay-switched pump driver.
//!
//! One GPIO per pump drives a relay (or MOSFET) that switches the pump
//! motor on and off.  The driver is generic over [`OutputPin`] so the
//! same code runs on ESP-IDF `PinDriver`s and on host mocks.
//!
//! Most relay boards are active-low; the polarity is chosen at
//! construction time.
//!
//! ## Safety contract
//!
//! If switching the pump on fails the driver immediately tries to force
//! the pin back to the off level, so a failed start never leaves the
//! motor running.

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Stopped,
    Running,
}

pub struct RelayPump<P: OutputPin> {
    pin: P,
    channel: u8,
    active_low: bool,
    state: PumpState,
}

impl<P: OutputPin> RelayPump<P> {
    /// Wrap `pin` and drive it to the off level.
    pub fn new(pin: P, channel: u8, active_low: bool) -> Result<Self, ActuatorError> {
        let mut pump = Self {
            pin,
            channel,
            active_low,
            state: PumpState::Running,
        };
        pump.stop()?;
        Ok(pump)
    }

    pub fn start(&mut self) -> Result<(), ActuatorError> {
        if let Err(e) = self.write(true) {
            // Best effort: never leave a half-switched relay behind.
            let _ = self.write(false);
            self.state = PumpState::Stopped;
            return Err(e);
        }
        self.state = PumpState::Running;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.write(false)?;
        self.state = PumpState::Stopped;
        Ok(())
    }

    fn write(&mut self, on: bool) -> Result<(), ActuatorError> {
        let high = on != self.active_low;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| ActuatorError::GpioWriteFailed(self.channel))
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PumpState::Running
    }
}
