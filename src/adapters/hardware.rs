//! Hardware adapter: bridges the relay bank to [`ActuatorPort`].
//!
//! Owns one [`RelayPump`] per wired channel plus a blocking delay.  This
//! is the only module in the system that touches pump GPIOs.  On device
//! the pins are ESP-IDF `PinDriver`s and the delay is `FreeRtos`; tests
//! substitute mock pins and a no-op delay.
//!
//! `activate` switches the relay on, blocks for the full window, then
//! switches it off, so the call returns only once the pump has stopped.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use heapless::Vec;
use log::{debug, error};

use crate::app::ports::ActuatorPort;
use crate::drivers::pump::RelayPump;
use crate::error::ActuatorError;
use crate::pumps::{MAX_PUMPS, PumpId};

pub struct HardwareAdapter<P: OutputPin, D: DelayNs> {
    relays: Vec<RelayPump<P>, MAX_PUMPS>,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> HardwareAdapter<P, D> {
    /// Build from `(channel, pin)` pairs; every relay starts switched off.
    pub fn new(
        pins: impl IntoIterator<Item = (u8, P)>,
        active_low: bool,
        delay: D,
    ) -> Result<Self, ActuatorError> {
        let mut relays = Vec::new();
        for (channel, pin) in pins {
            let relay = RelayPump::new(pin, channel, active_low)?;
            relays
                .push(relay)
                .map_err(|_| ActuatorError::InvalidChannel(channel))?;
        }
        Ok(Self { relays, delay })
    }

    /// Channels with a relay attached.
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.relays.iter().map(RelayPump::channel)
    }

    /// Force every relay off (boot, panic recovery).
    pub fn all_off(&mut self) {
        for relay in self.relays.iter_mut() {
            if let Err(e) = relay.stop() {
                error!("Hardware: could not stop channel {}: {}", relay.channel(), e);
            }
        }
    }
}

impl<P: OutputPin, D: DelayNs> ActuatorPort for HardwareAdapter<P, D> {
    fn activate(&mut self, pump: PumpId, channel: u8, duration_ms: u32) -> Result<(), ActuatorError> {
        let relay = self
            .relays
            .iter_mut()
            .find(|r| r.channel() == channel)
            .ok_or(ActuatorError::InvalidChannel(channel))?;
        if relay.is_running() {
            return Err(ActuatorError::PumpBusy(pump));
        }

        debug!("Hardware: pump {} on ch{} for {} ms", pump, channel, duration_ms);
        relay.start()?;
        self.delay.delay_ms(duration_ms);
        relay.stop().inspect_err(|e| {
            error!("Hardware: pump {} failed to stop: {}", pump, e);
        })
    }
}
