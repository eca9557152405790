//! CocktailBot firmware library.
//!
//! Recipe scaling, inventory bookkeeping, availability gating and the
//! pump sequencers, plus the adapters that bind them to NVS and relay
//! GPIOs.  Exposed as a library for integration testing; all
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod availability;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inventory;
pub mod pins;
pub mod pumps;
pub mod recipe;
pub mod safety;
pub mod sequencer;

pub mod adapters;
pub mod drivers;

pub use error::{Error, Result};
