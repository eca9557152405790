//! Application core: orchestration over the domain, zero direct I/O.
//!
//! This module wires the engine together for the CocktailBot: the
//! [`service`] that owns the ledger, pump registry and interlock, the
//! operator [`console`] with its [`commands`], and the [`events`] it
//! emits.  All interaction with hardware and flash happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod console;
pub mod events;
pub mod ports;
pub mod service;
