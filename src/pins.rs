//! GPIO assignments for the CocktailBot relay board.
//!
//! Single source of truth: the factory pump table and the relay
//! adapter reference this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Pump relays (one active-HIGH relay per peristaltic pump)
// ---------------------------------------------------------------------------

/// Relay GPIOs in pump order: index 0 drives pump 1.
///
/// Chosen from the ESP32-S3 pins that are free of strapping and
/// flash/PSRAM duties.
pub const PUMP_RELAY_GPIOS: [u8; 15] = [4, 5, 6, 7, 15, 16, 17, 18, 8, 9, 10, 11, 12, 13, 14];

/// The relay board switches on a HIGH level.
pub const RELAY_ACTIVE_LOW: bool = false;
