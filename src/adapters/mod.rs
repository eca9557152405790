//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                |
//! |------------|-------------------|----------------------------|
//! | `hardware` | ActuatorPort      | Pump relays via GPIO       |
//! | `log_sink` | EventSink         | Serial log output          |
//! | `nvs`      | ConfigPort        | NVS / in-memory store      |
//! |            | StoragePort       |                            |
//! |            | LevelStore        |                            |
//! |            | PumpStore         |                            |
//! | `time`     | TimePort          | System clock / fixed clock |
//! | `usage`    | UsageSink         | Any StoragePort            |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod usage;
