//! CocktailBot Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter      SystemClock  │
//! │  (ActuatorPort)    (EventSink)    (Config+Levels  (TimePort)   │
//! │                                    +Pumps+KV)                  │
//! │  UsageTally (UsageSink)           Console (UART line commands) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            MachineService (pure logic)                 │    │
//! │  │  Ledger · Registry · Dispense · Cleaning · Calibration │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::mpsc;

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};
use log::{info, warn};

use cocktailbot::adapters::hardware::HardwareAdapter;
use cocktailbot::adapters::log_sink::LogEventSink;
use cocktailbot::adapters::nvs::NvsAdapter;
use cocktailbot::adapters::time::SystemClock;
use cocktailbot::adapters::usage::UsageTally;
use cocktailbot::app::console::Console;
use cocktailbot::app::ports::ConfigPort;
use cocktailbot::app::service::MachineService;
use cocktailbot::catalog::Catalog;
use cocktailbot::config::MachineConfig;
use cocktailbot::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CocktailBot v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            MachineConfig::default()
        }
    };

    // ── 3. Relay bank ─────────────────────────────────────────
    let mut relay_pins = Vec::with_capacity(pins::PUMP_RELAY_GPIOS.len());
    for &gpio in &pins::PUMP_RELAY_GPIOS {
        // SAFETY: the relay GPIOs are claimed nowhere else and
        // `Peripherals::take()` is never called in this firmware.
        let pin = unsafe { AnyOutputPin::new(i32::from(gpio)) };
        relay_pins.push((gpio, PinDriver::output(pin)?));
    }
    let hardware = HardwareAdapter::new(relay_pins, pins::RELAY_ACTIVE_LOW, FreeRtos)
        .map_err(|e| anyhow!("relay init failed: {e}"))?;
    info!("Relays: {} channel(s) off", pins::PUMP_RELAY_GPIOS.len());

    // ── 4. Engine ─────────────────────────────────────────────
    let mut service = MachineService::boot(config, &nvs, SystemClock::new(), &nvs);
    let catalog = Catalog::builtin().map_err(|e| anyhow!("catalog: {e}"))?;
    info!(
        "Catalog: {} cocktail(s), {} ingredient(s)",
        catalog.cocktails().len(),
        catalog.ingredients().len()
    );

    // NVS handles are opened per call, so the tally gets its own adapter.
    let usage = UsageTally::load(NvsAdapter::default(), SystemClock::new());
    let mut console = Console::new(catalog, hardware, FreeRtos, LogEventSink::new(), usage);

    // ── 5. UART reader ────────────────────────────────────────
    //
    // Lines arrive on a separate thread so `cancel` can trip the token
    // while a cleaning cycle blocks the main loop.
    let (tx, rx) = mpsc::channel::<String>();
    let cancel = service.cancel_token();
    std::thread::Builder::new()
        .name("uart-rx".into())
        .stack_size(4096)
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { continue };
                if line.trim().eq_ignore_ascii_case("cancel") {
                    cancel.cancel();
                }
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    info!("System ready. Type 'help'.");

    // ── 6. Command loop ───────────────────────────────────────
    for line in rx {
        if line.trim().is_empty() {
            continue;
        }
        for reply in console.handle_line(&mut service, &line) {
            println!("{reply}");
        }
    }

    Ok(())
}
