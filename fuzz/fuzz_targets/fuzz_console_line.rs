//! Fuzz target: `MachineCommand::parse`
//!
//! Feeds arbitrary UART lines to the console parser and checks that it
//! never panics and that every accepted command parses the same way twice.
//!
//! cargo fuzz run fuzz_console_line

#![no_main]

use cocktailbot::app::commands::MachineCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    let first = MachineCommand::parse(&line);
    assert_eq!(first, MachineCommand::parse(&line), "parser must be pure");
});
