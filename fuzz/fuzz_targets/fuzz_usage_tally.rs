//! Fuzz target: `UsageTally::load`
//!
//! Plants arbitrary bytes where the usage tally lives in flash and loads
//! it.  A corrupted blob must yield an empty tally, never a panic, and the
//! tally must keep counting afterwards.
//!
//! cargo fuzz run fuzz_usage_tally

#![no_main]

use cocktailbot::adapters::nvs::NvsAdapter;
use cocktailbot::adapters::time::FixedClock;
use cocktailbot::adapters::usage::UsageTally;
use cocktailbot::app::ports::{StoragePort, UsageSink};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut nvs = NvsAdapter::default();
    if nvs.write("stats", "tally", data).is_err() {
        return;
    }

    let mut tally = UsageTally::load(nvs, FixedClock(0));
    let before = tally.totals().total;
    tally.record("fuzz", "Fuzz");
    assert_eq!(tally.totals().total, before.saturating_add(1));
});
