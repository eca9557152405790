//! Clock adapters.
//!
//! - [`SystemClock`]: wall-clock seconds.  On **`target_os = "espidf"`**
//!   it reads `gettimeofday()` and reports 0 until SNTP has set the clock;
//!   on the host it uses `std::time::SystemTime`.
//! - [`FixedClock`]: a constant, for tests and for builds without a
//!   time source.

use crate::app::ports::TimePort;

/// Anything earlier than 2020-01-01 means the RTC was never set.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const EPOCH_2020: u64 = 1_577_836_800;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl TimePort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_epoch_secs(&self) -> u64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        let secs = tv.tv_sec as u64;
        if secs < EPOCH_2020 { 0 } else { secs }
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_epoch_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock frozen at the contained epoch second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl TimePort for FixedClock {
    fn now_epoch_secs(&self) -> u64 {
        self.0
    }
}
