//! Machine interlock and cooperative cancellation.
//!
//! The pump manifold is the only shared resource.  A single machine-wide
//! busy flag (not per pump) guards it: dispense, single shot, full
//! cleaning, single-pump flush and the calibration pulse all acquire the
//! [`Interlock`] before the first actuation and release it when the
//! returned [`InterlockGuard`] drops, including on early error return.
//!
//! ```text
//!   try_acquire ──▶ Ok(guard) ──▶ ... actuate ... ──▶ drop(guard) ──▶ free
//!        │
//!        └── already held ──▶ Err(Error::Busy)
//! ```
//!
//! [`CancelToken`] is polled by the cleaning sequencer between pumps only;
//! an actuation that has started always runs to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};

use crate::error::Error;

/// What currently holds the interlock (for diagnostics only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Dispense,
    Shot,
    Cleaning,
    Flush,
    Calibration,
}

/// Machine-wide busy flag.  Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interlock {
    busy: Arc<AtomicBool>,
}

impl Interlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the machine for `op`, or fail with [`Error::Busy`].
    pub fn try_acquire(&self, op: Operation) -> Result<InterlockGuard, Error> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Interlock: {:?} refused, machine busy", op);
            return Err(Error::Busy);
        }
        debug!("Interlock: acquired for {:?}", op);
        Ok(InterlockGuard {
            busy: Arc::clone(&self.busy),
            op,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the interlock on drop.
#[must_use = "the interlock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct InterlockGuard {
    busy: Arc<AtomicBool>,
    op: Operation,
}

impl InterlockGuard {
    pub fn operation(&self) -> Operation {
        self.op
    }
}

impl Drop for InterlockGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        debug!("Interlock: released by {:?}", self.op);
    }
}

/// Cooperative cancellation flag shared between the operator and a
/// running cleaning cycle.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Re-arm the token for the next cycle.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}
