//! Bus transport and enable gate abstractions.
//!
//! The battery is reached through two lines: the single-wire bus carrying
//! all data, and an enable line that powers the pack's interface. Both are
//! expressed as traits so the orchestrator can run over a real adapter
//! ([`serial::SerialAdapter`]) or the in-process [`crate::simulation::SimulatedPack`].

pub mod serial;

use crate::constants::ENABLE_SETTLE_MS;
use crate::error::Result;
use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::Duration;

/// Bit-level primitives of the single-wire bus.
///
/// Implementations transfer bytes least-significant bit first and never
/// validate what comes back: an absent device reads as whatever the line
/// sampled. Errors are reserved for faults of the host-side adapter.
pub trait OneWireBus {
    /// Issue a reset pulse and report whether a presence pulse followed.
    fn reset(&mut self) -> Result<bool>;

    /// Write one byte, LSB first.
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Read one byte, LSB first.
    fn read_byte(&mut self) -> Result<u8>;

    /// Block for a fixed number of microseconds.
    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }

    /// Block for a fixed number of milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// The gate line that must be asserted around every transaction.
pub trait EnableLine {
    /// Drive the line: `true` asserts, `false` releases.
    fn set_enabled(&mut self, asserted: bool) -> Result<()>;
}

/// Everything the orchestrator needs from its hardware.
pub trait Link: OneWireBus + EnableLine {}

impl<T: OneWireBus + EnableLine> Link for T {}

/// Holds the enable line asserted for as long as it lives.
///
/// Dropping the guard releases the line, so every exit path of an
/// operation (including `?` returns) leaves it released exactly once.
pub struct EnableGuard<'a, L: Link> {
    link: &'a mut L,
}

impl<'a, L: Link> EnableGuard<'a, L> {
    /// Assert the enable line and wait out its settle delay.
    pub fn assert(link: &'a mut L) -> Result<Self> {
        if let Err(e) = link.set_enabled(true) {
            let _ = link.set_enabled(false);
            return Err(e);
        }
        link.delay_ms(ENABLE_SETTLE_MS);
        Ok(Self { link })
    }
}

impl<L: Link> Deref for EnableGuard<'_, L> {
    type Target = L;

    fn deref(&self) -> &L {
        self.link
    }
}

impl<L: Link> DerefMut for EnableGuard<'_, L> {
    fn deref_mut(&mut self) -> &mut L {
        self.link
    }
}

impl<L: Link> Drop for EnableGuard<'_, L> {
    fn drop(&mut self) {
        if let Err(e) = self.link.set_enabled(false) {
            log::warn!("Failed to release enable line: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObiError;

    #[derive(Default)]
    struct Recorder {
        enable: Vec<bool>,
        slept_ms: u32,
        fail_assert: bool,
    }

    impl OneWireBus for Recorder {
        fn reset(&mut self) -> Result<bool> {
            Ok(true)
        }
        fn write_byte(&mut self, _byte: u8) -> Result<()> {
            Ok(())
        }
        fn read_byte(&mut self) -> Result<u8> {
            Ok(0xFF)
        }
        fn delay_us(&mut self, _us: u32) {}
        fn delay_ms(&mut self, ms: u32) {
            self.slept_ms += ms;
        }
    }

    impl EnableLine for Recorder {
        fn set_enabled(&mut self, asserted: bool) -> Result<()> {
            self.enable.push(asserted);
            if asserted && self.fail_assert {
                return Err(ObiError::NoPresence);
            }
            Ok(())
        }
    }

    #[test]
    fn guard_settles_then_releases_on_drop() {
        let mut rec = Recorder::default();
        {
            let guard = EnableGuard::assert(&mut rec).unwrap();
            assert_eq!(guard.enable, vec![true]);
            assert_eq!(guard.slept_ms, ENABLE_SETTLE_MS);
        }
        assert_eq!(rec.enable, vec![true, false]);
    }

    #[test]
    fn failed_assert_still_releases() {
        let mut rec = Recorder {
            fail_assert: true,
            ..Default::default()
        };
        assert!(EnableGuard::assert(&mut rec).is_err());
        assert_eq!(rec.enable, vec![true, false]);
        assert_eq!(rec.slept_ms, 0);
    }
}
