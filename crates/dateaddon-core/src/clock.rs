//! Time sources.

use std::cell::Cell;
use std::time::Instant;

use chrono::{DateTime, Duration, FixedOffset, Local};

/// Source of monotonic time (for timers) and wall-clock time (for display).
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin. Never goes backwards.
    fn now_ms(&self) -> u64;

    /// Current local date and time.
    fn local_now(&self) -> DateTime<FixedOffset>;
}

/// The real clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn local_now(&self) -> DateTime<FixedOffset> {
        Local::now().into()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    elapsed_ms: Cell<u64>,
    wall: Cell<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            elapsed_ms: Cell::new(0),
            wall: Cell::new(start),
        }
    }

    /// Move both monotonic and wall time forward.
    pub fn advance(&self, ms: u64) {
        self.elapsed_ms.set(self.elapsed_ms.get() + ms);
        self.wall
            .set(self.wall.get() + Duration::milliseconds(ms as i64));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.elapsed_ms.get()
    }

    fn local_now(&self) -> DateTime<FixedOffset> {
        self.wall.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_manual_clock_advances_both() {
        let start = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 8, 0, 0)
            .unwrap();
        let clock = ManualClock::new(start);
        clock.advance(61_000);
        assert_eq!(clock.now_ms(), 61_000);
        assert_eq!(clock.local_now().minute(), 1);
        assert_eq!(clock.local_now().second(), 1);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
