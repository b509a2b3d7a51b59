//! Refresh cadence for the displayed text.
//!
//! Ticks every second while the time (with seconds) is shown, otherwise once a
//! minute. Ticks are aligned to the wall-clock second/minute boundary so the
//! display flips together with the real clock.

use chrono::{DateTime, FixedOffset, Timelike};
use tracing::debug;

use crate::timer::{TimerId, TimerQueue};

/// Refresh interval while seconds are visible.
pub const SECOND_INTERVAL_MS: u64 = 1000;

/// Refresh interval otherwise.
pub const MINUTE_INTERVAL_MS: u64 = 60_000;

/// Interval for the given granularity.
pub fn interval_for(show_seconds: bool) -> u64 {
    if show_seconds {
        SECOND_INTERVAL_MS
    } else {
        MINUTE_INTERVAL_MS
    }
}

/// Milliseconds from `now` to the next multiple of `interval_ms` on the wall
/// clock (the next full second or minute).
pub fn delay_to_boundary(now: &DateTime<FixedOffset>, interval_ms: u64) -> u64 {
    // Leap-second nanos can exceed one second; clamp so the delay stays sane.
    let millis = u64::from(now.nanosecond() / 1_000_000).min(999);
    let into_interval = if interval_ms >= MINUTE_INTERVAL_MS {
        u64::from(now.second()) * 1000 + millis
    } else {
        millis
    };
    let into_interval = into_interval % interval_ms.max(1);
    interval_ms - into_interval
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled { interval_ms: u64, timer: TimerId },
}

/// Owns the repeating refresh timer.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    state: SchedulerState,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
        }
    }
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval_ms(&self) -> Option<u64> {
        match self.state {
            SchedulerState::Idle => None,
            SchedulerState::Scheduled { interval_ms, .. } => Some(interval_ms),
        }
    }

    /// Whether `timer` is the live refresh timer.
    pub fn owns(&self, timer: TimerId) -> bool {
        matches!(self.state, SchedulerState::Scheduled { timer: t, .. } if t == timer)
    }

    /// Cancel the current timer (if any) and start one for the granularity.
    ///
    /// The caller renders once synchronously before this, so the first timer
    /// tick is only the next boundary.
    pub fn schedule<K: Clone>(
        &mut self,
        show_seconds: bool,
        now_ms: u64,
        wall: &DateTime<FixedOffset>,
        timers: &mut TimerQueue<K>,
        kind: K,
    ) -> u64 {
        self.cancel(timers);

        let interval_ms = interval_for(show_seconds);
        let first_delay = delay_to_boundary(wall, interval_ms);
        let timer = timers.schedule_repeating_after(now_ms, first_delay, interval_ms, kind);
        self.state = SchedulerState::Scheduled { interval_ms, timer };

        debug!(
            "Refresh scheduled every {}ms, first tick in {}ms",
            interval_ms, first_delay
        );
        interval_ms
    }

    pub fn cancel<K: Clone>(&mut self, timers: &mut TimerQueue<K>) {
        if let SchedulerState::Scheduled { timer, .. } = self.state {
            timers.cancel(timer);
            debug!("Refresh timer cancelled");
        }
        self.state = SchedulerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, h, m, s)
            .unwrap()
            + chrono::Duration::milliseconds(i64::from(ms))
    }

    #[test]
    fn test_interval_for_granularity() {
        assert_eq!(interval_for(true), 1000);
        assert_eq!(interval_for(false), 60_000);
    }

    #[test]
    fn test_delay_to_boundary() {
        assert_eq!(delay_to_boundary(&at(10, 0, 9, 0), MINUTE_INTERVAL_MS), 51_000);
        assert_eq!(delay_to_boundary(&at(10, 0, 9, 250), MINUTE_INTERVAL_MS), 50_750);
        assert_eq!(delay_to_boundary(&at(10, 0, 9, 250), SECOND_INTERVAL_MS), 750);
        // Exactly on a boundary waits a full interval
        assert_eq!(delay_to_boundary(&at(10, 0, 0, 0), MINUTE_INTERVAL_MS), 60_000);
        assert_eq!(delay_to_boundary(&at(10, 0, 0, 0), SECOND_INTERVAL_MS), 1000);
    }

    #[test]
    fn test_reschedule_replaces_timer() {
        let mut timers: TimerQueue<&str> = TimerQueue::new();
        let mut scheduler = RefreshScheduler::new();
        let wall = at(10, 0, 0, 0);

        scheduler.schedule(false, 0, &wall, &mut timers, "refresh");
        assert_eq!(scheduler.interval_ms(), Some(60_000));
        let SchedulerState::Scheduled { timer: old, .. } = scheduler.state() else {
            panic!("expected scheduled");
        };

        scheduler.schedule(true, 0, &wall, &mut timers, "refresh");
        assert_eq!(scheduler.interval_ms(), Some(1000));
        assert_eq!(timers.len(), 1);
        assert!(!timers.is_scheduled(old));
        assert!(!scheduler.owns(old));
    }

    #[test]
    fn test_no_double_firing_after_toggle() {
        let mut timers: TimerQueue<&str> = TimerQueue::new();
        let mut scheduler = RefreshScheduler::new();
        let wall = at(10, 0, 0, 0);

        scheduler.schedule(true, 0, &wall, &mut timers, "refresh");
        scheduler.schedule(false, 0, &wall, &mut timers, "refresh");

        let mut fired = 0;
        while timers.pop_due(59_999).is_some() {
            fired += 1;
        }
        assert_eq!(fired, 0);
        assert!(timers.pop_due(60_000).is_some());
    }

    #[test]
    fn test_cancel_clears_state() {
        let mut timers: TimerQueue<&str> = TimerQueue::new();
        let mut scheduler = RefreshScheduler::new();
        scheduler.schedule(true, 0, &at(10, 0, 0, 0), &mut timers, "refresh");
        scheduler.cancel(&mut timers);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(timers.is_empty());
    }
}
