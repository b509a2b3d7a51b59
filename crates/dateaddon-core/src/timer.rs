//! Single-threaded timer queue.
//!
//! Timers are plain data: the owner asks for due timers with [`TimerQueue::pop_due`]
//! and dispatches them itself. Cancelled timers are removed immediately, so a
//! cancelled timer can never fire.

/// Identifies a scheduled timer for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Entry<K> {
    id: TimerId,
    deadline_ms: u64,
    period_ms: Option<u64>,
    kind: K,
}

/// Deadline-ordered set of one-shot and repeating timers.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    entries: Vec<Entry<K>>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl<K: Clone> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire once at `now_ms + delay_ms`.
    pub fn schedule_once(&mut self, now_ms: u64, delay_ms: u64, kind: K) -> TimerId {
        self.insert(now_ms.saturating_add(delay_ms), None, kind)
    }

    /// Fire every `period_ms`, first at `now_ms + period_ms`.
    pub fn schedule_repeating(&mut self, now_ms: u64, period_ms: u64, kind: K) -> TimerId {
        self.schedule_repeating_after(now_ms, period_ms, period_ms, kind)
    }

    /// Fire first at `now_ms + first_delay_ms`, then every `period_ms`.
    pub fn schedule_repeating_after(
        &mut self,
        now_ms: u64,
        first_delay_ms: u64,
        period_ms: u64,
        kind: K,
    ) -> TimerId {
        let period_ms = period_ms.max(1);
        self.insert(now_ms.saturating_add(first_delay_ms), Some(period_ms), kind)
    }

    /// Remove a timer. Returns false if it already fired (one-shot) or was
    /// never scheduled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.deadline_ms).min()
    }

    /// Remove and return the earliest timer due at `now_ms`.
    ///
    /// Repeating timers are re-armed one period after their deadline, or one
    /// period after `now_ms` if that is already past, so a stalled loop
    /// doesn't produce a burst of catch-up ticks. Call repeatedly until
    /// it returns `None`; handlers may cancel or add timers in between.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, K)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline_ms <= now_ms)
            .min_by_key(|(_, e)| (e.deadline_ms, e.id))
            .map(|(i, _)| i)?;

        let fired = (self.entries[index].id, self.entries[index].kind.clone());
        match self.entries[index].period_ms {
            Some(period) => {
                let entry = &mut self.entries[index];
                let mut next = entry.deadline_ms.saturating_add(period);
                if next <= now_ms {
                    next = now_ms.saturating_add(period);
                }
                entry.deadline_ms = next;
            }
            None => {
                self.entries.swap_remove(index);
            }
        }

        Some(fired)
    }

    fn insert(&mut self, deadline_ms: u64, period_ms: Option<u64>, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline_ms,
            period_ms,
            kind,
        });
        id
    }
}
