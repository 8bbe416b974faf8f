/// Handle to a pending one-shot timer. Cancelling via the handle is the only
/// way to stop an entry from firing; a cancelled entry can never be popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    due_ms: u64,
    task: T,
}

/// Cooperative one-shot timer queue on a millisecond clock.
///
/// All timed game work is queued here and drained by whoever owns the queue:
/// the binary feeds it real elapsed time per tick, tests feed it a simulated
/// clock. Entries due at the same instant pop in scheduling order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now_ms: u64,
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedules `task` to fire `delay_ms` after the current clock reading.
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            task,
        });
        id
    }

    /// Removes a pending entry. Returns false if it already fired or was
    /// cancelled before; safe to call with a stale handle.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Pops the earliest entry due at or before `target_ms` and advances the
    /// clock to its due time, so work a popped task schedules is relative to
    /// its fire time rather than the tick boundary. Returns None when nothing
    /// is due.
    pub fn pop_due(&mut self, target_ms: u64) -> Option<T> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_ms <= target_ms)
            .min_by_key(|(_, e)| (e.due_ms, e.id.0))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(idx);
        self.now_ms = self.now_ms.max(entry.due_ms);
        Some(entry.task)
    }

    /// Moves the clock forward to `target_ms` once everything due has been
    /// popped. Never moves it backwards.
    pub fn advance_to(&mut self, target_ms: u64) {
        if target_ms > self.now_ms {
            self.now_ms = target_ms;
        }
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
