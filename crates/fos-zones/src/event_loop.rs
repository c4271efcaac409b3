//! Timer queue
//!
//! Single-threaded macrotask queue on a virtual millisecond clock. Tasks are
//! closures over a context `C`; the owner pops a task and runs it against
//! itself, so tasks can freely schedule more tasks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Boxed task
pub type Task<C> = Box<dyn FnOnce(&mut C)>;

/// Timer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Timer manager
pub struct TaskQueue<C> {
    now_ms: u64,
    next_id: u64,
    /// Ordered by due time, then by scheduling order
    timers: BTreeMap<(u64, TimerId), Task<C>>,
    due_by_id: HashMap<TimerId, u64>,
}

impl<C> TaskQueue<C> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 1,
            timers: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Current virtual time
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Add a timeout
    pub fn set_timeout(&mut self, delay_ms: u64, task: impl FnOnce(&mut C) + 'static) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = self.now_ms.saturating_add(delay_ms);
        self.timers.insert((due, id), Box::new(task));
        self.due_by_id.insert(id, due);
        id
    }

    /// Clear a timer. Returns false if it already ran or never existed.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id) {
            Some(due) => self.timers.remove(&(due, id)).is_some(),
            None => false,
        }
    }

    /// Number of scheduled timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Check if there are pending timers
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Due time of the next timer
    pub fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(|&(due, _)| due)
    }

    /// Take the next timer, advancing the clock to its due time
    pub fn pop_next(&mut self) -> Option<Task<C>> {
        let ((due, id), task) = self.timers.pop_first()?;
        self.due_by_id.remove(&id);
        self.now_ms = self.now_ms.max(due);
        Some(task)
    }

    /// Take the next timer only if it is due by `deadline`
    pub fn pop_due_by(&mut self, deadline: u64) -> Option<Task<C>> {
        if self.next_due()? > deadline {
            return None;
        }
        self.pop_next()
    }

    /// Move the clock forward without running anything
    pub fn advance_to(&mut self, time_ms: u64) {
        self.now_ms = self.now_ms.max(time_ms);
    }
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for TaskQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("now_ms", &self.now_ms)
            .field("pending", &self.timers.len())
            .field("next_due", &self.next_due())
            .finish()
    }
}
