use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use super::assistant::Reminder;
use super::task::TaskList;

/// Throttles reminder requests and shows one reminder at a time.
#[derive(Debug, Clone)]
pub struct ReminderQueue {
    min_interval: Duration,
    last_checked: Option<DateTime<Utc>>,
    queue: VecDeque<Reminder>,
    active: Option<Reminder>,
}

impl ReminderQueue {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_checked: None,
            queue: VecDeque::new(),
            active: None,
        }
    }

    /// Whether a tick at `now` should ask for reminders. A check is due only
    /// when something is still open and the last check is old enough.
    pub fn should_check(&self, now: DateTime<Utc>, tasks: &TaskList) -> bool {
        if !tasks.has_incomplete() {
            return false;
        }
        match self.last_checked {
            None => true,
            Some(last) => now - last > self.min_interval,
        }
    }

    pub fn mark_checked(&mut self, now: DateTime<Utc>) {
        self.last_checked = Some(now);
    }

    pub fn push(&mut self, reminders: Vec<Reminder>) {
        self.queue.extend(reminders);
        self.promote();
    }

    pub fn active(&self) -> Option<&Reminder> {
        self.active.as_ref()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Close the active reminder and show the next one, if any.
    pub fn dismiss(&mut self) -> Option<Reminder> {
        let closed = self.active.take();
        self.promote();
        closed
    }

    fn promote(&mut self) {
        if self.active.is_none() {
            self.active = self.queue.pop_front();
        }
    }
}
