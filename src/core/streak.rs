use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar days the user opened the task page since the streak began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakRecord {
    pub streak_start_day: NaiveDate,
    pub last_login_day: NaiveDate,
    pub login_days: BTreeSet<NaiveDate>,
}

/// Derived counters shown next to the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakStatus {
    pub day_count: u32,
    pub missed_days: u32,
}

impl StreakRecord {
    pub fn start(today: NaiveDate) -> Self {
        Self {
            streak_start_day: today,
            last_login_day: today,
            login_days: BTreeSet::from([today]),
        }
    }

    /// Mark `today` as visited. Visiting the same day twice counts once.
    pub fn visit(&mut self, today: NaiveDate) {
        self.last_login_day = today;
        self.login_days.insert(today);
    }

    pub fn status(&self, today: NaiveDate) -> StreakStatus {
        let day_count = self.login_days.len() as u32;
        let elapsed = (today - self.streak_start_day).num_days().max(0) as u32;
        let expected = elapsed + 1;
        StreakStatus {
            day_count,
            missed_days: expected.saturating_sub(day_count),
        }
    }
}

/// Record a page load on `today` and return the updated record and counters.
pub fn record_visit(record: Option<StreakRecord>, today: NaiveDate) -> (StreakRecord, StreakStatus) {
    let record = match record {
        None => StreakRecord::start(today),
        Some(mut record) => {
            record.visit(today);
            record
        }
    };
    let status = record.status(today);
    (record, status)
}
