use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

use super::group::CollabGroup;
use super::task::Task;

/// Completion ratio over one bucket of tasks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    /// 0..=100; zero when the bucket is empty.
    pub percent: f64,
}

impl Progress {
    pub fn of<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut total = 0;
        let mut completed = 0;
        for task in tasks {
            total += 1;
            if task.completed {
                completed += 1;
            }
        }
        let percent = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self { total, completed, percent }
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskAnalytics {
    pub daily: Progress,
    pub weekly: Progress,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

impl TaskAnalytics {
    /// Bucket `tasks` by the calendar day and Monday-based week of `now`,
    /// reading due dates in `now`'s timezone.
    pub fn compute<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let week_start = week_start(today);
        let week_end = week_start + Duration::days(6);
        let tz = now.timezone();
        let due_day = |t: &Task| t.due_at.with_timezone(&tz).date_naive();

        let daily = Progress::of(tasks.iter().filter(|t| due_day(t) == today));
        let weekly = Progress::of(tasks.iter().filter(|t| {
            let d = due_day(t);
            d >= week_start && d <= week_end
        }));

        Self {
            daily,
            weekly,
            week_start,
            week_end,
        }
    }

    /// e.g. "Oct 19 - Oct 25"
    pub fn week_label(&self) -> String {
        format!(
            "{} - {}",
            self.week_start.format("%b %-d"),
            self.week_end.format("%b %-d")
        )
    }

    pub fn is_empty(&self) -> bool {
        self.daily.total == 0 && self.weekly.total == 0
    }
}

/// One bar in the group comparison chart.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberProgress {
    pub member_id: String,
    pub label: String,
    pub weekly: Progress,
}

/// Weekly completion per member, computed independently for each member.
pub fn member_progress<Tz: TimeZone>(
    group: &CollabGroup,
    current_user_id: &str,
    now: &DateTime<Tz>,
) -> Vec<MemberProgress> {
    group
        .members
        .iter()
        .map(|member| {
            let label = if member.id == current_user_id {
                "You".to_string()
            } else {
                member.name.clone()
            };
            MemberProgress {
                member_id: member.id.clone(),
                label,
                weekly: TaskAnalytics::compute(&member.tasks, now).weekly,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::group::Member;
    use chrono::Utc;

    // Wednesday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 21, 9, 0, 0).unwrap()
    }

    fn task(y: i32, m: u32, d: u32, h: u32, completed: bool) -> Task {
        let mut t = Task::new("u1", "t", Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap());
        t.completed = completed;
        t
    }

    #[test]
    fn daily_progress_four_tasks_three_done() {
        let tasks = vec![
            task(2026, 10, 21, 8, true),
            task(2026, 10, 21, 12, true),
            task(2026, 10, 21, 18, true),
            task(2026, 10, 21, 23, false),
            task(2026, 10, 22, 12, false),
        ];
        let a = TaskAnalytics::compute(&tasks, &now());
        assert_eq!(a.daily.total, 4);
        assert_eq!(a.daily.completed, 3);
        assert_eq!(a.daily.percent, 75.0);
    }

    #[test]
    fn empty_list_is_zero_percent() {
        let a = TaskAnalytics::compute(&[], &now());
        assert_eq!(a.daily.percent, 0.0);
        assert_eq!(a.weekly.percent, 0.0);
        assert!(a.is_empty());
    }

    #[test]
    fn week_runs_monday_through_sunday() {
        let tasks = vec![
            task(2026, 10, 18, 12, true),  // previous Sunday
            task(2026, 10, 19, 0, true),   // Monday
            task(2026, 10, 25, 23, false), // Sunday
            task(2026, 10, 26, 0, true),   // next Monday
        ];
        let a = TaskAnalytics::compute(&tasks, &now());
        assert_eq!(a.weekly.total, 2);
        assert_eq!(a.weekly.completed, 1);
        assert_eq!(a.week_start, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(a.week_label(), "Oct 19 - Oct 25");
    }

    #[test]
    fn sunday_belongs_to_the_week_that_started_monday() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    }

    #[test]
    fn member_progress_labels_current_user() {
        let mut group = CollabGroup::new(
            "abcd1234",
            Member {
                id: "me".to_string(),
                name: "Ava".to_string(),
                tasks: vec![task(2026, 10, 20, 12, true)],
            },
        );
        group.add_member(Member {
            id: "friend".to_string(),
            name: "Ben".to_string(),
            tasks: vec![task(2026, 10, 20, 12, true), task(2026, 10, 22, 12, false)],
        });

        let bars = member_progress(&group, "me", &now());
        assert_eq!(bars[0].label, "You");
        assert_eq!(bars[0].weekly.percent, 100.0);
        assert_eq!(bars[1].label, "Ben");
        assert_eq!(bars[1].weekly.percent, 50.0);
    }
}
