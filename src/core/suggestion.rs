use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Preset moods/goals offered as one-tap suggestion prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionCategory {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const CATEGORIES: [SuggestionCategory; 5] = [
    SuggestionCategory { label: "Feeling Sad", prompt: "feeling sad" },
    SuggestionCategory { label: "Feeling Tired", prompt: "feeling tired" },
    SuggestionCategory { label: "Exam Prep", prompt: "preparing for an exam" },
    SuggestionCategory { label: "Feeling Bored", prompt: "feeling bored" },
    SuggestionCategory { label: "Get Productive", prompt: "a desire to be productive" },
];

/// Look up a preset by label (case-insensitive); unknown labels are used
/// verbatim as the prompt.
pub fn prompt_for(input: &str) -> String {
    CATEGORIES
        .iter()
        .find(|c| c.label.eq_ignore_ascii_case(input.trim()))
        .map(|c| c.prompt.to_string())
        .unwrap_or_else(|| input.trim().to_string())
}

/// Due date given to a task created from a suggestion: tomorrow at noon.
pub fn suggestion_due<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let tomorrow = now.date_naive() + Duration::days(1);
    let noon = tomorrow.and_time(NaiveTime::from_hms_opt(12, 0, 0)?);
    now.timezone()
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
