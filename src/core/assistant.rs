//! Request/response shapes for the model-backed features and the seam the
//! application calls them through. Prompt text and model choice live in the
//! adapter (`sync::anthropic`), never here.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::purpose::Purpose;
use super::streak::StreakStatus;
use super::task::Task;
use super::user::User;

pub const MIN_SUGGESTIONS: usize = 3;
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLoginRequest {
    /// Freshly captured frame as a data URI.
    pub photo: String,
    /// The face captured at registration.
    pub reference_photo: String,
    pub expected_user_id: String,
}

impl FaceLoginRequest {
    pub fn for_user(user: &User, photo: String) -> Self {
        Self {
            photo,
            reference_photo: user.face_image.clone(),
            expected_user_id: user.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLoginResponse {
    #[serde(default)]
    pub user_id: String,
    #[serde(alias = "isLoginSuccessful")]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamContext {
    pub exam_name: String,
    pub exam_duration: u32,
    pub current_day: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestTasksRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam: Option<ExamContext>,
}

impl SuggestTasksRequest {
    /// Attach the exam plan position when the user is preparing for an exam.
    /// The plan day is the streak day count, capped at the plan length.
    pub fn new(prompt: &str, purpose: Option<&Purpose>, streak: Option<StreakStatus>) -> Self {
        let exam = purpose.filter(|p| p.is_exam()).and_then(|p| {
            let exam_name = p.exam_name.clone()?;
            let exam_duration = p.exam_duration.unwrap_or_default().days();
            let day = streak.map(|s| s.day_count).unwrap_or(1).max(1);
            Some(ExamContext {
                exam_name,
                exam_duration,
                current_day: day.min(exam_duration),
            })
        });
        Self {
            prompt: prompt.to_string(),
            exam,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuggestTasksResponse {
    pub suggestions: Vec<String>,
}

impl SuggestTasksResponse {
    /// Drop blank entries and cap the list. The text itself is shown as-is;
    /// a short list is kept but logged.
    pub fn into_suggestions(self) -> Vec<String> {
        let list: Vec<String> = self
            .suggestions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_SUGGESTIONS)
            .collect();
        if list.len() < MIN_SUGGESTIONS {
            log::warn!("Only {} suggestions returned", list.len());
        }
        list
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderTask {
    pub task_name: String,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersRequest {
    pub current_time: DateTime<Utc>,
    pub tasks: Vec<ReminderTask>,
}

impl RemindersRequest {
    /// Only incomplete tasks are sent.
    pub fn new(now: DateTime<Utc>, tasks: &[Task]) -> Self {
        Self {
            current_time: now,
            tasks: tasks
                .iter()
                .filter(|t| !t.completed)
                .map(|t| ReminderTask {
                    task_name: t.title.clone(),
                    due_date: t.due_at,
                    completed: t.completed,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub task_name: String,
    #[serde(alias = "dueDate")]
    pub due_at: String,
    #[serde(alias = "reminderMessage")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemindersResponse {
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

/// Model-backed capabilities. Calls are single-shot; callers do not retry.
pub trait Assistant: Send + Sync {
    fn face_login(&self, req: FaceLoginRequest) -> BoxFuture<'static, Result<FaceLoginResponse, String>>;

    fn suggest_tasks(
        &self,
        req: SuggestTasksRequest,
    ) -> BoxFuture<'static, Result<SuggestTasksResponse, String>>;

    fn task_reminders(
        &self,
        req: RemindersRequest,
    ) -> BoxFuture<'static, Result<RemindersResponse, String>>;
}

/// Stand-in used when no API key is configured.
pub struct DisabledAssistant;

impl DisabledAssistant {
    const MSG: &'static str = "No Anthropic API key configured";
}

impl Assistant for DisabledAssistant {
    fn face_login(&self, _req: FaceLoginRequest) -> BoxFuture<'static, Result<FaceLoginResponse, String>> {
        Box::pin(async { Err(Self::MSG.to_string()) })
    }

    fn suggest_tasks(
        &self,
        _req: SuggestTasksRequest,
    ) -> BoxFuture<'static, Result<SuggestTasksResponse, String>> {
        Box::pin(async { Err(Self::MSG.to_string()) })
    }

    fn task_reminders(
        &self,
        _req: RemindersRequest,
    ) -> BoxFuture<'static, Result<RemindersResponse, String>> {
        Box::pin(async { Err(Self::MSG.to_string()) })
    }
}
