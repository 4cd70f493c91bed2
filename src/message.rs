use chrono::{DateTime, Utc};

use crate::core::assistant::{FaceLoginResponse, Reminder};
use crate::core::group::CollabGroup;
use crate::core::purpose::{ExamDuration, Purpose, PurposeKind};
use crate::error::ValidationError;
use crate::sync::GroupWrite;
use crate::sync::group::{GroupError, GroupEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Register,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Auth(AuthMode),
    Tasks,
    Collab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Shown next to the form that caused it.
    Inline,
    /// Stays until the problem is fixed (camera trouble).
    Persistent,
    /// Toast.
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn inline(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Inline, text: text.into() }
    }

    pub fn persistent(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Persistent, text: text.into() }
    }

    pub fn transient(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Transient, text: text.into() }
    }
}

/// Raw purpose dialog input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurposeForm {
    pub kind: PurposeKind,
    pub exam_name: String,
    pub exam_duration: ExamDuration,
}

impl PurposeForm {
    pub fn normal() -> Self {
        Self {
            kind: PurposeKind::Normal,
            exam_name: String::new(),
            exam_duration: ExamDuration::default(),
        }
    }

    pub fn exams(exam_name: impl Into<String>, exam_duration: ExamDuration) -> Self {
        Self {
            kind: PurposeKind::Exams,
            exam_name: exam_name.into(),
            exam_duration,
        }
    }

    pub fn into_purpose(self) -> Result<Purpose, ValidationError> {
        match self.kind {
            PurposeKind::Normal => Ok(Purpose::normal()),
            PurposeKind::Exams => Purpose::exams(&self.exam_name, self.exam_duration),
        }
    }
}

#[derive(Debug)]
pub enum Message {
    // Navigation
    Open(Page),

    // Auth
    Register { name: String, photo: String },
    Login { photo: String },
    FaceLoginCompleted(Result<FaceLoginResponse, String>),
    Logout,

    // Task CRUD
    AddTask { title: String, due: Option<DateTime<Utc>> },
    ToggleTask(String),
    DeleteTask(String),
    GroupWriteCompleted(Result<GroupWrite, GroupError>),

    // Purpose
    SetPurpose(PurposeForm),

    // Suggestions
    RequestSuggestions(String),
    SuggestionsReady(Result<Vec<String>, String>),
    AddSuggestion(String),

    // Reminders
    ReminderTick,
    RemindersReady(Result<Vec<Reminder>, String>),
    DismissReminder,

    // Collaboration
    CreateGroup,
    GroupCreated(Result<CollabGroup, GroupError>),
    JoinGroup(String),
    GroupJoined(Result<Option<CollabGroup>, GroupError>),
    LeaveGroup,
    GroupLeft(Result<(), GroupError>),
    SetGroupPurpose(PurposeForm),
    GroupPurposeSet(Result<(), GroupError>),
    Group(GroupEvent),

    // Settings
    SetAnthropicApiKey(String),
    AnthropicKeySaved(Result<String, String>),
    ToggleDebugLogging,

    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_form_requires_name() {
        let form = PurposeForm::exams("  ", ExamDuration::Days90);
        assert_eq!(form.into_purpose(), Err(ValidationError::MissingExamName));

        let purpose = PurposeForm::exams("MCAT", ExamDuration::Days90)
            .into_purpose()
            .unwrap();
        assert_eq!(purpose.exam_duration, Some(ExamDuration::Days90));
    }

    #[test]
    fn normal_form_ignores_exam_fields() {
        let form = PurposeForm {
            kind: PurposeKind::Normal,
            exam_name: "ignored".to_string(),
            exam_duration: ExamDuration::Days120,
        };
        assert_eq!(form.into_purpose().unwrap(), Purpose::normal());
    }
}
