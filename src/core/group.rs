use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::purpose::{ExamDuration, Purpose, PurposeKind};
use super::task::Task;
use super::user::User;

pub const PASSKEY_LEN: usize = 8;

/// A user's embedded record inside a group document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Member {
    pub fn from_user(user: &User, tasks: Vec<Task>) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            tasks,
        }
    }
}

/// Shared group document, keyed by its passkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollabGroup {
    pub id: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<PurposeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_duration: Option<ExamDuration>,
}

impl CollabGroup {
    /// A fresh group with `owner` as its only member.
    pub fn new(id: impl Into<String>, owner: Member) -> Self {
        Self {
            id: id.into(),
            members: vec![owner],
            purpose: None,
            exam_name: None,
            exam_duration: None,
        }
    }

    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }

    /// Add `member` unless a member with the same id is already listed.
    /// Returns true if the member list changed.
    pub fn add_member(&mut self, member: Member) -> bool {
        if self.is_member(&member.id) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Replace the task list of `user_id`. Returns false if not a member.
    pub fn set_member_tasks(&mut self, user_id: &str, tasks: Vec<Task>) -> bool {
        match self.members.iter_mut().find(|m| m.id == user_id) {
            Some(member) => {
                member.tasks = tasks;
                true
            }
            None => false,
        }
    }

    /// Drop the entry for `user_id`, leaving every other entry untouched.
    pub fn remove_member(&mut self, user_id: &str) -> Option<Member> {
        let pos = self.members.iter().position(|m| m.id == user_id)?;
        Some(self.members.remove(pos))
    }

    pub fn set_purpose(&mut self, purpose: &Purpose) {
        self.purpose = Some(purpose.kind);
        self.exam_name = purpose.exam_name.clone();
        self.exam_duration = purpose.exam_duration;
    }

    pub fn group_purpose(&self) -> Option<Purpose> {
        self.purpose.map(|kind| Purpose {
            kind,
            exam_name: self.exam_name.clone(),
            exam_duration: self.exam_duration,
        })
    }
}

/// A new short, shareable passkey.
pub fn generate_passkey() -> String {
    Uuid::new_v4().simple().to_string()[..PASSKEY_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: format!("name-{}", id),
            tasks: Vec::new(),
        }
    }

    #[test]
    fn passkey_is_eight_chars() {
        let key = generate_passkey();
        assert_eq!(key.len(), PASSKEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn add_member_is_idempotent() {
        let mut group = CollabGroup::new("abcd1234", member("a"));
        assert!(group.add_member(member("b")));
        assert!(!group.add_member(member("b")));
        assert_eq!(group.members.len(), 2);
    }

    #[test]
    fn remove_member_leaves_others_alone() {
        let mut group = CollabGroup::new("abcd1234", member("a"));
        group.add_member(member("b"));
        group.add_member(member("c"));
        let before_c = group.member("c").cloned();

        let removed = group.remove_member("b").unwrap();
        assert_eq!(removed.id, "b");
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.member("c").cloned(), before_c);
        assert!(group.remove_member("b").is_none());
    }

    #[test]
    fn purpose_fields_round_trip() {
        let mut group = CollabGroup::new("abcd1234", member("a"));
        assert!(group.group_purpose().is_none());
        let purpose = Purpose::exams("GRE", ExamDuration::Days120).unwrap();
        group.set_purpose(&purpose);
        assert_eq!(group.group_purpose(), Some(purpose));

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["purpose"], "exams");
        assert_eq!(json["examDuration"], 120);
    }
}
