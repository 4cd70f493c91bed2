use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub title: String,
    #[serde(rename = "dueDate")]
    pub due_at: DateTime<Utc>,
    #[serde(rename = "isCompleted")]
    pub completed: bool,
}

impl Task {
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>, due_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: title.into(),
            due_at,
            completed: false,
        }
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}

/// Ordered task collection, kept ascending by due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a persisted or remote list. The order is taken as-is.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn has_incomplete(&self) -> bool {
        self.tasks.iter().any(|t| !t.completed)
    }

    /// Validate and insert a new task, then re-sort by due date.
    ///
    /// The task is prepended before the (stable) sort, so among tasks sharing
    /// a due instant the newest comes first.
    pub fn add(
        &mut self,
        owner_id: &str,
        title: &str,
        due_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Task, ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let due_at = due_at.ok_or(ValidationError::MissingDueDate)?;
        if due_at < now {
            return Err(ValidationError::DueInPast);
        }

        let task = Task::new(owner_id, title, due_at);
        self.tasks.insert(0, task.clone());
        self.sort();
        Ok(task)
    }

    /// Flip completion on the matching task. Returns false if nothing matched.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.toggle();
                true
            }
            None => false,
        }
    }

    /// Remove the matching task. Returns the removed task, if any.
    pub fn delete(&mut self, id: &str) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(pos))
    }

    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    fn sort(&mut self) {
        self.tasks.sort_by_key(|t| t.due_at);
    }
}
