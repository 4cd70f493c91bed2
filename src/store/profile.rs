use serde::Serialize;
use serde::de::DeserializeOwned;

use super::KeyValueStore;
use crate::core::purpose::Purpose;
use crate::core::streak::StreakRecord;
use crate::core::task::Task;
use crate::core::user::{Session, User};
use crate::error::StoreError;

const SESSION_KEY: &str = "facetask_session";
const USER_KEY: &str = "facetask_user";

fn tasks_key(user_id: &str) -> String {
    format!("facetask_tasks_{}", user_id)
}

fn purpose_key(user_id: &str) -> String {
    format!("facetask_purpose_{}", user_id)
}

fn group_key(user_id: &str) -> String {
    format!("facetask_group_{}", user_id)
}

fn streak_key(user_id: &str) -> String {
    format!("facetask_streak_{}", user_id)
}

/// Typed view over the device's key space.
pub struct ProfileStore {
    kv: Box<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(key) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.kv.set(key, json)
    }

    // Session / profile

    pub fn session(&self) -> Result<Option<Session>, StoreError> {
        self.read(SESSION_KEY)
    }

    pub fn start_session(&mut self, user_id: &str) -> Result<(), StoreError> {
        self.write(
            SESSION_KEY,
            &Session {
                user_id: user_id.to_string(),
            },
        )
    }

    pub fn end_session(&mut self) -> Result<(), StoreError> {
        self.kv.remove(SESSION_KEY)
    }

    pub fn user(&self) -> Result<Option<User>, StoreError> {
        self.read(USER_KEY)
    }

    pub fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.write(USER_KEY, user)
    }

    // Per-user state

    /// Missing task entries read as an empty list.
    pub fn tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self.read(&tasks_key(user_id))?.unwrap_or_default())
    }

    pub fn save_tasks(&mut self, user_id: &str, tasks: &[Task]) -> Result<(), StoreError> {
        self.write(&tasks_key(user_id), tasks)
    }

    pub fn purpose(&self, user_id: &str) -> Result<Option<Purpose>, StoreError> {
        self.read(&purpose_key(user_id))
    }

    pub fn save_purpose(&mut self, user_id: &str, purpose: &Purpose) -> Result<(), StoreError> {
        self.write(&purpose_key(user_id), purpose)
    }

    /// The group id is stored as a bare string, not JSON.
    pub fn group_id(&self, user_id: &str) -> Option<String> {
        self.kv
            .get(&group_key(user_id))
            .filter(|id| !id.trim().is_empty())
    }

    pub fn set_group_id(&mut self, user_id: &str, group_id: &str) -> Result<(), StoreError> {
        self.kv.set(&group_key(user_id), group_id.to_string())
    }

    pub fn clear_group_id(&mut self, user_id: &str) -> Result<(), StoreError> {
        self.kv.remove(&group_key(user_id))
    }

    pub fn streak(&self, user_id: &str) -> Result<Option<StreakRecord>, StoreError> {
        self.read(&streak_key(user_id))
    }

    pub fn save_streak(&mut self, user_id: &str, record: &StreakRecord) -> Result<(), StoreError> {
        self.write(&streak_key(user_id), record)
    }

    /// Wipe everything on this device.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        log::warn!("Clearing all local profile data");
        self.kv.clear()
    }

    pub fn raw(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }
}
