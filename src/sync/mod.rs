pub mod anthropic;
pub mod firestore;
pub mod group;
pub mod keyring;
pub mod memory;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::core::group::{CollabGroup, Member, generate_passkey};
use crate::core::task::Task;
use crate::core::user::User;
use crate::error::StoreError;
use crate::store::ProfileStore;
use group::{GroupError, GroupService};

/// Passkey collisions are retried this many times before giving up.
const CREATE_ATTEMPTS: usize = 3;

/// Where the authoritative copy of the user's task list lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    Local,
    Grouped(String),
}

impl SyncMode {
    /// Mode for a session, from the group linkage on record.
    pub fn from_linkage(group_id: Option<String>) -> Self {
        match group_id {
            Some(id) => Self::Grouped(id),
            None => Self::Local,
        }
    }

    pub fn group_id(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Grouped(id) => Some(id),
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, Self::Grouped(_))
    }
}

/// Outcome of a read-modify-write against the group document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupWrite {
    Written,
    /// The user is no longer listed; nothing was written.
    NotMember,
    /// The document is gone; nothing was written.
    Missing,
}

/// What a dispatched mutation turned into.
pub enum Dispatch {
    /// Persisted synchronously to the local store.
    Stored,
    /// A remote write the caller should drive. Nothing awaits it in order,
    /// so two of these in flight race.
    Remote(BoxFuture<'static, Result<GroupWrite, GroupError>>),
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => f.write_str("Stored"),
            Self::Remote(_) => f.write_str("Remote(..)"),
        }
    }
}

/// Routes every task-list mutation to the store that currently owns it.
pub struct SyncDispatcher {
    user_id: String,
    mode: SyncMode,
    groups: Arc<dyn GroupService>,
}

impl SyncDispatcher {
    pub fn new(user_id: impl Into<String>, mode: SyncMode, groups: Arc<dyn GroupService>) -> Self {
        Self {
            user_id: user_id.into(),
            mode,
            groups,
        }
    }

    /// Build a dispatcher for `user_id` from the linkage in `store`.
    pub fn for_session(store: &ProfileStore, user_id: &str, groups: Arc<dyn GroupService>) -> Self {
        let mode = SyncMode::from_linkage(store.group_id(user_id));
        log::info!("Session for {} starts in {:?} mode", user_id, mode);
        Self::new(user_id, mode, groups)
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    pub fn groups(&self) -> Arc<dyn GroupService> {
        Arc::clone(&self.groups)
    }

    /// Persist the full list after a mutation.
    pub fn dispatch(&self, store: &mut ProfileStore, tasks: &[Task]) -> Result<Dispatch, StoreError> {
        match &self.mode {
            SyncMode::Local => {
                store.save_tasks(&self.user_id, tasks)?;
                Ok(Dispatch::Stored)
            }
            SyncMode::Grouped(group_id) => Ok(Dispatch::Remote(write_member_tasks(
                self.groups(),
                group_id.clone(),
                self.user_id.clone(),
                tasks.to_vec(),
            ))),
        }
    }

    /// Record the linkage and switch to group mode. The member entry must
    /// already hold the local list (see [`join_group`] / [`create_group`]).
    pub fn enter_group(&mut self, store: &mut ProfileStore, group_id: &str) -> Result<(), StoreError> {
        store.set_group_id(&self.user_id, group_id)?;
        self.mode = SyncMode::Grouped(group_id.to_string());
        log::info!("{} now syncs through group {}", self.user_id, group_id);
        Ok(())
    }

    /// Drop the linkage and return to local mode. Returns the group left and
    /// the list last persisted locally; group-mode edits are not merged back.
    pub fn leave_group(
        &mut self,
        store: &mut ProfileStore,
    ) -> Result<(Option<String>, Vec<Task>), StoreError> {
        store.clear_group_id(&self.user_id)?;
        let previous = match std::mem::replace(&mut self.mode, SyncMode::Local) {
            SyncMode::Grouped(id) => Some(id),
            SyncMode::Local => None,
        };
        let tasks = store.tasks(&self.user_id)?;
        log::info!(
            "{} left group {:?}, restored {} local tasks",
            self.user_id,
            previous,
            tasks.len()
        );
        Ok((previous, tasks))
    }
}

/// Fetch the document, replace `user_id`'s tasks and write it all back.
///
/// Not atomic: whatever another member wrote between the read and the write
/// is overwritten.
pub fn write_member_tasks(
    groups: Arc<dyn GroupService>,
    group_id: String,
    user_id: String,
    tasks: Vec<Task>,
) -> BoxFuture<'static, Result<GroupWrite, GroupError>> {
    Box::pin(async move {
        let Some(snapshot) = groups.get(&group_id).await? else {
            log::warn!("Group {} vanished, skipping write for {}", group_id, user_id);
            return Ok(GroupWrite::Missing);
        };
        write_from_snapshot(groups.as_ref(), snapshot, &user_id, tasks).await
    })
}

/// Second half of the read-modify-write, on an already fetched document.
pub async fn write_from_snapshot(
    groups: &dyn GroupService,
    mut snapshot: CollabGroup,
    user_id: &str,
    tasks: Vec<Task>,
) -> Result<GroupWrite, GroupError> {
    if !snapshot.set_member_tasks(user_id, tasks) {
        log::debug!("{} is not a member of {}, skipping write", user_id, snapshot.id);
        return Ok(GroupWrite::NotMember);
    }
    groups.put(snapshot).await?;
    Ok(GroupWrite::Written)
}

/// Join `group_id` carrying the local list. If already a member, the entry's
/// tasks are overwritten with `tasks`. `None` if the group does not exist.
pub async fn join_group(
    groups: &dyn GroupService,
    group_id: &str,
    user: &User,
    tasks: Vec<Task>,
) -> Result<Option<CollabGroup>, GroupError> {
    let Some(mut group) = groups
        .join(group_id, Member::from_user(user, tasks.clone()))
        .await?
    else {
        return Ok(None);
    };

    let stale = group.member(&user.id).is_none_or(|m| m.tasks != tasks);
    if stale && group.set_member_tasks(&user.id, tasks) {
        groups.put(group.clone()).await?;
    }
    Ok(Some(group))
}

/// Create a group under a fresh passkey with `user` as its only member,
/// then move the local list into that member entry.
pub async fn create_group(
    groups: &dyn GroupService,
    user: &User,
    tasks: Vec<Task>,
) -> Result<CollabGroup, GroupError> {
    let mut last_err = None;
    for _ in 0..CREATE_ATTEMPTS {
        let fresh = CollabGroup::new(generate_passkey(), Member::from_user(user, Vec::new()));
        match groups.create(fresh).await {
            Ok(mut group) => {
                if !tasks.is_empty() && group.set_member_tasks(&user.id, tasks) {
                    groups.put(group.clone()).await?;
                }
                return Ok(group);
            }
            Err(GroupError::AlreadyExists(id)) => {
                log::warn!("Passkey {} already taken, retrying", id);
                last_err = Some(GroupError::AlreadyExists(id));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| GroupError::Transport("could not create group".to_string())))
}

/// Remove `user`'s member entry. Other entries are left as they are.
pub async fn leave_group(groups: &dyn GroupService, group_id: &str, user: &User) -> Result<(), GroupError> {
    groups
        .remove_member(group_id, &Member::from_user(user, Vec::new()))
        .await
}

/// The tasks a group delivery holds for `user_id`, if still a member.
pub fn member_tasks(group: &CollabGroup, user_id: &str) -> Option<Vec<Task>> {
    group.member(user_id).map(|m| m.tasks.clone())
}
