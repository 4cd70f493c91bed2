use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::StreamExt;

use super::group::{GroupError, GroupEvent, GroupService, GroupSubscription, Unsubscribe};
use crate::core::group::{CollabGroup, Member};
use crate::core::purpose::Purpose;

#[derive(Default)]
struct Inner {
    groups: HashMap<String, CollabGroup>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
}

struct Subscriber {
    id: u64,
    group_id: String,
    tx: mpsc::UnboundedSender<GroupEvent>,
}

impl Inner {
    fn notify(&mut self, group_id: &str) {
        let event = match self.groups.get(group_id) {
            Some(group) => GroupEvent::Changed(group.clone()),
            None => GroupEvent::Removed(group_id.to_string()),
        };
        self.subscribers
            .retain(|s| s.group_id != group_id || s.tx.unbounded_send(event.clone()).is_ok());
    }
}

/// In-process group document store with push notifications.
///
/// Clones share the same documents, so several sessions in one process see
/// each other's writes.
#[derive(Clone, Default)]
pub struct MemoryGroupService {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryGroupService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Administrative removal; not reachable from the app itself.
    pub fn delete(&self, group_id: &str) {
        let mut inner = self.lock();
        if inner.groups.remove(group_id).is_some() {
            inner.notify(group_id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

impl GroupService for MemoryGroupService {
    fn create(&self, group: CollabGroup) -> BoxFuture<'static, Result<CollabGroup, GroupError>> {
        let mut inner = self.lock();
        let result = if inner.groups.contains_key(&group.id) {
            Err(GroupError::AlreadyExists(group.id.clone()))
        } else {
            inner.groups.insert(group.id.clone(), group.clone());
            inner.notify(&group.id);
            Ok(group)
        };
        Box::pin(async move { result })
    }

    fn get(&self, group_id: &str) -> BoxFuture<'static, Result<Option<CollabGroup>, GroupError>> {
        let found = self.lock().groups.get(group_id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn put(&self, group: CollabGroup) -> BoxFuture<'static, Result<(), GroupError>> {
        let mut inner = self.lock();
        let id = group.id.clone();
        inner.groups.insert(id.clone(), group);
        inner.notify(&id);
        Box::pin(async { Ok(()) })
    }

    fn join(
        &self,
        group_id: &str,
        member: Member,
    ) -> BoxFuture<'static, Result<Option<CollabGroup>, GroupError>> {
        let mut inner = self.lock();
        let result = match inner.groups.get_mut(group_id) {
            None => None,
            Some(group) => {
                let changed = group.add_member(member);
                let snapshot = group.clone();
                if changed {
                    inner.notify(group_id);
                }
                Some(snapshot)
            }
        };
        Box::pin(async move { Ok(result) })
    }

    fn remove_member(&self, group_id: &str, member: &Member) -> BoxFuture<'static, Result<(), GroupError>> {
        let mut inner = self.lock();
        let result = match inner.groups.get_mut(group_id) {
            None => Err(GroupError::NotFound(group_id.to_string())),
            Some(group) => {
                if group.remove_member(&member.id).is_some() {
                    inner.notify(group_id);
                }
                Ok(())
            }
        };
        Box::pin(async move { result })
    }

    fn set_purpose(&self, group_id: &str, purpose: &Purpose) -> BoxFuture<'static, Result<(), GroupError>> {
        let mut inner = self.lock();
        let result = match inner.groups.get_mut(group_id) {
            None => Err(GroupError::NotFound(group_id.to_string())),
            Some(group) => {
                group.set_purpose(purpose);
                inner.notify(group_id);
                Ok(())
            }
        };
        Box::pin(async move { result })
    }

    fn subscribe(&self, group_id: &str) -> GroupSubscription {
        let (tx, rx) = mpsc::unbounded();
        let mut inner = self.lock();

        let current = match inner.groups.get(group_id) {
            Some(group) => GroupEvent::Changed(group.clone()),
            None => GroupEvent::Removed(group_id.to_string()),
        };
        // Receiver is alive, the send cannot fail.
        let _ = tx.unbounded_send(current);

        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscribers.push(Subscriber {
            id,
            group_id: group_id.to_string(),
            tx,
        });
        drop(inner);

        let shared = Arc::clone(&self.inner);
        let unsubscribe = Unsubscribe::new(move || {
            let mut inner = shared.lock().unwrap_or_else(|e| e.into_inner());
            inner.subscribers.retain(|s| s.id != id);
        });
        GroupSubscription::new(rx.boxed(), unsubscribe)
    }
}
