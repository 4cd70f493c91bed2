use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;

use crate::core::group::{CollabGroup, Member};
use crate::core::purpose::Purpose;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("Group not found: {0}")]
    NotFound(String),

    #[error("Group already exists: {0}")]
    AlreadyExists(String),

    #[error("Group service request failed: {0}")]
    Transport(String),

    #[error("Malformed group document: {0}")]
    Decode(String),
}

/// A remote change to a watched group document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    /// The full document after the change.
    Changed(CollabGroup),
    /// The document no longer exists.
    Removed(String),
}

/// Cancels a subscription when called or dropped.
pub struct Unsubscribe(Option<Box<dyn FnOnce() + Send>>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn cancel(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

/// Live view of one group document: a stream of [`GroupEvent`]s plus the
/// handle that tears it down. The first event is the current document.
pub struct GroupSubscription {
    events: BoxStream<'static, GroupEvent>,
    unsubscribe: Unsubscribe,
}

impl GroupSubscription {
    pub fn new(events: BoxStream<'static, GroupEvent>, unsubscribe: Unsubscribe) -> Self {
        Self { events, unsubscribe }
    }

    /// Split so the stream can be driven elsewhere while the owner keeps
    /// the ability to cancel.
    pub fn into_parts(self) -> (BoxStream<'static, GroupEvent>, Unsubscribe) {
        (self.events, self.unsubscribe)
    }
}

impl Stream for GroupSubscription {
    type Item = GroupEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<GroupEvent>> {
        self.events.as_mut().poll_next(cx)
    }
}

/// Remote store of shared group documents.
///
/// Writes are whole-document or whole-field replacements with no version
/// check; concurrent writers race and the last one to land wins.
pub trait GroupService: Send + Sync {
    /// Store a new document. Fails if the passkey is already taken.
    fn create(&self, group: CollabGroup) -> BoxFuture<'static, Result<CollabGroup, GroupError>>;

    fn get(&self, group_id: &str) -> BoxFuture<'static, Result<Option<CollabGroup>, GroupError>>;

    /// Overwrite the whole document.
    fn put(&self, group: CollabGroup) -> BoxFuture<'static, Result<(), GroupError>>;

    /// Add `member` unless already listed. `None` if the group does not exist.
    fn join(
        &self,
        group_id: &str,
        member: Member,
    ) -> BoxFuture<'static, Result<Option<CollabGroup>, GroupError>>;

    /// Remove the entry whose id matches `member.id` from `group_id`.
    fn remove_member(&self, group_id: &str, member: &Member) -> BoxFuture<'static, Result<(), GroupError>>;

    fn set_purpose(&self, group_id: &str, purpose: &Purpose) -> BoxFuture<'static, Result<(), GroupError>>;

    fn subscribe(&self, group_id: &str) -> GroupSubscription;
}
