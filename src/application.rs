use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};

use crate::config::FaceTaskConfig;
use crate::core::analytics::{self, MemberProgress, TaskAnalytics};
use crate::core::assistant::{
    Assistant, DisabledAssistant, FaceLoginRequest, Reminder, RemindersRequest,
    SuggestTasksRequest,
};
use crate::core::group::CollabGroup;
use crate::core::purpose::Purpose;
use crate::core::reminder::ReminderQueue;
use crate::core::streak::{self, StreakStatus};
use crate::core::suggestion;
use crate::core::task::{Task, TaskList};
use crate::core::user::User;
use crate::error::{Error, ValidationError};
use crate::message::{AuthMode, Message, Notice, Page, PurposeForm};
use crate::store::ProfileStore;
use crate::sync::anthropic::{self, AnthropicAssistant};
use crate::sync::group::{GroupError, GroupEvent, GroupService, Unsubscribe};
use crate::sync::{self, Dispatch, GroupWrite, SyncDispatcher, SyncMode};

/// Source of "now" in the user's timezone.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Local::now)
}

/// Work requested by [`FaceTask::update`], executed by the runtime.
pub enum Action {
    None,
    /// Run a future and feed its message back into `update`.
    Perform(BoxFuture<'static, Message>),
    /// Forward every message of a stream until it ends.
    Listen(BoxStream<'static, Message>),
    Batch(Vec<Action>),
}

impl Action {
    pub fn perform<T: 'static>(
        future: impl Future<Output = T> + Send + 'static,
        map: impl FnOnce(T) -> Message + Send + 'static,
    ) -> Self {
        Self::Perform(future.map(map).boxed())
    }

    pub fn batch(actions: impl IntoIterator<Item = Action>) -> Self {
        let actions: Vec<Action> = actions
            .into_iter()
            .filter(|a| !matches!(a, Action::None))
            .collect();
        if actions.is_empty() {
            Self::None
        } else {
            Self::Batch(actions)
        }
    }
}

/// Per-call loading flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Loading {
    pub login: bool,
    pub suggestions: bool,
    pub group: bool,
}

/// State that only exists while someone is logged in.
struct Session {
    user: User,
    tasks: TaskList,
    dispatcher: SyncDispatcher,
    purpose: Option<Purpose>,
    streak: StreakStatus,
    group: Option<CollabGroup>,
    subscription: Option<Unsubscribe>,
    /// Grouped session whose first group delivery has not arrived yet.
    /// The view is empty and edits are refused until it does.
    awaiting_group: bool,
}

impl Session {
    /// Whether task edits may be applied and dispatched.
    fn editable(&self) -> bool {
        !self.awaiting_group
    }
}

pub struct FaceTask {
    config: FaceTaskConfig,
    store: ProfileStore,
    groups: Arc<dyn GroupService>,
    assistant: Arc<dyn Assistant>,
    clock: Clock,
    page: Page,
    user: Option<User>,
    session: Option<Session>,
    notices: Vec<Notice>,
    loading: Loading,
    suggestions: Vec<String>,
    reminders: ReminderQueue,
}

fn reminder_queue(config: &FaceTaskConfig) -> ReminderQueue {
    ReminderQueue::new(Duration::seconds(config.reminder_min_interval_secs as i64))
}

impl FaceTask {
    pub fn new(
        config: FaceTaskConfig,
        store: ProfileStore,
        groups: Arc<dyn GroupService>,
        assistant: Arc<dyn Assistant>,
        clock: Clock,
    ) -> (Self, Action) {
        let reminders = reminder_queue(&config);
        let mut app = Self {
            config,
            store,
            groups,
            assistant,
            clock,
            page: Page::Auth(AuthMode::Register),
            user: None,
            session: None,
            notices: Vec::new(),
            loading: Loading::default(),
            suggestions: Vec::new(),
            reminders,
        };
        let action = app.restore();
        (app, action)
    }

    /// Route to the right page from what the device remembers.
    fn restore(&mut self) -> Action {
        let loaded = self
            .store
            .user()
            .and_then(|user| Ok((user, self.store.session()?)));

        match loaded {
            Err(e) => self.fail(e.into()),
            Ok((None, _)) => {
                self.page = Page::Auth(AuthMode::Register);
                Action::None
            }
            Ok((Some(user), session)) => {
                self.user = Some(user.clone());
                match session {
                    Some(s) if s.user_id == user.id => self.begin_session(user),
                    _ => {
                        self.page = Page::Auth(AuthMode::Login);
                        Action::None
                    }
                }
            }
        }
    }

    fn now(&self) -> DateTime<Local> {
        (self.clock)()
    }

    pub fn update(&mut self, message: Message) -> Action {
        match message {
            Message::Open(page) => {
                match page {
                    Page::Auth(_) if self.session.is_none() => self.page = page,
                    Page::Auth(_) => {}
                    Page::Tasks | Page::Collab if self.session.is_some() => self.page = page,
                    Page::Tasks | Page::Collab => {
                        self.notices.push(Notice::inline("Please log in first."));
                    }
                }
                Action::None
            }

            Message::Register { name, photo } => match self.register(&name, &photo) {
                Ok(action) => action,
                Err(e) => self.fail(e),
            },

            Message::Login { photo } => {
                let Some(user) = self.user.clone() else {
                    self.page = Page::Auth(AuthMode::Register);
                    self.notices
                        .push(Notice::inline("No profile on this device. Please register."));
                    return Action::None;
                };
                if photo.trim().is_empty() {
                    return self.fail(Error::Capture(
                        "Could not capture an image. Please check your camera and permissions."
                            .to_string(),
                    ));
                }
                self.loading.login = true;
                Action::perform(
                    self.assistant
                        .face_login(FaceLoginRequest::for_user(&user, photo)),
                    Message::FaceLoginCompleted,
                )
            }

            Message::FaceLoginCompleted(result) => {
                self.loading.login = false;
                match result {
                    Ok(resp) if resp.success => {
                        let Some(user) = self.user.clone() else {
                            return Action::None;
                        };
                        if let Err(e) = self.store.start_session(&user.id) {
                            return self.fail(e.into());
                        }
                        self.notices
                            .push(Notice::transient(format!("Welcome back, {}!", user.name)));
                        self.begin_session(user)
                    }
                    Ok(_) => self.fail(Error::Remote(
                        "Face not recognized. Please try again.".to_string(),
                    )),
                    Err(e) => self.fail(Error::Remote(format!("Login failed: {}", e))),
                }
            }

            Message::Logout => {
                if let Err(e) = self.store.end_session() {
                    return self.fail(e.into());
                }
                self.end_session_state();
                self.page = Page::Auth(AuthMode::Login);
                log::info!("Logged out");
                Action::None
            }

            Message::AddTask { title, due } => self.add_task(&title, due),

            Message::ToggleTask(id) => {
                let Some(session) = self.session.as_mut() else {
                    return Action::None;
                };
                if !session.editable() {
                    return self.still_loading();
                }
                if session.tasks.toggle(&id) {
                    self.persist()
                } else {
                    Action::None
                }
            }

            Message::DeleteTask(id) => {
                let Some(session) = self.session.as_mut() else {
                    return Action::None;
                };
                if !session.editable() {
                    return self.still_loading();
                }
                match session.tasks.delete(&id) {
                    Some(task) => {
                        log::info!("Deleted task: {}", task.title);
                        self.persist()
                    }
                    None => Action::None,
                }
            }

            Message::GroupWriteCompleted(result) => {
                match result {
                    Ok(GroupWrite::Written) => log::debug!("Group task list written"),
                    Ok(outcome) => log::debug!("Group write skipped: {:?}", outcome),
                    Err(e) => return self.fail(Error::Remote(format!("Failed to sync tasks: {}", e))),
                }
                Action::None
            }

            Message::SetPurpose(form) => {
                let Some(session) = self.session.as_mut() else {
                    return Action::None;
                };
                let purpose = match form.into_purpose() {
                    Ok(p) => p,
                    Err(e) => return self.fail(e.into()),
                };
                if let Err(e) = self.store.save_purpose(&session.user.id, &purpose) {
                    return self.fail(e.into());
                }
                session.purpose = Some(purpose);
                self.notices.push(Notice::transient("Purpose saved."));
                Action::None
            }

            Message::RequestSuggestions(input) => {
                let Some(session) = self.session.as_ref() else {
                    return Action::None;
                };
                let prompt = suggestion::prompt_for(&input);
                if prompt.is_empty() {
                    self.notices
                        .push(Notice::inline("Tell us how you feel or pick a category."));
                    return Action::None;
                }
                let purpose = session
                    .group
                    .as_ref()
                    .and_then(CollabGroup::group_purpose)
                    .or_else(|| session.purpose.clone());
                let req = SuggestTasksRequest::new(&prompt, purpose.as_ref(), Some(session.streak));
                self.loading.suggestions = true;
                self.suggestions.clear();
                Action::perform(self.assistant.suggest_tasks(req), |r| {
                    Message::SuggestionsReady(r.map(|resp| resp.into_suggestions()))
                })
            }

            Message::SuggestionsReady(result) => {
                self.loading.suggestions = false;
                match result {
                    Ok(list) => {
                        if list.is_empty() {
                            self.notices.push(Notice::transient("No suggestions this time."));
                        }
                        self.suggestions = list;
                        Action::None
                    }
                    Err(e) => self.fail(Error::Remote(format!("Could not get suggestions: {}", e))),
                }
            }

            Message::AddSuggestion(title) => {
                let due = suggestion::suggestion_due(&self.now());
                let before = self.tasks().len();
                let action = self.add_task(&title, due);
                if self.tasks().len() > before {
                    self.suggestions.retain(|s| s != &title);
                }
                action
            }

            Message::ReminderTick => {
                let now = self.now().with_timezone(&Utc);
                let Some(session) = self.session.as_ref() else {
                    return Action::None;
                };
                if !self.reminders.should_check(now, &session.tasks) {
                    return Action::None;
                }
                let req = RemindersRequest::new(now, session.tasks.tasks());
                self.reminders.mark_checked(now);
                Action::perform(self.assistant.task_reminders(req), |r| {
                    Message::RemindersReady(r.map(|resp| resp.reminders))
                })
            }

            Message::RemindersReady(result) => {
                match result {
                    Ok(list) if self.session.is_some() => {
                        log::debug!("{} reminders received", list.len());
                        self.reminders.push(list);
                    }
                    Ok(_) => {}
                    // Background check: logged, not surfaced.
                    Err(e) => log::warn!("Reminder check failed: {}", e),
                }
                Action::None
            }

            Message::DismissReminder => {
                self.reminders.dismiss();
                Action::None
            }

            Message::CreateGroup => {
                let Some(session) = self.session.as_ref() else {
                    return Action::None;
                };
                if let SyncMode::Grouped(id) = session.dispatcher.mode() {
                    self.notices
                        .push(Notice::inline(format!("Already in group {}.", id)));
                    return Action::None;
                }
                let groups = Arc::clone(&self.groups);
                let user = session.user.clone();
                let tasks = session.tasks.tasks().to_vec();
                self.loading.group = true;
                Action::perform(
                    async move { sync::create_group(groups.as_ref(), &user, tasks).await },
                    Message::GroupCreated,
                )
            }

            Message::GroupCreated(result) => {
                self.loading.group = false;
                match result {
                    Ok(group) => {
                        self.notices.push(Notice::transient(format!(
                            "Group created. Share the passkey {} with your friends.",
                            group.id
                        )));
                        self.enter_group(group)
                    }
                    Err(e) => self.fail(Error::Remote(format!("Failed to create group: {}", e))),
                }
            }

            Message::JoinGroup(passkey) => {
                let passkey = passkey.trim().to_string();
                if passkey.is_empty() {
                    return self.fail(ValidationError::EmptyPasskey.into());
                }
                let Some(session) = self.session.as_ref() else {
                    return Action::None;
                };
                if let SyncMode::Grouped(id) = session.dispatcher.mode() {
                    self.notices
                        .push(Notice::inline(format!("Already in group {}.", id)));
                    return Action::None;
                }
                let groups = Arc::clone(&self.groups);
                let user = session.user.clone();
                let tasks = session.tasks.tasks().to_vec();
                self.loading.group = true;
                Action::perform(
                    async move { sync::join_group(groups.as_ref(), &passkey, &user, tasks).await },
                    Message::GroupJoined,
                )
            }

            Message::GroupJoined(result) => {
                self.loading.group = false;
                match result {
                    Ok(Some(group)) => {
                        self.notices
                            .push(Notice::transient(format!("Joined group {}.", group.id)));
                        self.enter_group(group)
                    }
                    Ok(None) => self.fail(Error::Remote(
                        "Group not found. Please check the passkey.".to_string(),
                    )),
                    Err(e) => self.fail(Error::Remote(format!("Failed to join group: {}", e))),
                }
            }

            Message::LeaveGroup => {
                let Some(session) = self.session.as_ref() else {
                    return Action::None;
                };
                let Some(group_id) = session.dispatcher.mode().group_id().map(str::to_string) else {
                    self.notices.push(Notice::inline("You are not in a group."));
                    return Action::None;
                };
                let groups = Arc::clone(&self.groups);
                let user = session.user.clone();
                self.loading.group = true;
                Action::perform(
                    async move {
                        match sync::leave_group(groups.as_ref(), &group_id, &user).await {
                            // Nothing left to leave.
                            Err(GroupError::NotFound(_)) => Ok(()),
                            other => other,
                        }
                    },
                    Message::GroupLeft,
                )
            }

            Message::GroupLeft(result) => {
                self.loading.group = false;
                match result {
                    Ok(()) => self.leave_locally("You left the group."),
                    Err(e) => self.fail(Error::Remote(format!("Failed to leave group: {}", e))),
                }
            }

            Message::SetGroupPurpose(form) => {
                let Some(group_id) = self.mode().and_then(SyncMode::group_id).map(str::to_string)
                else {
                    self.notices.push(Notice::inline("You are not in a group."));
                    return Action::None;
                };
                let purpose = match form.into_purpose() {
                    Ok(p) => p,
                    Err(e) => return self.fail(e.into()),
                };
                Action::perform(
                    self.groups.set_purpose(&group_id, &purpose),
                    Message::GroupPurposeSet,
                )
            }

            Message::GroupPurposeSet(result) => match result {
                Ok(()) => {
                    self.notices.push(Notice::transient("Group purpose updated."));
                    Action::None
                }
                Err(e) => self.fail(Error::Remote(format!("Failed to set group purpose: {}", e))),
            },

            Message::Group(GroupEvent::Changed(group)) => {
                let Some(session) = self.session.as_mut() else {
                    return Action::None;
                };
                if session.dispatcher.mode().group_id() != Some(group.id.as_str()) {
                    log::debug!("Ignoring update for group {}", group.id);
                    return Action::None;
                }
                match sync::member_tasks(&group, &session.user.id) {
                    Some(tasks) => session.tasks.replace(tasks),
                    None => log::warn!(
                        "{} is not listed in group {}, keeping current view",
                        session.user.id,
                        group.id
                    ),
                }
                if session.awaiting_group {
                    log::debug!("First delivery for group {} received", group.id);
                    session.awaiting_group = false;
                    self.loading.group = false;
                }
                session.group = Some(group);
                Action::None
            }

            Message::Group(GroupEvent::Removed(group_id)) => {
                if self.mode().and_then(SyncMode::group_id) != Some(group_id.as_str()) {
                    return Action::None;
                }
                log::warn!("Group {} no longer exists", group_id);
                self.leave_locally("This group no longer exists.")
            }

            Message::SetAnthropicApiKey(key) => {
                let key = key.trim().to_string();
                if key.is_empty() {
                    self.assistant = Arc::new(DisabledAssistant);
                    return Action::perform(anthropic::clear_api_key(), |r| {
                        Message::AnthropicKeySaved(r.map(|_| "API key removed".to_string()))
                    });
                }
                let model = self.config.anthropic_model.clone();
                self.assistant = Arc::new(AnthropicAssistant::new(key.clone(), model.clone()));
                Action::perform(
                    async move {
                        anthropic::store_api_key(&key).await?;
                        anthropic::test_api_key(&key, &model).await
                    },
                    Message::AnthropicKeySaved,
                )
            }

            Message::AnthropicKeySaved(result) => match result {
                Ok(msg) => {
                    self.notices.push(Notice::transient(msg));
                    Action::None
                }
                Err(e) => self.fail(Error::Remote(e)),
            },

            Message::ToggleDebugLogging => {
                let enabled = !facetask::debug_logging();
                facetask::set_debug_logging(enabled);
                log::info!("Debug logging {}", if enabled { "enabled" } else { "disabled" });
                self.notices.push(Notice::transient(format!(
                    "Debug logging {}.",
                    if enabled { "on" } else { "off" }
                )));
                Action::None
            }

            Message::Quit => Action::None,
        }
    }

    fn register(&mut self, name: &str, photo: &str) -> Result<Action, Error> {
        let user = User::register(name, photo)?;
        self.end_session_state();
        self.store.save_user(&user)?;
        self.store.start_session(&user.id)?;
        log::info!("Registered {}", user.id);
        self.user = Some(user.clone());
        self.notices
            .push(Notice::transient(format!("Welcome, {}!", user.name)));
        self.open_session(user)
    }

    fn begin_session(&mut self, user: User) -> Action {
        match self.open_session(user) {
            Ok(action) => action,
            Err(e) => self.fail(e),
        }
    }

    /// Load the user's state, record today's visit and pick the sync mode.
    fn open_session(&mut self, user: User) -> Result<Action, Error> {
        let today = self.now().date_naive();
        let tasks = self.store.tasks(&user.id)?;
        let purpose = self.store.purpose(&user.id)?;
        let (record, streak) = streak::record_visit(self.store.streak(&user.id)?, today);
        self.store.save_streak(&user.id, &record)?;

        let dispatcher = SyncDispatcher::for_session(&self.store, &user.id, Arc::clone(&self.groups));
        let watch = dispatcher.mode().group_id().map(str::to_string);
        // The stored list is not authoritative in group mode.
        let tasks = if watch.is_some() { Vec::new() } else { tasks };
        self.loading.group = watch.is_some();
        log::info!(
            "Session opened for {}: {} tasks, streak day {}",
            user.id,
            tasks.len(),
            streak.day_count
        );

        self.session = Some(Session {
            user,
            tasks: TaskList::from_tasks(tasks),
            dispatcher,
            purpose,
            streak,
            group: None,
            subscription: None,
            awaiting_group: watch.is_some(),
        });
        self.page = Page::Tasks;

        Ok(match watch {
            Some(group_id) => self.watch_group(&group_id),
            None => Action::None,
        })
    }

    fn end_session_state(&mut self) {
        if let Some(session) = self.session.take() {
            if let Some(sub) = session.subscription {
                sub.cancel();
            }
        }
        self.suggestions.clear();
        self.reminders = reminder_queue(&self.config);
        self.loading = Loading::default();
    }

    /// Subscribe to `group_id`, replacing any previous subscription.
    fn watch_group(&mut self, group_id: &str) -> Action {
        let (events, unsubscribe) = self.groups.subscribe(group_id).into_parts();
        if let Some(session) = self.session.as_mut() {
            if let Some(previous) = session.subscription.replace(unsubscribe) {
                previous.cancel();
            }
        }
        Action::Listen(events.map(Message::Group).boxed())
    }

    fn enter_group(&mut self, group: CollabGroup) -> Action {
        let Some(session) = self.session.as_mut() else {
            return Action::None;
        };
        if let Err(e) = session.dispatcher.enter_group(&mut self.store, &group.id) {
            return self.fail(e.into());
        }
        if let Some(tasks) = sync::member_tasks(&group, &session.user.id) {
            session.tasks.replace(tasks);
        }
        let group_id = group.id.clone();
        session.group = Some(group);
        session.awaiting_group = false;
        self.page = Page::Collab;
        self.watch_group(&group_id)
    }

    /// Back to local mode with whatever was last stored locally.
    fn leave_locally(&mut self, text: &str) -> Action {
        let Some(session) = self.session.as_mut() else {
            return Action::None;
        };
        if let Some(sub) = session.subscription.take() {
            sub.cancel();
        }
        session.group = None;
        session.awaiting_group = false;
        self.loading.group = false;
        match session.dispatcher.leave_group(&mut self.store) {
            Ok((_, tasks)) => {
                session.tasks.replace(tasks);
                self.notices.push(Notice::transient(text));
                self.page = Page::Tasks;
                Action::None
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn add_task(&mut self, title: &str, due: Option<DateTime<Utc>>) -> Action {
        let now = self.now().with_timezone(&Utc);
        let Some(session) = self.session.as_mut() else {
            return Action::None;
        };
        if !session.editable() {
            return self.still_loading();
        }
        match session.tasks.add(&session.user.id, title, due, now) {
            Ok(task) => {
                log::info!("Added task: {}", task.title);
                self.persist()
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn still_loading(&mut self) -> Action {
        self.notices
            .push(Notice::inline("Still loading your group's tasks. Try again in a moment."));
        Action::None
    }

    /// Hand the current list to the dispatcher.
    fn persist(&mut self) -> Action {
        let Some(session) = self.session.as_ref() else {
            return Action::None;
        };
        match session.dispatcher.dispatch(&mut self.store, session.tasks.tasks()) {
            Ok(Dispatch::Stored) => Action::None,
            Ok(Dispatch::Remote(write)) => Action::perform(write, Message::GroupWriteCompleted),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Turn a failure into a notice. Corrupted state wipes the device and
    /// sends the user back to registration.
    fn fail(&mut self, err: Error) -> Action {
        match err {
            Error::CorruptState(reason) => {
                log::error!("Corrupted local state ({}), clearing profile", reason);
                self.end_session_state();
                if let Err(e) = self.store.clear_all() {
                    log::error!("Failed to clear profile: {}", e);
                }
                self.user = None;
                self.page = Page::Auth(AuthMode::Register);
                self.notices.push(Notice::transient(
                    "Saved data was unreadable and has been cleared. Please register again.",
                ));
            }
            Error::Validation(e) => self.notices.push(Notice::inline(e.to_string())),
            Error::Capture(msg) => {
                log::warn!("Capture failed: {}", msg);
                self.notices.push(Notice::persistent(msg));
            }
            Error::Remote(msg) => {
                log::warn!("{}", msg);
                self.notices.push(Notice::transient(msg));
            }
            Error::Store(e) => {
                log::error!("Failed to save: {}", e);
                self.notices
                    .push(Notice::transient(format!("Could not save your changes: {}", e)));
            }
        }
        Action::None
    }

    // Read-only view state

    pub fn page(&self) -> Page {
        self.page
    }

    /// The registered profile, logged in or not.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn tasks(&self) -> &[Task] {
        self.session.as_ref().map(|s| s.tasks.tasks()).unwrap_or(&[])
    }

    pub fn mode(&self) -> Option<&SyncMode> {
        self.session.as_ref().map(|s| s.dispatcher.mode())
    }

    pub fn group(&self) -> Option<&CollabGroup> {
        self.session.as_ref().and_then(|s| s.group.as_ref())
    }

    pub fn purpose(&self) -> Option<&Purpose> {
        self.session.as_ref().and_then(|s| s.purpose.as_ref())
    }

    pub fn streak(&self) -> Option<StreakStatus> {
        self.session.as_ref().map(|s| s.streak)
    }

    pub fn analytics(&self) -> Option<TaskAnalytics> {
        let session = self.session.as_ref()?;
        Some(TaskAnalytics::compute(session.tasks.tasks(), &self.now()))
    }

    pub fn member_progress(&self) -> Vec<MemberProgress> {
        match self.session.as_ref() {
            Some(Session {
                group: Some(group),
                user,
                ..
            }) => analytics::member_progress(group, &user.id, &self.now()),
            _ => Vec::new(),
        }
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn active_reminder(&self) -> Option<&Reminder> {
        self.reminders.active()
    }

    pub fn pending_reminders(&self) -> usize {
        self.reminders.pending()
    }

    pub fn loading(&self) -> Loading {
        self.loading
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assistant::{
        FaceLoginResponse, RemindersResponse, SuggestTasksResponse,
    };
    use crate::core::group::Member;
    use crate::core::purpose::ExamDuration;
    use crate::message::NoticeKind;
    use crate::store::{FileStore, KeyValueStore, MemoryStore};
    use crate::sync::memory::MemoryGroupService;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const PHOTO: &str = "data:image/jpeg;base64,/9j/4AAQ";

    #[derive(Default)]
    struct Calls {
        face: usize,
        reminders: usize,
        suggest: Vec<SuggestTasksRequest>,
    }

    /// Canned answers instead of a model.
    #[derive(Clone, Default)]
    struct ScriptedAssistant {
        recognize: bool,
        suggestions: Vec<String>,
        reminders: Vec<Reminder>,
        calls: Arc<Mutex<Calls>>,
    }

    impl Assistant for ScriptedAssistant {
        fn face_login(
            &self,
            req: FaceLoginRequest,
        ) -> BoxFuture<'static, Result<FaceLoginResponse, String>> {
            self.calls.lock().unwrap().face += 1;
            let success = self.recognize;
            Box::pin(async move {
                Ok(FaceLoginResponse {
                    user_id: req.expected_user_id,
                    success,
                })
            })
        }

        fn suggest_tasks(
            &self,
            req: SuggestTasksRequest,
        ) -> BoxFuture<'static, Result<SuggestTasksResponse, String>> {
            self.calls.lock().unwrap().suggest.push(req);
            let suggestions = self.suggestions.clone();
            Box::pin(async move { Ok(SuggestTasksResponse { suggestions }) })
        }

        fn task_reminders(
            &self,
            _req: RemindersRequest,
        ) -> BoxFuture<'static, Result<RemindersResponse, String>> {
            self.calls.lock().unwrap().reminders += 1;
            let reminders = self.reminders.clone();
            Box::pin(async move { Ok(RemindersResponse { reminders }) })
        }
    }

    /// Wednesday morning.
    fn wednesday() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 21, 9, 0, 0).unwrap()
    }

    fn tomorrow_noon() -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2026, 10, 22, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Drives an app the way the runtime does, but inline and in order.
    struct Harness {
        app: FaceTask,
        now: Arc<Mutex<DateTime<Local>>>,
        listeners: Vec<BoxStream<'static, Message>>,
    }

    impl Harness {
        async fn start(
            kv: Box<dyn KeyValueStore>,
            groups: MemoryGroupService,
            assistant: Arc<dyn Assistant>,
        ) -> Self {
            Self::start_at(kv, groups, assistant, wednesday()).await
        }

        async fn start_at(
            kv: Box<dyn KeyValueStore>,
            groups: MemoryGroupService,
            assistant: Arc<dyn Assistant>,
            at: DateTime<Local>,
        ) -> Self {
            let now = Arc::new(Mutex::new(at));
            let clock_now = Arc::clone(&now);
            let clock: Clock = Arc::new(move || *clock_now.lock().unwrap());
            let (app, action) = FaceTask::new(
                FaceTaskConfig::default(),
                ProfileStore::new(kv),
                Arc::new(groups),
                assistant,
                clock,
            );
            let mut h = Self {
                app,
                now,
                listeners: Vec::new(),
            };
            h.run(action).await;
            h
        }

        async fn fresh(groups: MemoryGroupService) -> Self {
            Self::start(
                Box::new(MemoryStore::new()),
                groups,
                Arc::new(ScriptedAssistant::default()),
            )
            .await
        }

        async fn run(&mut self, action: Action) {
            let mut queue = VecDeque::from([action]);
            while let Some(action) = queue.pop_front() {
                match action {
                    Action::None => {}
                    Action::Batch(list) => queue.extend(list),
                    Action::Perform(fut) => {
                        let msg = fut.await;
                        queue.push_back(self.app.update(msg));
                    }
                    Action::Listen(stream) => self.listeners.push(stream),
                }
            }
        }

        async fn send(&mut self, msg: Message) {
            let action = self.app.update(msg);
            self.run(action).await;
        }

        /// Deliver every subscription event that is already queued.
        async fn pump(&mut self) {
            loop {
                let mut delivered = Vec::new();
                for stream in self.listeners.iter_mut() {
                    while let Some(Some(msg)) = stream.next().now_or_never() {
                        delivered.push(msg);
                    }
                }
                if delivered.is_empty() {
                    break;
                }
                for msg in delivered {
                    self.send(msg).await;
                }
            }
        }

        async fn register(&mut self, name: &str) {
            self.send(Message::Register {
                name: name.to_string(),
                photo: PHOTO.to_string(),
            })
            .await;
        }

        async fn add(&mut self, title: &str, due: DateTime<Utc>) {
            self.send(Message::AddTask {
                title: title.to_string(),
                due: Some(due),
            })
            .await;
        }

        fn task_id(&self, title: &str) -> String {
            self.app
                .tasks()
                .iter()
                .find(|t| t.title == title)
                .map(|t| t.id.clone())
                .unwrap()
        }

        fn user_id(&self) -> String {
            self.app.user().unwrap().id.clone()
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    #[tokio::test]
    async fn register_add_toggle_shows_full_week() {
        let mut h = Harness::fresh(MemoryGroupService::new()).await;
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Register));

        h.register("Ava").await;
        assert_eq!(h.app.page(), Page::Tasks);
        assert_eq!(h.app.user().unwrap().initials(), "A");

        h.add("Pay rent", tomorrow_noon()).await;
        let id = h.task_id("Pay rent");
        h.send(Message::ToggleTask(id)).await;

        let stats = h.app.analytics().unwrap();
        assert_eq!(stats.weekly.total, 1);
        assert_eq!(stats.weekly.completed, 1);
        assert_eq!(stats.weekly.percent, 100.0);
        assert_eq!(stats.daily.total, 0);

        // Local mode: the store holds the toggled task.
        let stored = h.app.store().tasks(&h.user_id()).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].completed);
    }

    #[tokio::test]
    async fn invalid_task_input_is_inline_and_changes_nothing() {
        let mut h = Harness::fresh(MemoryGroupService::new()).await;
        h.register("Ava").await;
        h.app.take_notices();

        h.add("   ", tomorrow_noon()).await;
        h.add("Too late", wednesday().with_timezone(&Utc) - Duration::hours(1)).await;
        h.send(Message::AddTask {
            title: "No date".to_string(),
            due: None,
        })
        .await;

        let notices = h.app.take_notices();
        assert_eq!(notices.len(), 3);
        assert!(notices.iter().all(|n| n.kind == NoticeKind::Inline));
        assert!(h.app.tasks().is_empty());
        assert!(h.app.store().tasks(&h.user_id()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_no_ops() {
        let mut h = Harness::fresh(MemoryGroupService::new()).await;
        h.register("Ava").await;
        h.add("Keep", tomorrow_noon()).await;
        let before = h.app.tasks().to_vec();

        h.send(Message::ToggleTask("missing".to_string())).await;
        h.send(Message::DeleteTask("missing".to_string())).await;
        assert_eq!(h.app.tasks(), before.as_slice());
    }

    #[tokio::test]
    async fn empty_capture_blocks_registration() {
        let mut h = Harness::fresh(MemoryGroupService::new()).await;
        h.send(Message::Register {
            name: "Ava".to_string(),
            photo: String::new(),
        })
        .await;
        let notices = h.app.take_notices();
        assert_eq!(notices[0].kind, NoticeKind::Persistent);
        assert!(h.app.user().is_none());
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Register));
    }

    #[tokio::test]
    async fn session_survives_restart_and_logout_keeps_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let groups = MemoryGroupService::new();

        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            groups.clone(),
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        h.register("Ava").await;
        h.add("Pay rent", tomorrow_noon()).await;
        drop(h);

        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            groups.clone(),
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        assert_eq!(h.app.page(), Page::Tasks);
        assert_eq!(h.app.tasks().len(), 1);

        h.send(Message::Logout).await;
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Login));
        assert!(h.app.tasks().is_empty());
        drop(h);

        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            groups,
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Login));
        assert_eq!(h.app.user().unwrap().name, "Ava");

        // "Not you?"
        h.send(Message::Open(Page::Auth(AuthMode::Register))).await;
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Register));
    }

    #[tokio::test]
    async fn face_login_routes_on_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            MemoryGroupService::new(),
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        h.register("Ava").await;
        h.send(Message::Logout).await;
        drop(h);

        let rejecting = ScriptedAssistant::default();
        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            MemoryGroupService::new(),
            Arc::new(rejecting.clone()),
        )
        .await;
        h.app.take_notices();
        h.send(Message::Login { photo: PHOTO.to_string() }).await;
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Login));
        assert_eq!(h.app.take_notices()[0].kind, NoticeKind::Transient);

        h.send(Message::Login { photo: String::new() }).await;
        assert_eq!(h.app.take_notices()[0].kind, NoticeKind::Persistent);
        assert_eq!(rejecting.calls.lock().unwrap().face, 1);
        drop(h);

        let accepting = ScriptedAssistant {
            recognize: true,
            ..ScriptedAssistant::default()
        };
        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            MemoryGroupService::new(),
            Arc::new(accepting),
        )
        .await;
        h.send(Message::Login { photo: PHOTO.to_string() }).await;
        assert_eq!(h.app.page(), Page::Tasks);
        assert!(!h.app.loading().login);
    }

    #[tokio::test]
    async fn corrupted_profile_is_wiped() {
        let mut kv = MemoryStore::new();
        kv.set("facetask_user", "{not json".to_string()).unwrap();
        kv.set("facetask_session", r#"{"userId":"u1"}"#.to_string())
            .unwrap();

        let mut h = Harness::start(
            Box::new(kv),
            MemoryGroupService::new(),
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Register));
        assert!(h.app.user().is_none());
        assert!(h.app.store().raw().keys().is_empty());
        assert_eq!(h.app.take_notices().len(), 1);
    }

    #[tokio::test]
    async fn corrupted_task_list_is_wiped_on_login() {
        let mut h = Harness::fresh(MemoryGroupService::new()).await;
        h.register("Ava").await;
        let user = h.app.user().unwrap().clone();

        let mut kv = MemoryStore::new();
        kv.set("facetask_user", serde_json::to_string(&user).unwrap())
            .unwrap();
        kv.set(&format!("facetask_tasks_{}", user.id), "[{]".to_string())
            .unwrap();
        kv.set("facetask_session", format!(r#"{{"userId":"{}"}}"#, user.id))
            .unwrap();

        let h = Harness::start(
            Box::new(kv),
            MemoryGroupService::new(),
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        assert!(!h.app.is_logged_in());
        assert_eq!(h.app.page(), Page::Auth(AuthMode::Register));
    }

    #[tokio::test]
    async fn members_see_each_others_progress() {
        let groups = MemoryGroupService::new();
        let mut ava = Harness::fresh(groups.clone()).await;
        let mut ben = Harness::fresh(groups.clone()).await;
        ava.register("Ava").await;
        ben.register("Ben").await;

        ava.add("Pay rent", tomorrow_noon()).await;
        ava.send(Message::CreateGroup).await;
        let passkey = ava.app.group().unwrap().id.clone();
        assert_eq!(ava.app.page(), Page::Collab);
        assert_eq!(ava.app.mode(), Some(&SyncMode::Grouped(passkey.clone())));
        assert_eq!(ava.app.store().group_id(&ava.user_id()).as_deref(), Some(passkey.as_str()));

        ben.add("Gym", tomorrow_noon()).await;
        ben.send(Message::JoinGroup(format!(" {} ", passkey))).await;
        assert_eq!(ben.app.tasks().len(), 1);

        let gym = ben.task_id("Gym");
        ben.send(Message::ToggleTask(gym)).await;
        ava.pump().await;

        let bars = ava.app.member_progress();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].label, "You");
        assert_eq!(bars[0].weekly.percent, 0.0);
        assert_eq!(bars[1].label, "Ben");
        assert_eq!(bars[1].weekly.percent, 100.0);

        // Ava's own list is untouched by Ben's write.
        assert_eq!(ava.app.tasks().len(), 1);
        assert_eq!(ava.app.tasks()[0].title, "Pay rent");
    }

    #[tokio::test]
    async fn grouped_edits_go_to_group_not_local_store() {
        let groups = MemoryGroupService::new();
        let mut ava = Harness::fresh(groups.clone()).await;
        ava.register("Ava").await;
        ava.send(Message::CreateGroup).await;
        let passkey = ava.app.group().unwrap().id.clone();

        ava.add("Shared", tomorrow_noon()).await;
        let doc = groups.get(&passkey).await.unwrap().unwrap();
        assert_eq!(doc.member(&ava.user_id()).unwrap().tasks.len(), 1);
        assert!(ava.app.store().tasks(&ava.user_id()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_delivery_replaces_task_view() {
        let groups = MemoryGroupService::new();
        let mut ava = Harness::fresh(groups.clone()).await;
        ava.register("Ava").await;
        ava.send(Message::CreateGroup).await;
        let passkey = ava.app.group().unwrap().id.clone();
        ava.pump().await;

        let mut doc = groups.get(&passkey).await.unwrap().unwrap();
        let pushed = vec![Task::new(ava.user_id(), "From elsewhere", tomorrow_noon())];
        doc.set_member_tasks(&ava.user_id(), pushed.clone());
        groups.put(doc).await.unwrap();
        ava.pump().await;

        assert_eq!(ava.app.tasks(), pushed.as_slice());
    }

    #[tokio::test]
    async fn delivery_without_own_entry_keeps_view() {
        let groups = MemoryGroupService::new();
        let mut ava = Harness::fresh(groups.clone()).await;
        ava.register("Ava").await;
        ava.add("Mine", tomorrow_noon()).await;
        ava.send(Message::CreateGroup).await;
        let passkey = ava.app.group().unwrap().id.clone();

        let other = Member {
            id: "someone".to_string(),
            name: "Someone".to_string(),
            tasks: Vec::new(),
        };
        groups.put(CollabGroup::new(passkey.clone(), other)).await.unwrap();
        ava.pump().await;

        assert_eq!(ava.app.tasks().len(), 1);
        assert!(ava.app.mode().unwrap().is_grouped());

        // Writes are skipped silently while not listed.
        ava.add("Second", tomorrow_noon()).await;
        assert!(ava.app.take_notices().iter().all(|n| !n.text.contains("sync")));
        let doc = groups.get(&passkey).await.unwrap().unwrap();
        assert!(!doc.is_member(&ava.user_id()));
    }

    #[tokio::test]
    async fn leaving_restores_local_list_and_removes_entry() {
        let groups = MemoryGroupService::new();
        let mut ava = Harness::fresh(groups.clone()).await;
        let mut ben = Harness::fresh(groups.clone()).await;
        ava.register("Ava").await;
        ben.register("Ben").await;

        ava.add("Local", tomorrow_noon()).await;
        ava.send(Message::CreateGroup).await;
        let passkey = ava.app.group().unwrap().id.clone();
        ben.send(Message::JoinGroup(passkey.clone())).await;

        ava.add("Grouped only", tomorrow_noon()).await;
        ava.send(Message::LeaveGroup).await;

        assert_eq!(ava.app.mode(), Some(&SyncMode::Local));
        assert_eq!(ava.app.tasks().len(), 1);
        assert_eq!(ava.app.tasks()[0].title, "Local");
        assert!(ava.app.store().group_id(&ava.user_id()).is_none());

        let doc = groups.get(&passkey).await.unwrap().unwrap();
        assert!(!doc.is_member(&ava.user_id()));
        assert!(doc.is_member(&ben.user_id()));
        assert_eq!(groups.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn deleted_group_reverts_to_local_mode() {
        let groups = MemoryGroupService::new();
        let mut ava = Harness::fresh(groups.clone()).await;
        ava.register("Ava").await;
        ava.send(Message::CreateGroup).await;
        let passkey = ava.app.group().unwrap().id.clone();
        ava.app.take_notices();

        groups.delete(&passkey);
        ava.pump().await;

        assert_eq!(ava.app.mode(), Some(&SyncMode::Local));
        assert!(ava.app.group().is_none());
        assert_eq!(ava.app.take_notices().len(), 1);
    }

    #[tokio::test]
    async fn unknown_passkey_keeps_local_mode() {
        let mut h = Harness::fresh(MemoryGroupService::new()).await;
        h.register("Ava").await;
        h.app.take_notices();

        h.send(Message::JoinGroup("nope0000".to_string())).await;
        let notices = h.app.take_notices();
        assert_eq!(notices[0].kind, NoticeKind::Transient);
        assert!(notices[0].text.contains("not found"));
        assert_eq!(h.app.mode(), Some(&SyncMode::Local));

        h.send(Message::JoinGroup("  ".to_string())).await;
        assert_eq!(h.app.take_notices()[0].kind, NoticeKind::Inline);
    }

    #[tokio::test]
    async fn group_purpose_reaches_members() {
        let groups = MemoryGroupService::new();
        let mut ava = Harness::fresh(groups.clone()).await;
        ava.register("Ava").await;
        ava.send(Message::CreateGroup).await;

        ava.send(Message::SetGroupPurpose(PurposeForm::exams("", ExamDuration::Days60)))
            .await;
        assert_eq!(ava.app.take_notices().last().unwrap().kind, NoticeKind::Inline);

        ava.send(Message::SetGroupPurpose(PurposeForm::exams("Bar exam", ExamDuration::Days60)))
            .await;
        ava.pump().await;
        let purpose = ava.app.group().unwrap().group_purpose().unwrap();
        assert_eq!(purpose.exam_name.as_deref(), Some("Bar exam"));
    }

    #[tokio::test]
    async fn suggestions_use_exam_plan_and_land_tomorrow_noon() {
        let assistant = ScriptedAssistant {
            suggestions: vec![
                "Skim the syllabus".to_string(),
                "Set up a study corner".to_string(),
                "Take a diagnostic test".to_string(),
            ],
            ..ScriptedAssistant::default()
        };
        let mut h = Harness::start(
            Box::new(MemoryStore::new()),
            MemoryGroupService::new(),
            Arc::new(assistant.clone()),
        )
        .await;
        h.register("Ava").await;
        h.send(Message::SetPurpose(PurposeForm::exams("SAT", ExamDuration::Days30)))
            .await;
        assert!(h.app.purpose().unwrap().is_exam());

        h.send(Message::RequestSuggestions("Exam Prep".to_string())).await;
        {
            let calls = assistant.calls.lock().unwrap();
            let req = &calls.suggest[0];
            assert_eq!(req.prompt, "preparing for an exam");
            let exam = req.exam.as_ref().unwrap();
            assert_eq!(exam.exam_name, "SAT");
            assert_eq!(exam.current_day, 1);
        }
        assert_eq!(h.app.suggestions().len(), 3);
        assert!(!h.app.loading().suggestions);

        h.send(Message::AddSuggestion("Skim the syllabus".to_string())).await;
        assert_eq!(h.app.tasks()[0].due_at, tomorrow_noon());
        assert_eq!(h.app.suggestions().len(), 2);
    }

    #[tokio::test]
    async fn reminders_are_throttled_and_queued() {
        let reminder = |name: &str| Reminder {
            task_name: name.to_string(),
            due_at: "2026-10-22T12:00:00Z".to_string(),
            message: format!("{} is due soon", name),
        };
        let assistant = ScriptedAssistant {
            reminders: vec![reminder("Pay rent"), reminder("Call mom")],
            ..ScriptedAssistant::default()
        };
        let mut h = Harness::start(
            Box::new(MemoryStore::new()),
            MemoryGroupService::new(),
            Arc::new(assistant.clone()),
        )
        .await;
        h.register("Ava").await;

        // Nothing open yet: no request.
        h.send(Message::ReminderTick).await;
        assert_eq!(assistant.calls.lock().unwrap().reminders, 0);

        h.add("Pay rent", tomorrow_noon()).await;
        h.send(Message::ReminderTick).await;
        assert_eq!(assistant.calls.lock().unwrap().reminders, 1);
        assert_eq!(h.app.active_reminder().unwrap().task_name, "Pay rent");
        assert_eq!(h.app.pending_reminders(), 1);

        h.advance(Duration::seconds(15));
        h.send(Message::ReminderTick).await;
        assert_eq!(assistant.calls.lock().unwrap().reminders, 1);

        h.advance(Duration::seconds(60));
        h.send(Message::ReminderTick).await;
        assert_eq!(assistant.calls.lock().unwrap().reminders, 2);

        h.send(Message::DismissReminder).await;
        assert_eq!(h.app.active_reminder().unwrap().task_name, "Call mom");
    }

    #[tokio::test]
    async fn grouped_restart_refuses_edits_until_first_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let groups = MemoryGroupService::new();

        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            groups.clone(),
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        h.register("Ava").await;
        h.add("Local only", tomorrow_noon()).await;
        h.send(Message::CreateGroup).await;
        let passkey = h.app.group().unwrap().id.clone();
        h.add("Grouped A", tomorrow_noon()).await;
        h.add("Grouped B", tomorrow_noon()).await;
        let user_id = h.user_id();
        drop(h);

        let mut h = Harness::start(
            Box::new(FileStore::open(&path)),
            groups.clone(),
            Arc::new(ScriptedAssistant::default()),
        )
        .await;
        assert_eq!(h.app.mode(), Some(&SyncMode::Grouped(passkey.clone())));
        assert!(h.app.tasks().is_empty());
        assert!(h.app.loading().group);
        h.app.take_notices();

        // Nothing delivered yet: the edit is refused and the group keeps its list.
        h.add("New", tomorrow_noon()).await;
        assert_eq!(h.app.take_notices()[0].kind, NoticeKind::Inline);
        let doc = groups.get(&passkey).await.unwrap().unwrap();
        assert_eq!(doc.member(&user_id).unwrap().tasks.len(), 3);

        h.pump().await;
        assert!(!h.app.loading().group);
        assert_eq!(h.app.tasks().len(), 3);

        h.add("New", tomorrow_noon()).await;
        let doc = groups.get(&passkey).await.unwrap().unwrap();
        let titles: Vec<&str> = doc
            .member(&user_id)
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles.len(), 4);
        assert!(titles.contains(&"Grouped A") && titles.contains(&"New"));
    }

    #[tokio::test]
    async fn streak_counts_visited_days() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let visit = |days: i64| {
            let path = path.clone();
            async move {
                Harness::start_at(
                    Box::new(FileStore::open(&path)),
                    MemoryGroupService::new(),
                    Arc::new(ScriptedAssistant::default()),
                    wednesday() + Duration::days(days),
                )
                .await
            }
        };

        let mut h = visit(0).await;
        h.register("Ava").await;
        assert_eq!(h.app.streak().unwrap().day_count, 1);
        drop(h);

        // Same day again, then the next day.
        assert_eq!(visit(0).await.app.streak().unwrap().day_count, 1);
        let status = visit(1).await.app.streak().unwrap();
        assert_eq!((status.day_count, status.missed_days), (2, 0));

        // Skip Friday.
        let status = visit(3).await.app.streak().unwrap();
        assert_eq!((status.day_count, status.missed_days), (3, 1));
    }
}
