#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};

mod application;
mod message;
mod runtime;

use facetask::config;
use facetask::core;
use facetask::error;
use facetask::store;
use facetask::sync;

use application::FaceTask;
use crate::config::{FaceTaskConfig, GroupBackend};
use crate::core::assistant::{Assistant, DisabledAssistant};
use crate::core::purpose::{ExamDuration, PurposeKind};
use crate::core::suggestion::CATEGORIES;
use crate::core::task::Task;
use message::{AuthMode, Message, NoticeKind, Page, PurposeForm};
use runtime::Runtime;
use crate::store::{FileStore, ProfileStore};
use crate::sync::anthropic::{self, AnthropicAssistant};
use crate::sync::firestore::{FirestoreClient, FirestoreGroupService};
use crate::sync::group::GroupService;
use crate::sync::memory::MemoryGroupService;

const HELP: &str = "\
Commands:
  register <name> <photo-file>     create a profile on this device
  login <photo-file>               face login
  not-you                          switch to registration
  logout
  add <YYYY-MM-DD> [HH:MM] <title> add a task (default time 23:59)
  toggle <n> | delete <n>          by position in `list`
  list | stats
  purpose normal | purpose exams <30|60|90|120> <exam name>
  suggest <category or mood>       categories: Feeling Sad, Feeling Tired, Exam Prep,
                                   Feeling Bored, Get Productive
  suggest add <n>                  add suggestion n as a task due tomorrow noon
  dismiss                          close the current reminder
  group create | join <passkey> | leave | show
  group purpose normal | group purpose exams <days> <exam name>
  api-key [key]                    store (or, without a key, remove) the Anthropic key
  debug                            toggle debug logging
  quit";

#[derive(Debug, PartialEq)]
enum View {
    Tasks,
    Stats,
    Group,
    Suggestions,
    Help,
}

#[derive(Debug)]
enum Command {
    Send(Message),
    Show(View),
    Invalid(String),
}

/// Log targets of this package: the library and the binary modules.
fn is_own_target(target: &str) -> bool {
    target == "facetask" || target.starts_with("facetask::")
}

fn install_logger(debug: bool) {
    // Log to the systemd user journal (`journalctl --user -t facetask -f`).
    // Wrapper filters: facetask at info/debug (per config), everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            let target = metadata.target();
            if is_own_target(target) {
                let max = if facetask::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    facetask::set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(j) => j.with_syslog_identifier("facetask".to_string()),
        Err(e) => {
            eprintln!("Journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn config_path() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(FaceTaskConfig::default_path)
}

fn group_service(config: &FaceTaskConfig) -> Result<Arc<dyn GroupService>, String> {
    match config.groups {
        GroupBackend::Memory => {
            log::info!("Using in-memory collaboration groups");
            Ok(Arc::new(MemoryGroupService::new()))
        }
        GroupBackend::Firestore {
            ref project_id,
            ref api_key,
        } => {
            log::info!("Using Firestore project {} for groups", project_id);
            let client = FirestoreClient::new(project_id, api_key.as_deref())?;
            Ok(Arc::new(FirestoreGroupService::new(
                client,
                Duration::from_secs(config.group_poll_secs.max(1)),
            )))
        }
    }
}

async fn assistant(config: &FaceTaskConfig) -> Arc<dyn Assistant> {
    match anthropic::load_api_key().await {
        Ok(Some(key)) => Arc::new(AnthropicAssistant::new(key, config.anthropic_model.clone())),
        Ok(None) => {
            log::info!("No Anthropic API key stored, AI features disabled");
            Arc::new(DisabledAssistant)
        }
        Err(e) => {
            log::warn!("Keyring error: {}", e);
            Arc::new(DisabledAssistant)
        }
    }
}

/// Read an image file into a `data:` URI.
fn photo_data_uri(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    if bytes.is_empty() {
        return Ok(String::new());
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    };
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn parse_exam_form(kind: PurposeKind, rest: &[&str]) -> Result<PurposeForm, String> {
    match kind {
        PurposeKind::Normal => Ok(PurposeForm::normal()),
        PurposeKind::Exams => {
            let days: u32 = rest
                .first()
                .and_then(|d| d.parse().ok())
                .ok_or("Usage: ... exams <30|60|90|120> <exam name>")?;
            let duration = ExamDuration::try_from(days)?;
            Ok(PurposeForm::exams(rest[1..].join(" "), duration))
        }
    }
}

fn parse_purpose(words: &[&str]) -> Result<PurposeForm, String> {
    match words.first().copied() {
        Some("normal") => parse_exam_form(PurposeKind::Normal, &[]),
        Some("exams") | Some("exam") => parse_exam_form(PurposeKind::Exams, &words[1..]),
        _ => Err("Usage: purpose normal | purpose exams <days> <exam name>".to_string()),
    }
}

/// Parse `<YYYY-MM-DD> [HH:MM] <title>` in local time.
fn parse_add(words: &[&str]) -> Result<Message, String> {
    let usage = "Usage: add <YYYY-MM-DD> [HH:MM] <title>";
    let date = words
        .first()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or(usage)?;
    let (time, title_start) = match words.get(1).and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok()) {
        Some(t) => (t, 2),
        None => (NaiveTime::from_hms_opt(23, 59, 0).ok_or(usage)?, 1),
    };
    let due = Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|d| d.with_timezone(&Utc));
    Ok(Message::AddTask {
        title: words.get(title_start..).unwrap_or_default().join(" "),
        due,
    })
}

fn nth<'a, T>(items: &'a [T], arg: Option<&&str>) -> Option<&'a T> {
    let n: usize = arg?.parse().ok()?;
    items.get(n.checked_sub(1)?)
}

fn parse_command(line: &str, tasks: &[Task], suggestions: &[String]) -> Option<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (&head, rest) = words.split_first()?;

    let command = match head {
        "help" | "?" => Command::Show(View::Help),
        "quit" | "exit" => Command::Send(Message::Quit),
        "register" => match rest.split_last() {
            Some((photo, name)) if !name.is_empty() => match photo_data_uri(Path::new(photo)) {
                Ok(photo) => Command::Send(Message::Register {
                    name: name.join(" "),
                    photo,
                }),
                Err(e) => Command::Invalid(e),
            },
            _ => Command::Invalid("Usage: register <name> <photo-file>".to_string()),
        },
        "login" => match rest.first() {
            Some(photo) => match photo_data_uri(Path::new(photo)) {
                Ok(photo) => Command::Send(Message::Login { photo }),
                Err(e) => Command::Invalid(e),
            },
            None => Command::Invalid("Usage: login <photo-file>".to_string()),
        },
        "not-you" => Command::Send(Message::Open(Page::Auth(AuthMode::Register))),
        "logout" => Command::Send(Message::Logout),
        "add" => match parse_add(rest) {
            Ok(msg) => Command::Send(msg),
            Err(e) => Command::Invalid(e),
        },
        "toggle" | "delete" => match nth(tasks, rest.first()) {
            Some(task) if head == "toggle" => Command::Send(Message::ToggleTask(task.id.clone())),
            Some(task) => Command::Send(Message::DeleteTask(task.id.clone())),
            None => Command::Invalid(format!("Usage: {} <n> (see `list`)", head)),
        },
        "list" => Command::Show(View::Tasks),
        "stats" => Command::Show(View::Stats),
        "purpose" => match parse_purpose(rest) {
            Ok(form) => Command::Send(Message::SetPurpose(form)),
            Err(e) => Command::Invalid(e),
        },
        "suggest" => match rest.first().copied() {
            Some("add") => match nth(suggestions, rest.get(1)) {
                Some(s) => Command::Send(Message::AddSuggestion(s.clone())),
                None => Command::Invalid("Usage: suggest add <n>".to_string()),
            },
            Some(_) => Command::Send(Message::RequestSuggestions(rest.join(" "))),
            None => Command::Show(View::Suggestions),
        },
        "dismiss" => Command::Send(Message::DismissReminder),
        "group" => match rest.first().copied() {
            Some("create") => Command::Send(Message::CreateGroup),
            Some("join") => Command::Send(Message::JoinGroup(rest[1..].join(" "))),
            Some("leave") => Command::Send(Message::LeaveGroup),
            Some("purpose") => match parse_purpose(&rest[1..]) {
                Ok(form) => Command::Send(Message::SetGroupPurpose(form)),
                Err(e) => Command::Invalid(e),
            },
            Some("show") | None => Command::Show(View::Group),
            Some(other) => Command::Invalid(format!("Unknown group command: {}", other)),
        },
        "api-key" => Command::Send(Message::SetAnthropicApiKey(rest.join(" "))),
        "debug" => Command::Send(Message::ToggleDebugLogging),
        other => Command::Invalid(format!("Unknown command: {} (try `help`)", other)),
    };
    Some(command)
}

fn show(app: &FaceTask, view: &View) {
    match view {
        View::Help => println!("{}", HELP),
        View::Tasks => {
            if app.tasks().is_empty() {
                println!("No tasks yet.");
            }
            for (i, task) in app.tasks().iter().enumerate() {
                println!(
                    "{:>3}. [{}] {}  (due {})",
                    i + 1,
                    if task.completed { "x" } else { " " },
                    task.title,
                    task.due_at.with_timezone(&Local).format("%a %b %-d %H:%M")
                );
            }
        }
        View::Stats => {
            let Some(stats) = app.analytics() else {
                println!("Log in to see your progress.");
                return;
            };
            println!(
                "Today: {}/{} ({:.0}%)",
                stats.daily.completed, stats.daily.total, stats.daily.percent
            );
            println!(
                "This week ({}): {}/{} ({:.0}%)",
                stats.week_label(),
                stats.weekly.completed,
                stats.weekly.total,
                stats.weekly.percent
            );
            if let Some(streak) = app.streak() {
                println!(
                    "Streak: day {} ({} missed)",
                    streak.day_count, streak.missed_days
                );
            }
            if let Some(purpose) = app.purpose().filter(|p| p.is_exam()) {
                println!(
                    "Preparing for {} ({} days)",
                    purpose.exam_name.as_deref().unwrap_or("exam"),
                    purpose.exam_duration.unwrap_or_default().days()
                );
            }
        }
        View::Group => match app.group() {
            None => println!("Not in a group. Use `group create` or `group join <passkey>`."),
            Some(group) => {
                println!("Group passkey: {}", group.id);
                if let Some(purpose) = group.group_purpose().filter(|p| p.is_exam()) {
                    println!(
                        "Group goal: {} in {} days",
                        purpose.exam_name.as_deref().unwrap_or("exam"),
                        purpose.exam_duration.unwrap_or_default().days()
                    );
                }
                for bar in app.member_progress() {
                    println!(
                        "  {:<16} {}/{} ({:.0}%)",
                        bar.label, bar.weekly.completed, bar.weekly.total, bar.weekly.percent
                    );
                }
            }
        },
        View::Suggestions => {
            if app.suggestions().is_empty() {
                let labels: Vec<&str> = CATEGORIES.iter().map(|c| c.label).collect();
                println!("Try: suggest <{}>", labels.join(" | "));
            }
            for (i, s) in app.suggestions().iter().enumerate() {
                println!("{:>3}. {}", i + 1, s);
            }
        }
    }
}

/// Print what changed since the last render.
fn render(app: &mut FaceTask, last_page: &mut Option<Page>, last_reminder: &mut Option<String>) {
    for notice in app.take_notices() {
        match notice.kind {
            NoticeKind::Inline => println!("  ! {}", notice.text),
            NoticeKind::Persistent => println!("  !! {}", notice.text),
            NoticeKind::Transient => println!("  * {}", notice.text),
        }
    }

    let page = app.page();
    if *last_page != Some(page) {
        match page {
            Page::Auth(AuthMode::Register) => println!("Register: register <name> <photo-file>"),
            Page::Auth(AuthMode::Login) => {
                let name = app.user().map(|u| u.name.as_str()).unwrap_or_default();
                println!("Welcome back {}. Log in with: login <photo-file> (or `not-you`)", name);
            }
            Page::Tasks => {
                if let Some(user) = app.user() {
                    println!("[{}] {}'s tasks", user.initials(), user.name);
                }
                show(app, &View::Tasks);
            }
            Page::Collab => show(app, &View::Group),
        }
        *last_page = Some(page);
    }

    let reminder = app
        .active_reminder()
        .map(|r| format!("Reminder: {} ({})", r.message, r.task_name));
    if reminder != *last_reminder {
        if let Some(ref text) = reminder {
            println!("  ~ {}", text);
        }
        *last_reminder = reminder;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path();
    let config = FaceTaskConfig::load(&path);
    install_logger(config.debug_logging);
    log::info!("Starting with config {}", path.display());

    if let Err(e) = config.ensure_dirs() {
        log::error!("Failed to create data directory: {}", e);
    }

    let store = ProfileStore::new(Box::new(FileStore::open(config.profile_path())));
    let groups = group_service(&config)?;
    let assistant = assistant(&config).await;
    let reminder_poll = Duration::from_secs(config.reminder_poll_secs.max(1));

    let mut rt = Runtime::new();
    let (mut app, init) = FaceTask::new(config, store, groups, assistant, application::system_clock());
    rt.execute(init);
    let ticker = rt.every(reminder_poll, || Message::ReminderTick);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_page = None;
    let mut last_reminder = None;
    render(&mut app, &mut last_page, &mut last_reminder);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("Failed to read input: {}", e);
                        break;
                    }
                };
                match parse_command(&line, app.tasks(), app.suggestions()) {
                    None => {}
                    Some(Command::Show(view)) => show(&app, &view),
                    Some(Command::Invalid(e)) => println!("  ! {}", e),
                    Some(Command::Send(Message::Quit)) => break,
                    Some(Command::Send(msg)) => {
                        // Navigation commands always re-render the page.
                        if matches!(msg, Message::Open(_)) {
                            last_page = None;
                        }
                        let action = app.update(msg);
                        rt.execute(action);
                    }
                }
            }
            Some(msg) = rt.next() => {
                let action = app.update(msg);
                rt.execute(action);
            }
        }
        render(&mut app, &mut last_page, &mut last_reminder);
    }

    ticker.abort();
    log::info!("Exiting");
    Ok(())
}
