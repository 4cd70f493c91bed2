use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Local;
use facetask::config::{FaceTaskConfig, GroupBackend};
use facetask::core::analytics::member_progress;
use facetask::core::task::Task;
use facetask::store::{FileStore, ProfileStore};
use facetask::sync::firestore::{FirestoreClient, FirestoreGroupService};
use facetask::sync::group::GroupService;

#[derive(Debug, Default, PartialEq)]
struct TaskDiff {
    matched: usize,
    status_mismatch: Vec<(String, bool, bool)>,
    remote_only: Vec<String>,
    local_only: Vec<String>,
}

impl TaskDiff {
    fn compare(local: &[Task], remote: &[Task]) -> Self {
        let local_by_id: HashMap<&str, &Task> = local.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut diff = TaskDiff::default();

        for task in remote {
            match local_by_id.get(task.id.as_str()) {
                Some(local) => {
                    diff.matched += 1;
                    if local.completed != task.completed {
                        diff.status_mismatch
                            .push((task.title.clone(), local.completed, task.completed));
                    }
                }
                None => diff.remote_only.push(task.title.clone()),
            }
        }

        let remote_ids: HashSet<&str> = remote.iter().map(|t| t.id.as_str()).collect();
        diff.local_only = local
            .iter()
            .filter(|t| !remote_ids.contains(t.id.as_str()))
            .map(|t| t.title.clone())
            .collect();
        diff
    }

    fn in_sync(&self) -> bool {
        self.status_mismatch.is_empty() && self.remote_only.is_empty() && self.local_only.is_empty()
    }
}

fn mark(completed: bool) -> &'static str {
    if completed { "done" } else { "open" }
}

#[tokio::main]
async fn main() {
    match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => {
            let _ = journal
                .with_syslog_identifier("facetask-group-check".to_string())
                .install();
            log::set_max_level(log::LevelFilter::Info);
        }
        Err(e) => eprintln!("Journal unavailable: {}", e),
    }

    let config = FaceTaskConfig::load(&FaceTaskConfig::default_path());

    println!("=== Group vs Local Comparison ===\n");

    let store = ProfileStore::new(Box::new(FileStore::open(config.profile_path())));
    let user = match store.user() {
        Ok(Some(user)) => user,
        Ok(None) => {
            println!("No profile registered on this device.");
            return;
        }
        Err(e) => {
            println!("Profile unreadable: {}", e);
            return;
        }
    };
    let local = store.tasks(&user.id).unwrap_or_else(|e| {
        log::warn!("Local task list unreadable: {}", e);
        Vec::new()
    });
    println!("User: {} ({})", user.name, user.id);
    println!("Local: {} tasks\n", local.len());

    let Some(group_id) = store.group_id(&user.id) else {
        println!("Not linked to a group. Local list is authoritative.");
        return;
    };

    let GroupBackend::Firestore { project_id, api_key } = &config.groups else {
        println!("Group {} uses the in-memory backend; nothing to compare.", group_id);
        return;
    };

    println!("--- Firestore: {} / {} ---", project_id, group_id);

    let client = match FirestoreClient::new(project_id, api_key.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            println!("  Client error: {}", e);
            return;
        }
    };
    let service = FirestoreGroupService::new(client, Duration::from_secs(config.group_poll_secs));

    let group = match service.get(&group_id).await {
        Ok(Some(group)) => group,
        Ok(None) => {
            println!("  Group no longer exists.");
            return;
        }
        Err(e) => {
            println!("  Error fetching group: {}", e);
            return;
        }
    };

    match group.member(&user.id) {
        None => println!("  Not listed as a member (left or removed)."),
        Some(member) => {
            let diff = TaskDiff::compare(&local, &member.tasks);
            println!("  Remote: {} tasks", member.tasks.len());
            println!("  Matched: {}", diff.matched);

            if !diff.status_mismatch.is_empty() {
                println!("\n  STATUS MISMATCHES:");
                for (title, local_done, remote_done) in &diff.status_mismatch {
                    println!("    {}: local {}, remote {}", title, mark(*local_done), mark(*remote_done));
                }
            }
            if !diff.remote_only.is_empty() {
                println!("\n  IN GROUP ONLY ({}):", diff.remote_only.len());
                for title in &diff.remote_only {
                    println!("    {}", title);
                }
            }
            if !diff.local_only.is_empty() {
                println!("\n  LOCAL ONLY ({}):", diff.local_only.len());
                for title in &diff.local_only {
                    println!("    {}", title);
                }
            }
            if diff.in_sync() {
                println!("  All in sync!");
            }
        }
    }

    println!("\n  Weekly progress:");
    for bar in member_progress(&group, &user.id, &Local::now()) {
        println!(
            "    {:<16} {}/{} ({:.0}%)",
            bar.label, bar.weekly.completed, bar.weekly.total, bar.weekly.percent
        );
    }

    println!("\n=== Done ===");
}
