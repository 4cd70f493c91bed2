use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u64 = 1;

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("facetask")
}

fn default_group_poll_secs() -> u64 {
    5
}

fn default_model() -> String {
    crate::sync::anthropic::DEFAULT_MODEL.to_string()
}

fn default_reminder_poll_secs() -> u64 {
    15
}

fn default_reminder_min_interval_secs() -> u64 {
    60
}

/// Where collaboration group documents live.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum GroupBackend {
    /// In-process only; groups vanish when the program exits.
    #[default]
    Memory,
    Firestore {
        project_id: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FaceTaskConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub groups: GroupBackend,
    #[serde(default = "default_group_poll_secs")]
    pub group_poll_secs: u64,
    #[serde(default = "default_model")]
    pub anthropic_model: String,
    #[serde(default = "default_reminder_poll_secs")]
    pub reminder_poll_secs: u64,
    #[serde(default = "default_reminder_min_interval_secs")]
    pub reminder_min_interval_secs: u64,
}

impl Default for FaceTaskConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            debug_logging: false,
            groups: GroupBackend::default(),
            group_poll_secs: default_group_poll_secs(),
            anthropic_model: default_model(),
            reminder_poll_secs: default_reminder_poll_secs(),
            reminder_min_interval_secs: default_reminder_min_interval_secs(),
        }
    }
}

impl FaceTaskConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("facetask")
            .join(format!("v{}", CONFIG_VERSION))
            .join("config.json")
    }

    /// Read the config at `path`. A missing or unparsable file yields the
    /// defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Ignoring unparsable config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::error!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// The Local Profile Store file.
    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join("profile.json")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
