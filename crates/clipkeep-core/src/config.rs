use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::history::DEFAULT_CAPACITY;
use crate::hotkey::HotkeyBinding;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of entries kept in history; pinned entries may exceed it
    pub capacity: usize,
    /// Clipboard poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Delay between selecting an entry and the synthetic paste
    pub paste_delay_ms: u64,
    /// Explicit launch-at-login preference; unset means "enable on first run"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_at_login: Option<bool>,
    /// Global shortcut that toggles the activation surface
    pub hotkey: HotkeyBinding,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            poll_interval_ms: 500,
            paste_delay_ms: 200,
            launch_at_login: None,
            hotkey: HotkeyBinding::default(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn paste_delay(&self) -> Duration {
        Duration::from_millis(self.paste_delay_ms)
    }
}

/// Process state that is not user configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchState {
    pub has_launched_before: bool,
}

pub fn config_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.config_dir().join("clipkeep")
    } else {
        PathBuf::from("./.config/clipkeep")
    }
}

pub fn state_dir() -> PathBuf {
    // Prefer XDG state dir when available; fall back to config dir
    if let Some(bd) = directories::BaseDirs::new() {
        if let Some(sd) = bd.state_dir() {
            return sd.join("clipkeep");
        }
    }
    config_dir()
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn launch_state_path() -> PathBuf {
    state_dir().join("state.json")
}

pub fn daemon_info_path() -> PathBuf {
    config_dir().join("clipkeepd.json")
}

/// Missing file yields defaults; a malformed file is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    match std::fs::read_to_string(path) {
        Ok(s) => toml::from_str(&s).map_err(|source| Error::SettingsParse {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(Error::io(path, e)),
    }
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let body = toml::to_string_pretty(settings)?;
    std::fs::write(path, body).map_err(|e| Error::io(path, e))
}

/// Settings file handle used to persist changes made at runtime.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings> {
        load_settings_from(&self.path)
    }

    /// Rewrites only the hotkey, keeping every other key as found on disk.
    pub fn save_hotkey(&self, binding: HotkeyBinding) -> Result<()> {
        let mut settings = self.load()?;
        settings.hotkey = binding;
        save_settings_to(&self.path, &settings)
    }

    pub fn save_launch_at_login(&self, enabled: bool) -> Result<()> {
        let mut settings = self.load()?;
        settings.launch_at_login = Some(enabled);
        save_settings_to(&self.path, &settings)
    }
}

pub fn load_launch_state(path: &Path) -> LaunchState {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_launch_state(path: &Path, state: &LaunchState) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(state)?).map_err(|e| Error::io(path, e))
}
