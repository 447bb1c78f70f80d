use std::path::PathBuf;

use thiserror::Error;

use crate::hotkey::HotkeyBinding;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The platform refused the chord (already claimed, unsupported key, ...).
    #[error("failed to register hotkey {binding}: {reason}")]
    HotkeyRegistration {
        binding: HotkeyBinding,
        reason: String,
    },

    #[error("invalid hotkey binding {input:?}: {reason}")]
    InvalidBinding { input: String, reason: String },

    #[error("invalid entry id {0:?}")]
    InvalidEntryId(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("failed to read settings from {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize settings: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("state file error: {0}")]
    State(#[from] serde_json::Error),

    #[error("launch at login: {0}")]
    Autostart(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The event loop has shut down and no longer accepts commands.
    #[error("event loop is not running")]
    LoopClosed,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
