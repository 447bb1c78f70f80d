//! Newline-delimited JSON spoken between `clipkeepd` and its clients.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::history::EntryId;
use crate::hotkey::HotkeyBinding;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Health,
    List {
        #[serde(default)]
        limit: Option<usize>,
    },
    /// PNG bytes of an image entry, base64 encoded.
    Image {
        id: EntryId,
    },
    Pin {
        id: EntryId,
    },
    Delete {
        id: EntryId,
    },
    /// Write the entry to the clipboard, hide the surface, paste.
    Activate {
        id: EntryId,
    },
    /// Write the entry to the clipboard only.
    Copy {
        id: EntryId,
    },
    Toggle,
    FocusLost,
    Rebind {
        binding: HotkeyBinding,
    },
    Status,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    pub id: EntryId,
    pub png_base64: String,
}

impl ImagePayload {
    pub fn new(id: EntryId, png: &[u8]) -> Self {
        Self {
            id,
            png_base64: general_purpose::STANDARD.encode(png),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        general_purpose::STANDARD
            .decode(self.png_base64.trim())
            .map_err(|e| Error::Clipboard(format!("bad image payload: {e}")))
    }
}

/// Written by the daemon at startup so clients can find its port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub port: u16,
    pub started_at: i64,
    pub pid: u32,
}
