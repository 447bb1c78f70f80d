//! Clipboard payloads and the collaborator traits that move them in and out
//! of the system clipboard.

use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
}

/// One clipboard payload. Text payloads carry their UTF-8 bytes plus the
/// decoded string; image payloads carry PNG bytes and no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub kind: ContentKind,
    pub bytes: Vec<u8>,
    pub text: Option<String>,
}

impl Snapshot {
    pub fn text<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        Self {
            kind: ContentKind::Text,
            bytes: text.as_bytes().to_vec(),
            text: Some(text),
        }
    }

    pub fn image(png: Vec<u8>) -> Self {
        Self {
            kind: ContentKind::Image,
            bytes: png,
            text: None,
        }
    }

    /// A snapshot the history can record: text with a decoded string, or an
    /// image with a non-empty payload.
    pub fn is_usable(&self) -> bool {
        match self.kind {
            ContentKind::Text => self.text.is_some(),
            ContentKind::Image => !self.bytes.is_empty(),
        }
    }
}

/// Read side of the system clipboard.
pub trait SnapshotReader {
    /// Value that changes whenever any process overwrites the clipboard.
    fn current_generation(&mut self) -> u64;

    /// `Ok(None)` when neither text nor an image is available.
    fn read_snapshot(&mut self) -> Result<Option<Snapshot>>;
}

/// Write side of the system clipboard.
pub trait ClipboardWriter {
    fn write(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Posts the platform paste chord to the foreground application.
/// Fire-and-forget: implementations log failures instead of returning them.
pub trait PasteKeystroke {
    fn simulate_paste(&mut self);
}

impl<T: SnapshotReader + ?Sized> SnapshotReader for Box<T> {
    fn current_generation(&mut self) -> u64 {
        (**self).current_generation()
    }

    fn read_snapshot(&mut self) -> Result<Option<Snapshot>> {
        (**self).read_snapshot()
    }
}
