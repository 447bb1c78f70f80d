//! Bounded, deduplicated, pin-aware clipboard history.
//!
//! Entries live in one `Vec`, most recent first. Content identity is the
//! decoded text for text entries and the full byte payload for images (a
//! SHA-256 fingerprint is checked first so unequal images are rejected
//! without a byte-by-byte compare).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::snapshot::{ContentKind, Snapshot};
use crate::Error;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidEntryId(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    id: EntryId,
    kind: ContentKind,
    bytes: Vec<u8>,
    text: Option<String>,
    fingerprint: String,
    created_at: DateTime<Utc>,
    pinned: bool,
}

impl Entry {
    fn from_snapshot(snapshot: Snapshot, fingerprint: String, pinned: bool) -> Self {
        Self {
            id: EntryId::fresh(),
            kind: snapshot.kind,
            bytes: snapshot.bytes,
            text: snapshot.text,
            fingerprint,
            created_at: Utc::now(),
            pinned,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Hex SHA-256 of the payload bytes.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn view(&self) -> EntryView {
        EntryView {
            id: self.id,
            kind: self.kind,
            text: self.text.clone(),
            created_at: self.created_at,
            pinned: self.pinned,
        }
    }
}

/// List row handed to the activation surface. Image bytes are fetched
/// separately by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub id: EntryId,
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub pinned: bool,
}

/// What a single `observe` call did to the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    /// Same content as the newest entry; nothing changed.
    Echo,
    Inserted {
        id: EntryId,
        evicted: Option<EntryId>,
    },
    /// An older entry with the same content was replaced by a fresh one at
    /// the top.
    Refreshed {
        id: EntryId,
        replaced: EntryId,
        pinned: bool,
        evicted: Option<EntryId>,
    },
}

struct Identity<'a> {
    kind: ContentKind,
    text: Option<&'a str>,
    bytes: &'a [u8],
    fingerprint: &'a str,
}

impl Identity<'_> {
    fn matches(&self, entry: &Entry) -> bool {
        if entry.kind != self.kind {
            return false;
        }
        match self.kind {
            ContentKind::Text => entry.text.as_deref() == self.text,
            ContentKind::Image => {
                entry.fingerprint == self.fingerprint && entry.bytes == self.bytes
            }
        }
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes).as_slice())
}

pub struct HistoryEngine {
    entries: Vec<Entry>,
    capacity: usize,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryEngine {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a clipboard snapshot at the top of the history.
    pub fn observe(&mut self, snapshot: Snapshot) -> Observed {
        let digest = fingerprint(&snapshot.bytes);
        let identity = Identity {
            kind: snapshot.kind,
            text: snapshot.text.as_deref(),
            bytes: &snapshot.bytes,
            fingerprint: &digest,
        };

        if self.entries.first().is_some_and(|e| identity.matches(e)) {
            return Observed::Echo;
        }

        let previous = self
            .entries
            .iter()
            .position(|e| identity.matches(e))
            .map(|idx| self.entries.remove(idx));
        let pinned = previous.as_ref().is_some_and(|e| e.pinned);

        let entry = Entry::from_snapshot(snapshot, digest, pinned);
        let id = entry.id;
        self.entries.insert(0, entry);

        let evicted = if self.entries.len() > self.capacity {
            self.evict_one()
        } else {
            None
        };

        match previous {
            Some(old) => {
                debug!(%id, replaced = %old.id, pinned, "history entry refreshed");
                Observed::Refreshed {
                    id,
                    replaced: old.id,
                    pinned,
                    evicted,
                }
            }
            None => {
                debug!(%id, len = self.entries.len(), "history entry inserted");
                Observed::Inserted { id, evicted }
            }
        }
    }

    /// Drops the last unpinned entry, which may be the one just inserted when
    /// everything older is pinned. A fully pinned history stays over capacity.
    fn evict_one(&mut self) -> Option<EntryId> {
        let idx = self.entries.iter().rposition(|e| !e.pinned)?;
        let evicted = self.entries.remove(idx);
        debug!(id = %evicted.id, "evicted oldest unpinned entry");
        Some(evicted.id)
    }

    /// Flips the pin flag. Returns the new value, or `None` if the id is gone.
    pub fn toggle_pin(&mut self, id: EntryId) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.pinned = !entry.pinned;
        Some(entry.pinned)
    }

    /// Returns whether an entry was removed.
    pub fn delete(&mut self, id: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Payload to write back to the clipboard. Does not reorder the history.
    pub fn promote(&self, id: EntryId) -> Option<Snapshot> {
        self.get(id).map(|e| Snapshot {
            kind: e.kind,
            bytes: e.bytes.clone(),
            text: e.text.clone(),
        })
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn list(&self) -> Vec<EntryView> {
        self.entries.iter().map(Entry::view).collect()
    }

    pub fn image_bytes(&self, id: EntryId) -> Option<&[u8]> {
        self.get(id)
            .filter(|e| e.kind == ContentKind::Image)
            .map(|e| e.bytes.as_slice())
    }
}
