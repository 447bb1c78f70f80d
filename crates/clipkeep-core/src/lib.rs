//! Core of the clipkeep clipboard history manager: a bounded, pin-aware
//! history, clipboard change polling, a single global shortcut and the event
//! loop that ties them together. Platform access sits behind traits so the
//! daemon can plug in real backends and tests can plug in fakes.

pub mod autostart;
pub mod config;
pub mod error;
pub mod history;
pub mod hotkey;
pub mod poll;
pub mod protocol;
pub mod runtime;
pub mod snapshot;
pub mod surface;

pub use config::Settings;
pub use error::{Error, Result};
pub use history::{Entry, EntryId, EntryView, HistoryEngine, Observed, DEFAULT_CAPACITY};
pub use hotkey::{
    hotkey_channel, HotkeyBackend, HotkeyBinding, HotkeyEvent, HotkeyReceiver, HotkeySender,
    HotkeyTrigger, Key, KeyCode, ModifierMask, RegistrationId, TriggerState,
};
pub use poll::{PollScheduler, DEFAULT_POLL_INTERVAL};
pub use runtime::{App, AppHandle, Platform, StatusReport};
pub use snapshot::{ClipboardWriter, ContentKind, PasteKeystroke, Snapshot, SnapshotReader};
pub use surface::{ActivationSurface, SurfaceState, WindowToggle};
