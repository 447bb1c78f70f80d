//! The single-context event loop.
//!
//! Everything that mutates history, the hotkey registration or the surface
//! state happens inside [`App::run`]. Other contexts (the platform hotkey
//! thread, control connections, signal handlers) only send messages in.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Sleep};
use tracing::{debug, info, warn};

use crate::config::{Settings, SettingsStore};
use crate::history::{EntryId, EntryView, HistoryEngine};
use crate::hotkey::{HotkeyBackend, HotkeyBinding, HotkeyEvent, HotkeyReceiver, HotkeyTrigger};
use crate::poll::PollScheduler;
use crate::snapshot::{ClipboardWriter, PasteKeystroke, SnapshotReader};
use crate::surface::{ActivationSurface, SurfaceState, WindowToggle};
use crate::{Error, Result};

/// Messages accepted by the event loop. Each carries a oneshot for its reply.
pub enum Command {
    List {
        limit: Option<usize>,
        reply: oneshot::Sender<Vec<EntryView>>,
    },
    Image {
        id: EntryId,
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
    TogglePin {
        id: EntryId,
        reply: oneshot::Sender<Option<bool>>,
    },
    Delete {
        id: EntryId,
        reply: oneshot::Sender<bool>,
    },
    Activate {
        id: EntryId,
        reply: oneshot::Sender<Result<bool>>,
    },
    Copy {
        id: EntryId,
        reply: oneshot::Sender<Result<bool>>,
    },
    Toggle {
        reply: oneshot::Sender<SurfaceState>,
    },
    FocusLost {
        reply: oneshot::Sender<SurfaceState>,
    },
    Rebind {
        binding: HotkeyBinding,
        reply: oneshot::Sender<Result<()>>,
    },
    Status {
        reply: oneshot::Sender<StatusReport>,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub binding: Option<HotkeyBinding>,
    /// Display form of `binding`, e.g. `⌘ ⇧ V`.
    pub shortcut: Option<String>,
    pub registered: bool,
    pub surface: SurfaceState,
    pub entries: usize,
    pub capacity: usize,
    pub polling: bool,
    pub poll_interval_ms: u64,
    pub paste_pending: bool,
}

/// Cloneable sender side of the event loop.
#[derive(Clone)]
pub struct AppHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl AppHandle {
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| Error::LoopClosed)?;
        rx.await.map_err(|_| Error::LoopClosed)
    }

    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<EntryView>> {
        self.call(|reply| Command::List { limit, reply }).await
    }

    pub async fn image(&self, id: EntryId) -> Result<Option<Vec<u8>>> {
        self.call(|reply| Command::Image { id, reply }).await
    }

    pub async fn toggle_pin(&self, id: EntryId) -> Result<Option<bool>> {
        self.call(|reply| Command::TogglePin { id, reply }).await
    }

    pub async fn delete(&self, id: EntryId) -> Result<bool> {
        self.call(|reply| Command::Delete { id, reply }).await
    }

    /// Returns `false` when the id is not in history.
    pub async fn activate(&self, id: EntryId) -> Result<bool> {
        self.call(|reply| Command::Activate { id, reply }).await?
    }

    pub async fn copy(&self, id: EntryId) -> Result<bool> {
        self.call(|reply| Command::Copy { id, reply }).await?
    }

    pub async fn toggle(&self) -> Result<SurfaceState> {
        self.call(|reply| Command::Toggle { reply }).await
    }

    pub async fn focus_lost(&self) -> Result<SurfaceState> {
        self.call(|reply| Command::FocusLost { reply }).await
    }

    pub async fn rebind(&self, binding: HotkeyBinding) -> Result<()> {
        self.call(|reply| Command::Rebind { binding, reply }).await?
    }

    pub async fn status(&self) -> Result<StatusReport> {
        self.call(|reply| Command::Status { reply }).await
    }

    /// Asks the loop to stop. Does not wait for it.
    pub fn shutdown(&self) -> Result<()> {
        self.tx.send(Command::Shutdown).map_err(|_| Error::LoopClosed)
    }
}

/// Platform collaborators handed to [`App::new`].
pub struct Platform<R, B> {
    pub reader: R,
    pub hotkeys: B,
    pub hotkey_events: HotkeyReceiver,
    pub surface: Box<dyn ActivationSurface>,
    pub writer: Box<dyn ClipboardWriter>,
    pub paste: Box<dyn PasteKeystroke>,
}

enum LoopEvent {
    Tick,
    Hotkey(HotkeyEvent),
    Command(Command),
    PasteDue,
}

pub struct App<R: SnapshotReader, B: HotkeyBackend> {
    engine: HistoryEngine,
    scheduler: PollScheduler<R>,
    trigger: HotkeyTrigger<B>,
    binding: HotkeyBinding,
    toggle: WindowToggle,
    surface: Box<dyn ActivationSurface>,
    writer: Box<dyn ClipboardWriter>,
    paste: Box<dyn PasteKeystroke>,
    settings: Option<SettingsStore>,
    paste_delay: Duration,
    pending_paste: Option<Pin<Box<Sleep>>>,
    hotkey_events: HotkeyReceiver,
    commands: mpsc::UnboundedReceiver<Command>,
    handle: AppHandle,
}

impl<R: SnapshotReader, B: HotkeyBackend> App<R, B> {
    pub fn new(settings: &Settings, platform: Platform<R, B>) -> Self {
        let (tx, commands) = mpsc::unbounded_channel();
        Self {
            engine: HistoryEngine::new(settings.capacity),
            scheduler: PollScheduler::new(platform.reader, settings.poll_interval()),
            trigger: HotkeyTrigger::new(platform.hotkeys),
            binding: settings.hotkey,
            toggle: WindowToggle::default(),
            surface: platform.surface,
            writer: platform.writer,
            paste: platform.paste,
            settings: None,
            paste_delay: settings.paste_delay(),
            pending_paste: None,
            hotkey_events: platform.hotkey_events,
            commands,
            handle: AppHandle { tx },
        }
    }

    /// Successful rebinds are written back to this settings file.
    pub fn with_settings_store(mut self, store: SettingsStore) -> Self {
        self.settings = Some(store);
        self
    }

    pub fn handle(&self) -> AppHandle {
        self.handle.clone()
    }

    /// Runs until a [`Command::Shutdown`] arrives. Must be driven on a
    /// single-threaded runtime together with the platform event source.
    pub async fn run(mut self) -> Result<()> {
        self.scheduler.start();
        if let Err(e) = self.trigger.start(self.binding) {
            warn!(error = %e, "continuing without a global shortcut");
        }
        info!(capacity = self.engine.capacity(), "event loop running");

        loop {
            let event = tokio::select! {
                _ = self.scheduler.next_tick() => LoopEvent::Tick,
                Some(ev) = self.hotkey_events.recv() => LoopEvent::Hotkey(ev),
                Some(cmd) = self.commands.recv() => LoopEvent::Command(cmd),
                _ = paste_due(&mut self.pending_paste) => LoopEvent::PasteDue,
            };

            match event {
                LoopEvent::Tick => {
                    if let Some(outcome) = self.scheduler.tick(&mut self.engine) {
                        debug!(?outcome, "clipboard observed");
                    }
                }
                LoopEvent::Hotkey(ev) => {
                    if self.trigger.accept(ev) {
                        let state = self.toggle.on_trigger(self.surface.as_mut());
                        debug!(?state, "hotkey toggled surface");
                    } else {
                        debug!(id = ev.id.0, "ignoring event from stale registration");
                    }
                }
                LoopEvent::PasteDue => {
                    self.pending_paste = None;
                    debug!("posting paste keystroke");
                    self.paste.simulate_paste();
                }
                LoopEvent::Command(Command::Shutdown) => break,
                LoopEvent::Command(cmd) => self.handle_command(cmd),
            }
        }

        self.scheduler.stop();
        self.trigger.stop();
        info!("event loop stopped");
        Ok(())
    }

    // Reply send errors mean the requester went away; nothing to do.
    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::List { limit, reply } => {
                let mut entries = self.engine.list();
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                let _ = reply.send(entries);
            }
            Command::Image { id, reply } => {
                let _ = reply.send(self.engine.image_bytes(id).map(<[u8]>::to_vec));
            }
            Command::TogglePin { id, reply } => {
                let pinned = self.engine.toggle_pin(id);
                debug!(%id, ?pinned, "toggle pin");
                let _ = reply.send(pinned);
            }
            Command::Delete { id, reply } => {
                let removed = self.engine.delete(id);
                debug!(%id, removed, "delete entry");
                let _ = reply.send(removed);
            }
            Command::Activate { id, reply } => {
                let _ = reply.send(self.activate(id));
            }
            Command::Copy { id, reply } => {
                let _ = reply.send(self.copy(id));
            }
            Command::Toggle { reply } => {
                let _ = reply.send(self.toggle.on_trigger(self.surface.as_mut()));
            }
            Command::FocusLost { reply } => {
                let _ = reply.send(self.toggle.on_focus_lost(self.surface.as_mut()));
            }
            Command::Rebind { binding, reply } => {
                let result = self.trigger.rebind(binding);
                if result.is_ok() {
                    self.binding = binding;
                    if let Some(store) = &self.settings {
                        if let Err(e) = store.save_hotkey(binding) {
                            warn!(error = %e, path = %store.path().display(), "could not persist hotkey");
                        }
                    }
                }
                let _ = reply.send(result);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown => {}
        }
    }

    /// Writes the entry back to the clipboard. The next poll sees the write
    /// and either suppresses it as an echo or moves the entry to the top.
    fn copy(&mut self, id: EntryId) -> Result<bool> {
        let Some(snapshot) = self.engine.promote(id) else {
            debug!(%id, "copy of unknown entry");
            return Ok(false);
        };
        self.writer.write(&snapshot)?;
        Ok(true)
    }

    fn activate(&mut self, id: EntryId) -> Result<bool> {
        if !self.copy(id)? {
            return Ok(false);
        }
        self.toggle.hide(self.surface.as_mut());
        // A second activation inside the delay replaces the first; one paste.
        self.pending_paste = Some(Box::pin(time::sleep(self.paste_delay)));
        debug!(%id, delay_ms = self.paste_delay.as_millis() as u64, "paste scheduled");
        Ok(true)
    }

    fn status(&self) -> StatusReport {
        let binding = self.trigger.binding();
        StatusReport {
            binding,
            shortcut: binding.map(|b| b.to_string()),
            registered: self.trigger.is_registered(),
            surface: self.toggle.state(),
            entries: self.engine.len(),
            capacity: self.engine.capacity(),
            polling: self.scheduler.is_running(),
            poll_interval_ms: self.scheduler.period().as_millis() as u64,
            paste_pending: self.pending_paste.is_some(),
        }
    }
}

async fn paste_due(pending: &mut Option<Pin<Box<Sleep>>>) {
    match pending {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending::<()>().await,
    }
}
