#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clipkeep_core::{
    hotkey_channel, ActivationSurface, App, ClipboardWriter, Error, HotkeyBackend, HotkeyBinding,
    HotkeyEvent, HotkeySender, PasteKeystroke, Platform, RegistrationId, Result, Settings,
    Snapshot, SnapshotReader,
};

#[derive(Default)]
struct ClipState {
    generation: u64,
    content: Option<Snapshot>,
    fail_reads: bool,
    writes: Vec<Snapshot>,
}

/// In-memory clipboard. Clones share the same contents, so one clone can be
/// handed to the app as reader, another as writer, and a third kept by the
/// test to play "some other application".
#[derive(Clone, Default)]
pub struct FakeClipboard {
    state: Arc<Mutex<ClipState>>,
}

impl FakeClipboard {
    pub fn set(&self, snapshot: Option<Snapshot>) {
        let mut st = self.state.lock().unwrap();
        st.generation += 1;
        st.content = snapshot;
    }

    pub fn set_text(&self, text: &str) {
        self.set(Some(Snapshot::text(text)));
    }

    pub fn set_image(&self, png: &[u8]) {
        self.set(Some(Snapshot::image(png.to_vec())));
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn writes(&self) -> Vec<Snapshot> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().generation
    }
}

impl SnapshotReader for FakeClipboard {
    fn current_generation(&mut self) -> u64 {
        self.state.lock().unwrap().generation
    }

    fn read_snapshot(&mut self) -> Result<Option<Snapshot>> {
        let st = self.state.lock().unwrap();
        if st.fail_reads {
            return Err(Error::Clipboard("pasteboard busy".into()));
        }
        Ok(st.content.clone())
    }
}

impl ClipboardWriter for FakeClipboard {
    fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.generation += 1;
        st.content = Some(snapshot.clone());
        st.writes.push(snapshot.clone());
        Ok(())
    }
}

#[derive(Default)]
struct HotkeyState {
    next_id: u32,
    active: HashMap<u32, HotkeyBinding>,
    refused: HashSet<HotkeyBinding>,
    registrations: usize,
    sender: Option<HotkeySender>,
}

/// Hotkey registry standing in for the OS. `press` delivers an event for
/// every live registration of the chord, the way a platform callback would.
#[derive(Clone, Default)]
pub struct FakeHotkeys {
    state: Arc<Mutex<HotkeyState>>,
}

impl FakeHotkeys {
    pub fn connected(sender: HotkeySender) -> Self {
        let hk = Self::default();
        hk.state.lock().unwrap().sender = Some(sender);
        hk
    }

    pub fn refuse(&self, binding: HotkeyBinding) {
        self.state.lock().unwrap().refused.insert(binding);
    }

    pub fn press(&self, binding: HotkeyBinding) {
        let st = self.state.lock().unwrap();
        let Some(tx) = &st.sender else { return };
        for (id, b) in &st.active {
            if *b == binding {
                tx.send(HotkeyEvent {
                    id: RegistrationId(*id),
                })
                .unwrap();
            }
        }
    }

    /// Delivers an event tagged with an arbitrary id, live or not.
    pub fn fire(&self, id: RegistrationId) {
        let st = self.state.lock().unwrap();
        if let Some(tx) = &st.sender {
            tx.send(HotkeyEvent { id }).unwrap();
        }
    }

    pub fn active(&self) -> Vec<(RegistrationId, HotkeyBinding)> {
        let st = self.state.lock().unwrap();
        st.active
            .iter()
            .map(|(id, b)| (RegistrationId(*id), *b))
            .collect()
    }

    pub fn registrations(&self) -> usize {
        self.state.lock().unwrap().registrations
    }
}

impl HotkeyBackend for FakeHotkeys {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<RegistrationId> {
        let mut st = self.state.lock().unwrap();
        if st.refused.contains(binding) {
            return Err(Error::HotkeyRegistration {
                binding: *binding,
                reason: "already claimed by another application".into(),
            });
        }
        st.next_id += 1;
        st.registrations += 1;
        let id = st.next_id;
        st.active.insert(id, *binding);
        Ok(RegistrationId(id))
    }

    fn unregister(&mut self, id: RegistrationId) {
        self.state.lock().unwrap().active.remove(&id.0);
    }
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingSurface {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl ActivationSurface for RecordingSurface {
    fn show_centered(&mut self) {
        self.calls.lock().unwrap().push("show");
    }

    fn hide(&mut self) {
        self.calls.lock().unwrap().push("hide");
    }
}

#[derive(Clone, Default)]
pub struct CountingPaste {
    count: Arc<AtomicUsize>,
}

impl CountingPaste {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl PasteKeystroke for CountingPaste {
    fn simulate_paste(&mut self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handles onto every fake the app was built with.
pub struct Fakes {
    pub clipboard: FakeClipboard,
    pub hotkeys: FakeHotkeys,
    pub surface: RecordingSurface,
    pub paste: CountingPaste,
}

pub type TestApp = App<FakeClipboard, FakeHotkeys>;

/// Builds an app on fresh fakes. `prepare` runs before construction, so
/// anything it puts on the clipboard counts as pre-existing content.
pub fn app_with(settings: &Settings, prepare: impl FnOnce(&Fakes)) -> (TestApp, Fakes) {
    let (tx, rx) = hotkey_channel();
    let f = Fakes {
        clipboard: FakeClipboard::default(),
        hotkeys: FakeHotkeys::connected(tx),
        surface: RecordingSurface::default(),
        paste: CountingPaste::default(),
    };
    prepare(&f);
    let app = App::new(
        settings,
        Platform {
            reader: f.clipboard.clone(),
            hotkeys: f.hotkeys.clone(),
            hotkey_events: rx,
            surface: Box::new(f.surface.clone()),
            writer: Box::new(f.clipboard.clone()),
            paste: Box::new(f.paste.clone()),
        },
    );
    (app, f)
}

pub fn app() -> (TestApp, Fakes) {
    app_with(&Settings::default(), |_| {})
}

pub async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Lets the event loop drain whatever the test just sent it.
pub async fn settle() {
    wait(1).await;
}
