//! `global-hotkey` backend.
//!
//! The crate reports presses through a process-wide handler that runs on its
//! own listener thread (X11) or the platform event loop (macOS, Windows). The
//! handler only forwards the registration id into the event loop's channel.
//!
//! global-hotkey derives its ids from the chord itself, so binding the same
//! chord twice yields the same id. Each registration therefore gets its own
//! id here, and `Routes` maps the platform id to the live one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clipkeep_core::{
    Error, HotkeyBackend, HotkeyBinding, HotkeyEvent, HotkeySender, Key, ModifierMask,
    RegistrationId, Result,
};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tracing::{trace, warn};

/// Set on hosts where global-hotkey only delivers while the main thread pumps
/// a platform event loop. The daemon runs none, so shortcuts stay off there.
#[cfg(any(target_os = "macos", target_os = "windows"))]
const NO_EVENT_LOOP: Option<&str> =
    Some("global shortcuts need a platform event loop on this OS; use `clipkeep toggle`");
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const NO_EVENT_LOOP: Option<&str> = None;

/// Platform hotkey id to the registration currently holding it. Shared with
/// the delivery thread.
#[derive(Clone, Default)]
struct Routes(Arc<Mutex<HashMap<u32, RegistrationId>>>);

impl Routes {
    fn lock(&self) -> MutexGuard<'_, HashMap<u32, RegistrationId>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bind(&self, platform: u32, id: RegistrationId) {
        self.lock().insert(platform, id);
    }

    /// Only drops the route if `id` still owns it.
    fn release(&self, platform: u32, id: RegistrationId) {
        let mut routes = self.lock();
        if routes.get(&platform) == Some(&id) {
            routes.remove(&platform);
        }
    }

    fn resolve(&self, platform: u32) -> Option<RegistrationId> {
        self.lock().get(&platform).copied()
    }
}

pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    routes: Routes,
    live: HashMap<RegistrationId, HotKey>,
    next_id: u32,
}

impl GlobalHotkeyBackend {
    pub fn new(events: HotkeySender) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().map_err(|e| Error::HotkeyRegistration {
            binding: HotkeyBinding::default(),
            reason: format!("hotkey manager unavailable: {e}"),
        })?;
        let routes = Routes::default();
        let delivery = routes.clone();
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.state != HotKeyState::Pressed {
                return;
            }
            match delivery.resolve(event.id) {
                Some(id) => {
                    trace!(platform = event.id, id = id.0, "hotkey pressed");
                    let _ = events.send(HotkeyEvent { id });
                }
                None => trace!(platform = event.id, "press for released hotkey dropped"),
            }
        }));
        Ok(Self {
            manager,
            routes,
            live: HashMap::new(),
            next_id: 0,
        })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<RegistrationId> {
        let hotkey = to_hotkey(binding)?;
        self.manager
            .register(hotkey)
            .map_err(|e| Error::HotkeyRegistration {
                binding: *binding,
                reason: e.to_string(),
            })?;
        self.next_id = self.next_id.wrapping_add(1);
        let id = RegistrationId(self.next_id);
        self.routes.bind(hotkey.id(), id);
        self.live.insert(id, hotkey);
        Ok(id)
    }

    fn unregister(&mut self, id: RegistrationId) {
        if let Some(hotkey) = self.live.remove(&id) {
            self.routes.release(hotkey.id(), id);
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!(id = id.0, error = %e, "hotkey unregister failed");
            }
        }
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);
    }
}

/// Backend the daemon actually runs with: the real one, or a stand-in that
/// refuses every chord when global shortcuts are off or unavailable.
pub enum Hotkeys {
    Global(GlobalHotkeyBackend),
    Disabled(String),
}

impl Hotkeys {
    pub fn connect(enabled: bool, events: HotkeySender) -> Self {
        if !enabled {
            return Hotkeys::Disabled("disabled by --no-hotkey".into());
        }
        if let Some(reason) = NO_EVENT_LOOP {
            warn!(reason, "global shortcuts unavailable");
            return Hotkeys::Disabled(reason.into());
        }
        match GlobalHotkeyBackend::new(events) {
            Ok(backend) => Hotkeys::Global(backend),
            Err(e) => {
                warn!(error = %e, "global shortcuts unavailable");
                Hotkeys::Disabled(e.to_string())
            }
        }
    }
}

impl HotkeyBackend for Hotkeys {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<RegistrationId> {
        match self {
            Hotkeys::Global(backend) => backend.register(binding),
            Hotkeys::Disabled(reason) => Err(Error::HotkeyRegistration {
                binding: *binding,
                reason: reason.clone(),
            }),
        }
    }

    fn unregister(&mut self, id: RegistrationId) {
        if let Hotkeys::Global(backend) = self {
            backend.unregister(id);
        }
    }
}

fn to_hotkey(binding: &HotkeyBinding) -> Result<HotKey> {
    let code = binding
        .key_code
        .key()
        .and_then(code_for)
        .ok_or_else(|| Error::HotkeyRegistration {
            binding: *binding,
            reason: "key has no platform mapping".into(),
        })?;
    let mods = modifiers_for(binding.modifiers);
    Ok(HotKey::new((!mods.is_empty()).then_some(mods), code))
}

fn modifiers_for(mask: ModifierMask) -> Modifiers {
    let mut mods = Modifiers::empty();
    for (bit, m) in [
        (ModifierMask::SUPER, Modifiers::SUPER),
        (ModifierMask::CONTROL, Modifiers::CONTROL),
        (ModifierMask::ALT, Modifiers::ALT),
        (ModifierMask::SHIFT, Modifiers::SHIFT),
    ] {
        if mask.contains(bit) {
            mods |= m;
        }
    }
    mods
}

fn code_for(key: Key) -> Option<Code> {
    let code = match key {
        Key::Letter(c) => letter_code(c)?,
        Key::Digit(d) => digit_code(d)?,
        Key::Function(n) => function_code(n)?,
        Key::Space => Code::Space,
        Key::Return => Code::Enter,
        Key::Tab => Code::Tab,
        Key::Backspace => Code::Backspace,
        Key::Delete => Code::Delete,
        Key::Escape => Code::Escape,
        Key::Up => Code::ArrowUp,
        Key::Down => Code::ArrowDown,
        Key::Left => Code::ArrowLeft,
        Key::Right => Code::ArrowRight,
    };
    Some(code)
}

fn letter_code(c: char) -> Option<Code> {
    const LETTERS: [Code; 26] = [
        Code::KeyA,
        Code::KeyB,
        Code::KeyC,
        Code::KeyD,
        Code::KeyE,
        Code::KeyF,
        Code::KeyG,
        Code::KeyH,
        Code::KeyI,
        Code::KeyJ,
        Code::KeyK,
        Code::KeyL,
        Code::KeyM,
        Code::KeyN,
        Code::KeyO,
        Code::KeyP,
        Code::KeyQ,
        Code::KeyR,
        Code::KeyS,
        Code::KeyT,
        Code::KeyU,
        Code::KeyV,
        Code::KeyW,
        Code::KeyX,
        Code::KeyY,
        Code::KeyZ,
    ];
    let idx = (c.to_ascii_uppercase() as usize).checked_sub('A' as usize)?;
    LETTERS.get(idx).copied()
}

fn digit_code(d: u8) -> Option<Code> {
    const DIGITS: [Code; 10] = [
        Code::Digit0,
        Code::Digit1,
        Code::Digit2,
        Code::Digit3,
        Code::Digit4,
        Code::Digit5,
        Code::Digit6,
        Code::Digit7,
        Code::Digit8,
        Code::Digit9,
    ];
    DIGITS.get(usize::from(d)).copied()
}

fn function_code(n: u8) -> Option<Code> {
    const FUNCTION: [Code; 12] = [
        Code::F1,
        Code::F2,
        Code::F3,
        Code::F4,
        Code::F5,
        Code::F6,
        Code::F7,
        Code::F8,
        Code::F9,
        Code::F10,
        Code::F11,
        Code::F12,
    ];
    FUNCTION.get(usize::from(n).checked_sub(1)?).copied()
}
