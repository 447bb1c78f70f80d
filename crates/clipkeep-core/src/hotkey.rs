//! Global hotkey: the binding model and the trigger state machine.
//!
//! A [`HotkeyTrigger`] owns exactly one registration with its backend. The
//! backend's platform callback never touches application state; it pushes a
//! [`HotkeyEvent`] into a channel drained by the event loop, and the loop
//! asks the trigger whether the event belongs to the live registration.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{Error, Result};

/// Key identifier using USB HID keyboard usage ids, so the stored value
/// means the same thing on every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

/// Decoded form of a [`KeyCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Letter(char),
    Digit(u8),
    Function(u8),
    Space,
    Return,
    Tab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
}

impl KeyCode {
    pub const V: KeyCode = KeyCode(0x19);
    pub const RETURN: KeyCode = KeyCode(0x28);
    pub const ESCAPE: KeyCode = KeyCode(0x29);
    pub const BACKSPACE: KeyCode = KeyCode(0x2A);
    pub const TAB: KeyCode = KeyCode(0x2B);
    pub const SPACE: KeyCode = KeyCode(0x2C);
    pub const DELETE: KeyCode = KeyCode(0x4C);
    pub const RIGHT: KeyCode = KeyCode(0x4F);
    pub const LEFT: KeyCode = KeyCode(0x50);
    pub const DOWN: KeyCode = KeyCode(0x51);
    pub const UP: KeyCode = KeyCode(0x52);

    pub fn letter(c: char) -> Option<KeyCode> {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase()
            .then(|| KeyCode(0x04 + (c as u32 - 'A' as u32)))
    }

    pub fn digit(d: u8) -> Option<KeyCode> {
        match d {
            0 => Some(KeyCode(0x27)),
            1..=9 => Some(KeyCode(0x1E + u32::from(d) - 1)),
            _ => None,
        }
    }

    pub fn function(n: u8) -> Option<KeyCode> {
        (1..=12)
            .contains(&n)
            .then(|| KeyCode(0x3A + u32::from(n) - 1))
    }

    pub fn key(self) -> Option<Key> {
        let code = self.0;
        let key = match code {
            0x04..=0x1D => Key::Letter(char::from(b'A' + (code - 0x04) as u8)),
            0x1E..=0x26 => Key::Digit((code - 0x1E + 1) as u8),
            0x27 => Key::Digit(0),
            0x28 => Key::Return,
            0x29 => Key::Escape,
            0x2A => Key::Backspace,
            0x2B => Key::Tab,
            0x2C => Key::Space,
            0x3A..=0x45 => Key::Function((code - 0x3A + 1) as u8),
            0x4C => Key::Delete,
            0x4F => Key::Right,
            0x50 => Key::Left,
            0x51 => Key::Down,
            0x52 => Key::Up,
            _ => return None,
        };
        Some(key)
    }

    pub fn label(self) -> String {
        match self.key() {
            Some(Key::Letter(c)) => c.to_string(),
            Some(Key::Digit(d)) => d.to_string(),
            Some(Key::Function(n)) => format!("F{n}"),
            Some(Key::Space) => "Space".into(),
            Some(Key::Return) => "↩".into(),
            Some(Key::Tab) => "⇥".into(),
            Some(Key::Backspace) => "⌫".into(),
            Some(Key::Delete) => "⌦".into(),
            Some(Key::Escape) => "⎋".into(),
            Some(Key::Up) => "↑".into(),
            Some(Key::Down) => "↓".into(),
            Some(Key::Left) => "←".into(),
            Some(Key::Right) => "→".into(),
            None => format!("Key({})", self.0),
        }
    }

    fn from_token(token: &str) -> Option<KeyCode> {
        let lower = token.to_ascii_lowercase();
        let named = match lower.as_str() {
            "space" => Some(KeyCode::SPACE),
            "enter" | "return" => Some(KeyCode::RETURN),
            "tab" => Some(KeyCode::TAB),
            "backspace" => Some(KeyCode::BACKSPACE),
            "delete" | "del" => Some(KeyCode::DELETE),
            "esc" | "escape" => Some(KeyCode::ESCAPE),
            "up" => Some(KeyCode::UP),
            "down" => Some(KeyCode::DOWN),
            "left" => Some(KeyCode::LEFT),
            "right" => Some(KeyCode::RIGHT),
            _ => None,
        };
        if named.is_some() {
            return named;
        }
        let mut chars = lower.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => KeyCode::letter(c),
            (Some(c), None) if c.is_ascii_digit() => KeyCode::digit(c as u8 - b'0'),
            (Some('f'), Some(_)) => lower[1..].parse().ok().and_then(KeyCode::function),
            _ => None,
        }
    }
}

/// Modifier bitset: command/super, control, option/alt, shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierMask(pub u32);

impl ModifierMask {
    pub const NONE: ModifierMask = ModifierMask(0);
    pub const SUPER: ModifierMask = ModifierMask(1 << 0);
    pub const CONTROL: ModifierMask = ModifierMask(1 << 1);
    pub const ALT: ModifierMask = ModifierMask(1 << 2);
    pub const SHIFT: ModifierMask = ModifierMask(1 << 3);

    pub fn contains(self, other: ModifierMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn from_token(token: &str) -> Option<ModifierMask> {
        match token.to_ascii_lowercase().as_str() {
            "cmd" | "command" | "super" | "meta" | "win" | "⌘" => Some(Self::SUPER),
            "ctrl" | "control" | "⌃" => Some(Self::CONTROL),
            "alt" | "opt" | "option" | "⌥" => Some(Self::ALT),
            "shift" | "⇧" => Some(Self::SHIFT),
            _ => None,
        }
    }
}

impl BitOr for ModifierMask {
    type Output = ModifierMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        ModifierMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModifierMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A key chord. Stored as two integers in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub key_code: KeyCode,
    pub modifiers: ModifierMask,
}

impl HotkeyBinding {
    pub fn new(key_code: KeyCode, modifiers: ModifierMask) -> Self {
        Self {
            key_code,
            modifiers,
        }
    }
}

impl Default for HotkeyBinding {
    /// Command/Super + Shift + V.
    fn default() -> Self {
        Self::new(KeyCode::V, ModifierMask::SUPER | ModifierMask::SHIFT)
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let glyphs = [
            (ModifierMask::SUPER, "⌘"),
            (ModifierMask::CONTROL, "⌃"),
            (ModifierMask::ALT, "⌥"),
            (ModifierMask::SHIFT, "⇧"),
        ];
        for (mask, glyph) in glyphs {
            if self.modifiers.contains(mask) {
                write!(f, "{glyph} ")?;
            }
        }
        f.write_str(&self.key_code.label())
    }
}

impl FromStr for HotkeyBinding {
    type Err = Error;

    /// Parses chords such as `cmd+shift+v` or `ctrl+alt+F5`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidBinding {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let mut modifiers = ModifierMask::NONE;
        let mut key = None;
        for token in s.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(invalid("empty key in chord"));
            }
            if let Some(m) = ModifierMask::from_token(token) {
                modifiers |= m;
                continue;
            }
            let code = KeyCode::from_token(token)
                .ok_or_else(|| invalid(&format!("unknown key {token:?}")))?;
            if key.replace(code).is_some() {
                return Err(invalid("more than one non-modifier key"));
            }
        }
        let key_code = key.ok_or_else(|| invalid("chord has no non-modifier key"))?;
        Ok(HotkeyBinding::new(key_code, modifiers))
    }
}

/// Identifier the backend hands out per registration. Events carry it so
/// stale deliveries from a torn-down registration can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub id: RegistrationId,
}

pub type HotkeySender = mpsc::UnboundedSender<HotkeyEvent>;
pub type HotkeyReceiver = mpsc::UnboundedReceiver<HotkeyEvent>;

/// Channel from the platform delivery context into the event loop.
pub fn hotkey_channel() -> (HotkeySender, HotkeyReceiver) {
    mpsc::unbounded_channel()
}

/// Platform hook for system-wide chords. Implementations forward matched
/// key presses to a [`HotkeySender`] and must not run any other logic on the
/// delivery thread.
pub trait HotkeyBackend {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<RegistrationId>;
    fn unregister(&mut self, id: RegistrationId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Unregistered,
    Registered {
        binding: HotkeyBinding,
        id: RegistrationId,
    },
}

pub struct HotkeyTrigger<B: HotkeyBackend> {
    backend: B,
    state: TriggerState,
    /// Last binding asked for, kept for display even when registration
    /// failed.
    requested: Option<HotkeyBinding>,
}

impl<B: HotkeyBackend> HotkeyTrigger<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: TriggerState::Unregistered,
            requested: None,
        }
    }

    /// Installs the initial binding. Calling it while registered behaves
    /// like [`rebind`](Self::rebind).
    pub fn start(&mut self, binding: HotkeyBinding) -> Result<()> {
        self.rebind(binding)
    }

    /// Tears down the current registration, then installs `binding`. On
    /// failure the trigger is left unregistered.
    pub fn rebind(&mut self, binding: HotkeyBinding) -> Result<()> {
        self.teardown();
        self.requested = Some(binding);
        match self.backend.register(&binding) {
            Ok(id) => {
                info!(%binding, id = id.0, "hotkey registered");
                self.state = TriggerState::Registered { binding, id };
                Ok(())
            }
            Err(e) => {
                warn!(%binding, error = %e, "hotkey registration failed");
                Err(e)
            }
        }
    }

    /// Safe to call in any state.
    pub fn stop(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let TriggerState::Registered { binding, id } =
            std::mem::replace(&mut self.state, TriggerState::Unregistered)
        {
            self.backend.unregister(id);
            info!(%binding, id = id.0, "hotkey unregistered");
        }
    }

    /// True when `event` came from the live registration.
    pub fn accept(&self, event: HotkeyEvent) -> bool {
        matches!(self.state, TriggerState::Registered { id, .. } if id == event.id)
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.state, TriggerState::Registered { .. })
    }

    /// Active binding, or the last one attempted if registration failed.
    pub fn binding(&self) -> Option<HotkeyBinding> {
        match self.state {
            TriggerState::Registered { binding, .. } => Some(binding),
            TriggerState::Unregistered => self.requested,
        }
    }
}

impl<B: HotkeyBackend> Drop for HotkeyTrigger<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binding_displays_like_a_shortcut() {
        assert_eq!(HotkeyBinding::default().to_string(), "⌘ ⇧ V");
    }

    #[test]
    fn display_orders_modifiers() {
        let b: HotkeyBinding = "shift+alt+ctrl+cmd+space".parse().unwrap();
        assert_eq!(b.to_string(), "⌘ ⌃ ⌥ ⇧ Space");
    }

    #[test]
    fn parses_function_keys_and_digits() {
        let f5: HotkeyBinding = "ctrl+alt+F5".parse().unwrap();
        assert_eq!(f5.key_code.key(), Some(Key::Function(5)));
        assert_eq!(f5.modifiers, ModifierMask::CONTROL | ModifierMask::ALT);

        let zero: HotkeyBinding = "cmd+0".parse().unwrap();
        assert_eq!(zero.key_code.key(), Some(Key::Digit(0)));
        let nine: HotkeyBinding = "cmd+9".parse().unwrap();
        assert_eq!(nine.key_code.key(), Some(Key::Digit(9)));
    }

    #[test]
    fn letters_round_trip_through_key() {
        for c in 'A'..='Z' {
            let code = KeyCode::letter(c).unwrap();
            assert_eq!(code.key(), Some(Key::Letter(c)));
        }
        assert_eq!(KeyCode::letter('v'), Some(KeyCode::V));
    }

    #[test]
    fn rejects_modifier_only_and_unknown_keys() {
        assert!(matches!(
            "cmd+shift".parse::<HotkeyBinding>(),
            Err(Error::InvalidBinding { .. })
        ));
        assert!("cmd+banana".parse::<HotkeyBinding>().is_err());
        assert!("cmd+a+b".parse::<HotkeyBinding>().is_err());
        assert!("cmd++v".parse::<HotkeyBinding>().is_err());
        assert!("F13".parse::<HotkeyBinding>().is_err());
    }

    #[test]
    fn unknown_code_has_fallback_label() {
        assert_eq!(KeyCode(0x99).label(), "Key(153)");
        assert_eq!(KeyCode(0x99).key(), None);
    }
}
