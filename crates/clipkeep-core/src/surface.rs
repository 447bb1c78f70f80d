//! Show/hide toggle for the activation surface.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceState {
    Shown,
    Hidden,
}

/// The UI that lists history entries. Placement and styling are its own
/// business; the core only tells it when to appear and disappear.
pub trait ActivationSurface {
    /// Center on screen, show, and take input focus.
    fn show_centered(&mut self);
    fn hide(&mut self);
}

#[derive(Debug)]
pub struct WindowToggle {
    state: SurfaceState,
}

impl Default for WindowToggle {
    fn default() -> Self {
        Self {
            state: SurfaceState::Hidden,
        }
    }
}

impl WindowToggle {
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Hotkey fired.
    pub fn on_trigger(&mut self, surface: &mut dyn ActivationSurface) -> SurfaceState {
        match self.state {
            SurfaceState::Shown => self.hide(surface),
            SurfaceState::Hidden => {
                surface.show_centered();
                self.state = SurfaceState::Shown;
                debug!("activation surface shown");
            }
        }
        self.state
    }

    /// The surface lost input focus: auto-hide.
    pub fn on_focus_lost(&mut self, surface: &mut dyn ActivationSurface) -> SurfaceState {
        self.hide(surface);
        self.state
    }

    pub fn hide(&mut self, surface: &mut dyn ActivationSurface) {
        if self.state == SurfaceState::Shown {
            surface.hide();
            self.state = SurfaceState::Hidden;
            debug!("activation surface hidden");
        }
    }
}
