//! Launch at login.

use std::path::Path;

use auto_launch::{AutoLaunch, AutoLaunchBuilder};
use tracing::info;

use crate::config::{load_launch_state, save_launch_state};
use crate::{Error, Result};

pub const APP_NAME: &str = "clipkeep";

pub trait LoginItem {
    fn enable(&self) -> Result<()>;
    fn disable(&self) -> Result<()>;
    fn is_enabled(&self) -> Result<bool>;
}

/// Login item backed by the platform mechanism (LaunchAgent plist, XDG
/// autostart entry, or the Run registry key).
pub struct LaunchAtLogin {
    inner: AutoLaunch,
}

impl LaunchAtLogin {
    pub fn new(app_path: &Path) -> Result<Self> {
        let app_path = app_path
            .to_str()
            .ok_or_else(|| Error::Autostart(format!("non-UTF-8 path {}", app_path.display())))?;
        let inner = AutoLaunchBuilder::new()
            .set_app_name(APP_NAME)
            .set_app_path(app_path)
            .build()
            .map_err(|e| Error::Autostart(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Login item pointing at the running executable.
    pub fn for_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| Error::Autostart(e.to_string()))?;
        Self::new(&exe)
    }
}

impl LoginItem for LaunchAtLogin {
    fn enable(&self) -> Result<()> {
        self.inner
            .enable()
            .map_err(|e| Error::Autostart(e.to_string()))
    }

    fn disable(&self) -> Result<()> {
        self.inner
            .disable()
            .map_err(|e| Error::Autostart(e.to_string()))
    }

    fn is_enabled(&self) -> Result<bool> {
        self.inner
            .is_enabled()
            .map_err(|e| Error::Autostart(e.to_string()))
    }
}

/// Startup policy: an explicit preference is enforced; without one, launch
/// at login is switched on the first time the daemon ever runs. Returns the
/// resulting enabled state.
pub fn apply_startup_policy(
    state_path: &Path,
    preference: Option<bool>,
    item: &dyn LoginItem,
) -> Result<bool> {
    let mut state = load_launch_state(state_path);
    let want = match preference {
        Some(pref) => Some(pref),
        None if !state.has_launched_before => Some(true),
        None => None,
    };

    let enabled = match want {
        Some(want) if item.is_enabled()? != want => {
            if want {
                item.enable()?;
            } else {
                item.disable()?;
            }
            info!(enabled = want, "launch at login updated");
            want
        }
        Some(want) => want,
        None => item.is_enabled()?,
    };

    if !state.has_launched_before {
        state.has_launched_before = true;
        save_launch_state(state_path, &state)?;
    }
    Ok(enabled)
}
