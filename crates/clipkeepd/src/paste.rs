//! Synthetic paste chord, posted by the platform's own input tools.

use std::process::{Child, Command, Stdio};

use clipkeep_core::PasteKeystroke;
use tracing::{debug, warn};

/// Program plus arguments that type the paste chord into the focused window.
type Invocation = (&'static str, &'static [&'static str]);

#[cfg(target_os = "linux")]
const WTYPE: Invocation = ("wtype", &["-M", "ctrl", "v", "-m", "ctrl"]);
#[cfg(target_os = "linux")]
const YDOTOOL: Invocation = ("ydotool", &["key", "29:1", "47:1", "47:0", "29:0"]);
#[cfg(target_os = "linux")]
const XDOTOOL: Invocation = ("xdotool", &["key", "--clearmodifiers", "ctrl+v"]);

#[cfg(target_os = "macos")]
const OSASCRIPT: Invocation = (
    "osascript",
    &[
        "-e",
        "tell application \"System Events\" to keystroke \"v\" using command down",
    ],
);

#[cfg(target_os = "windows")]
const SENDKEYS: Invocation = (
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "(New-Object -ComObject WScript.Shell).SendKeys('^v')",
    ],
);

#[cfg(target_os = "linux")]
fn candidates() -> Vec<Invocation> {
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        vec![WTYPE, YDOTOOL, XDOTOOL]
    } else {
        vec![XDOTOOL]
    }
}

#[cfg(target_os = "macos")]
fn candidates() -> Vec<Invocation> {
    vec![OSASCRIPT]
}

#[cfg(target_os = "windows")]
fn candidates() -> Vec<Invocation> {
    vec![SENDKEYS]
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn candidates() -> Vec<Invocation> {
    Vec::new()
}

fn try_prog(prog: &str, args: &[&str]) -> Option<Child> {
    Command::new(prog)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .ok()
}

/// Fire-and-forget: the first tool that starts wins, and its exit status is
/// collected on a detached thread so the event loop never waits on it.
pub struct CommandPaste {
    candidates: Vec<Invocation>,
}

impl Default for CommandPaste {
    fn default() -> Self {
        Self {
            candidates: candidates(),
        }
    }
}

impl CommandPaste {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasteKeystroke for CommandPaste {
    fn simulate_paste(&mut self) {
        for (prog, args) in &self.candidates {
            if let Some(mut child) = try_prog(prog, args) {
                debug!(prog, "paste keystroke posted");
                let prog = *prog;
                std::thread::spawn(move || match child.wait() {
                    Ok(status) if !status.success() => {
                        warn!(prog, %status, "paste helper failed")
                    }
                    Err(e) => warn!(prog, error = %e, "paste helper wait failed"),
                    Ok(_) => {}
                });
                return;
            }
        }
        warn!("no paste helper available; entry left on the clipboard");
    }
}
