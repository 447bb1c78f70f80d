mod client;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use clipkeep_core::autostart::{LaunchAtLogin, LoginItem};
use clipkeep_core::config::{self, SettingsStore};
use clipkeep_core::protocol::{ImagePayload, Request};
use clipkeep_core::{ContentKind, EntryId, EntryView, HotkeyBinding, StatusReport, SurfaceState};
use serde_json::json;

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(name = "clipkeep", version, about = "Clipboard history from the command line")]
struct Cli {
    /// Settings file (defaults to <config dir>/clipkeep/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Connect to this port instead of reading clipkeepd.json
    #[arg(long, global = true)]
    port: Option<u16>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List history entries, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Pin or unpin an entry
    Pin { id: String },
    /// Remove an entry
    Delete { id: String },
    /// Put an entry on the clipboard and paste it into the focused app
    Paste { id: String },
    /// Put an entry on the clipboard
    Copy { id: String },
    /// Save an image entry as PNG
    Image {
        id: String,
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Show or hide the picker
    Toggle,
    /// Change the global shortcut, e.g. `cmd+shift+v` or `ctrl+alt+F5`
    Rebind { chord: String },
    /// Daemon state
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Stop the daemon
    Stop,
    /// Launch clipkeepd at login
    Autostart {
        #[command(subcommand)]
        action: AutostartAction,
    },
    /// Print effective settings and file locations
    Config {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum AutostartAction {
    Enable,
    Disable,
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings_path = cli.config.clone().unwrap_or_else(config::settings_path);
    let port = cli.port;
    let connect = || match port {
        Some(port) => DaemonClient::connect_port(port),
        None => DaemonClient::connect(&config::daemon_info_path()),
    };

    match cli.command {
        Commands::List { limit, json } => {
            let items: Vec<EntryView> = connect()?.call_as(&Request::List { limit })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for e in &items {
                    println!("{}", list_row(e));
                }
            }
        }
        Commands::Pin { id } => {
            let id = parse_id(&id)?;
            let v = connect()?.call(&Request::Pin { id })?;
            match v.get("pinned").and_then(|p| p.as_bool()) {
                Some(true) => println!("pinned {id}"),
                Some(false) => println!("unpinned {id}"),
                None => println!("{}", not_found(id)),
            }
        }
        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            let v = connect()?.call(&Request::Delete { id })?;
            println!("{}", outcome(&v, "deleted", id));
        }
        Commands::Paste { id } => {
            let id = parse_id(&id)?;
            let v = connect()?.call(&Request::Activate { id })?;
            println!("{}", outcome(&v, "pasting", id));
        }
        Commands::Copy { id } => {
            let id = parse_id(&id)?;
            let v = connect()?.call(&Request::Copy { id })?;
            println!("{}", outcome(&v, "copied", id));
        }
        Commands::Image { id, out } => {
            let id = parse_id(&id)?;
            let payload: ImagePayload = connect()?.call_as(&Request::Image { id })?;
            let png = payload.decode()?;
            std::fs::write(&out, &png).with_context(|| format!("writing {}", out.display()))?;
            println!("wrote {} ({} bytes)", out.display(), png.len());
        }
        Commands::Toggle => {
            let state: SurfaceState = connect()?.call_as(&Request::Toggle)?;
            println!("{}", surface_label(state));
        }
        Commands::Rebind { chord } => {
            let binding: HotkeyBinding = chord.parse()?;
            connect()?.call(&Request::Rebind { binding })?;
            println!("shortcut set to {binding}");
        }
        Commands::Status { json } => {
            let status: StatusReport = connect()?.call_as(&Request::Status)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
        Commands::Stop => {
            connect()?.call(&Request::Shutdown)?;
            println!("clipkeepd stopping");
        }
        Commands::Autostart { action } => autostart(action, &settings_path)?,
        Commands::Config { json } => print_config(&settings_path, json)?,
    }
    Ok(())
}

fn parse_id(s: &str) -> Result<EntryId> {
    Ok(s.parse::<EntryId>()?)
}

fn not_found(id: EntryId) -> String {
    format!("{id} is no longer in history; nothing to do")
}

fn outcome(v: &serde_json::Value, done: &str, id: EntryId) -> String {
    if v.get("found").and_then(|f| f.as_bool()).unwrap_or(false) {
        format!("{done} {id}")
    } else {
        not_found(id)
    }
}

fn preview(s: &str) -> String {
    let s = s.replace('\n', " ");
    const MAX: usize = 60;
    match s.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &s[..cut]),
        None => s,
    }
}

fn list_row(e: &EntryView) -> String {
    let when = e.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    let body = match e.kind {
        ContentKind::Text => preview(e.text.as_deref().unwrap_or_default()),
        ContentKind::Image => "[image]".to_string(),
    };
    format!(
        "{}\t{}\t{}\t{}",
        e.id,
        if e.pinned { "*" } else { " " },
        when,
        body
    )
}

fn surface_label(state: SurfaceState) -> &'static str {
    match state {
        SurfaceState::Shown => "shown",
        SurfaceState::Hidden => "hidden",
    }
}

fn print_status(s: &StatusReport) {
    let shortcut = s.shortcut.as_deref().unwrap_or("none");
    let registered = if s.registered { "active" } else { "not registered" };
    println!("shortcut: {shortcut} ({registered})");
    println!("surface:  {}", surface_label(s.surface));
    println!("history:  {}/{}", s.entries, s.capacity);
    println!(
        "polling:  {} every {} ms",
        if s.polling { "on" } else { "off" },
        s.poll_interval_ms
    );
}

/// The login item launches the daemon, which is installed next to this
/// binary.
fn daemon_exe() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("locating clipkeep executable")?;
    let dir = exe
        .parent()
        .context("clipkeep executable has no parent directory")?;
    Ok(dir.join(format!("clipkeepd{}", std::env::consts::EXE_SUFFIX)))
}

fn autostart(action: AutostartAction, settings_path: &Path) -> Result<()> {
    let item = LaunchAtLogin::new(&daemon_exe()?)?;
    let store = SettingsStore::new(settings_path);
    match action {
        AutostartAction::Enable | AutostartAction::Disable => {
            let enable = matches!(action, AutostartAction::Enable);
            if enable {
                item.enable()?;
            } else {
                item.disable()?;
            }
            store.save_launch_at_login(enable)?;
            println!(
                "launch at login {}",
                if enable { "enabled" } else { "disabled" }
            );
        }
        AutostartAction::Status => {
            let enabled = item.is_enabled()?;
            let preference = store.load()?.launch_at_login;
            println!(
                "launch at login: {} (preference: {})",
                if enabled { "enabled" } else { "disabled" },
                match preference {
                    Some(true) => "on",
                    Some(false) => "off",
                    None => "first-run default",
                }
            );
        }
    }
    Ok(())
}

fn print_config(settings_path: &Path, as_json: bool) -> Result<()> {
    let settings = config::load_settings_from(settings_path)?;
    if as_json {
        let v = json!({
            "config_dir": config::config_dir(),
            "state_dir": config::state_dir(),
            "settings_path": settings_path,
            "daemon_info": config::daemon_info_path(),
            "shortcut": settings.hotkey.to_string(),
            "settings": settings,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("# {}", settings_path.display());
        println!("# shortcut: {}", settings.hotkey);
        print!("{}", toml::to_string_pretty(&settings)?);
    }
    Ok(())
}
