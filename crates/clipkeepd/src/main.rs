mod clipboard;
mod hotkeys;
mod paste;
mod server;
mod surface;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use clipkeep_core::autostart::{apply_startup_policy, LaunchAtLogin};
use clipkeep_core::config::{self, SettingsStore};
use clipkeep_core::protocol::DaemonInfo;
use clipkeep_core::{hotkey_channel, App, Platform};
use tracing::{info, warn};

use crate::clipboard::{ArboardReader, ArboardWriter};
use crate::hotkeys::Hotkeys;
use crate::paste::CommandPaste;
use crate::surface::HeadlessSurface;

#[derive(Parser, Debug)]
#[command(name = "clipkeepd", version, about = "clipkeep clipboard history daemon")]
struct Cli {
    /// Settings file (defaults to <config dir>/clipkeep/settings.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listening port on 127.0.0.1 (0 = auto)
    #[arg(long, default_value_t = 0)]
    port: u16,
    /// Clipboard poll interval in milliseconds (overrides settings)
    #[arg(long)]
    poll_ms: Option<u64>,
    /// History capacity (overrides settings)
    #[arg(long)]
    capacity: Option<usize>,
    /// Do not register the global shortcut
    #[arg(long, default_value_t = false)]
    no_hotkey: bool,
    /// Leave launch-at-login untouched
    #[arg(long, default_value_t = false)]
    no_autostart: bool,
    /// Log filter when RUST_LOG is unset (e.g. "debug", "clipkeep_core=trace")
    #[arg(long)]
    log_level: Option<String>,
    /// Exit automatically after N milliseconds (for CI/testing)
    #[arg(long)]
    exit_after_ms: Option<u64>,
}

fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let settings_path = cli.config.clone().unwrap_or_else(config::settings_path);
    let store = SettingsStore::new(&settings_path);
    let mut settings = store.load().unwrap_or_else(|e| {
        warn!(error = %e, "using default settings");
        Default::default()
    });
    if let Some(capacity) = cli.capacity {
        settings.capacity = capacity;
    }
    if let Some(ms) = cli.poll_ms {
        settings.poll_interval_ms = ms;
    }

    if !cli.no_autostart {
        let applied = LaunchAtLogin::for_current_exe().and_then(|item| {
            apply_startup_policy(&config::launch_state_path(), settings.launch_at_login, &item)
        });
        match applied {
            Ok(enabled) => info!(enabled, "launch at login"),
            Err(e) => warn!(error = %e, "launch at login not applied"),
        }
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;

    let info_path = config::daemon_info_path();
    let result = rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", cli.port))
            .await
            .with_context(|| format!("binding 127.0.0.1:{}", cli.port))?;
        let port = listener.local_addr()?.port();

        let (tx, rx) = hotkey_channel();
        let platform = Platform {
            reader: ArboardReader::new(),
            hotkeys: Hotkeys::connect(!cli.no_hotkey, tx),
            hotkey_events: rx,
            surface: Box::new(HeadlessSurface),
            writer: Box::new(ArboardWriter::new()),
            paste: Box::new(CommandPaste::new()),
        };
        let app = App::new(&settings, platform).with_settings_store(store);
        let handle = app.handle();

        write_daemon_info(&info_path, port)?;
        info!(port, settings = %settings_path.display(), "clipkeepd listening on 127.0.0.1");

        tokio::spawn(server::serve(listener, handle.clone()));

        let on_signal = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                let _ = on_signal.shutdown();
            }
        });

        if let Some(ms) = cli.exit_after_ms {
            let on_timer = handle.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                let _ = on_timer.shutdown();
            });
        }

        app.run().await?;
        anyhow::Ok(())
    });

    if let Err(e) = std::fs::remove_file(&info_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %info_path.display(), error = %e, "could not remove daemon info");
        }
    }
    result
}

fn write_daemon_info(path: &Path, port: u16) -> Result<()> {
    let info = DaemonInfo {
        port,
        started_at: chrono::Utc::now().timestamp(),
        pid: std::process::id(),
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(&info)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
