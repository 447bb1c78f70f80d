#![allow(dead_code)]
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated config/state directories so tests never see a real daemon.
pub struct TestEnv {
    _dir: TempDir,
    pub cfg: PathBuf,
    pub state: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("config");
        let state = dir.path().join("state");
        std::fs::create_dir_all(&cfg).expect("cfg dir");
        Self {
            _dir: dir,
            cfg,
            state,
        }
    }

    pub fn bin(&self) -> Command {
        let mut cmd = Command::cargo_bin("clipkeep").unwrap();
        cmd.env("XDG_CONFIG_HOME", &self.cfg);
        cmd.env("XDG_STATE_HOME", &self.state);
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn settings_path(&self) -> PathBuf {
        self.cfg.join("clipkeep").join("settings.toml")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
