mod common;

use clipkeep_core::config::SettingsStore;
use clipkeep_core::{ContentKind, Error, HotkeyBinding, Settings, Snapshot, SurfaceState};
use common::{app, app_with, settle, wait};
use tempfile::tempdir;

#[tokio::test(start_paused = true)]
async fn external_copies_show_up_in_history() {
    let (app, f) = app_with(&Settings::default(), |f| f.clipboard.set_text("already there"));
    let handle = app.handle();

    let driver = async {
        f.clipboard.set_text("hello");
        wait(600).await;
        f.clipboard.set_image(&[0x89, b'P', b'N', b'G']);
        wait(500).await;

        let list = handle.list(None).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].kind, ContentKind::Image);
        assert_eq!(list[1].text.as_deref(), Some("hello"));
        assert_eq!(handle.list(Some(1)).await.unwrap().len(), 1);

        let png = handle.image(list[0].id).await.unwrap();
        assert_eq!(png.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
        assert_eq!(handle.image(list[1].id).await.unwrap(), None);
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn activate_writes_hides_and_pastes_after_delay() {
    let (app, f) = app();
    let handle = app.handle();

    let driver = async {
        f.clipboard.set_text("a");
        wait(600).await;
        f.clipboard.set_text("b");
        wait(500).await;
        let list = handle.list(None).await.unwrap();
        let a = list[1].id;

        assert_eq!(handle.toggle().await.unwrap(), SurfaceState::Shown);
        assert!(handle.activate(a).await.unwrap());

        assert_eq!(f.clipboard.writes(), [Snapshot::text("a")]);
        assert_eq!(f.surface.calls(), ["show", "hide"]);
        let status = handle.status().await.unwrap();
        assert_eq!(status.surface, SurfaceState::Hidden);
        assert!(status.paste_pending);
        assert_eq!(f.paste.count(), 0);

        wait(150).await;
        assert_eq!(f.paste.count(), 0);
        wait(100).await;
        assert_eq!(f.paste.count(), 1);

        // The next poll sees our own write and moves "a" to the top.
        wait(400).await;
        let list = handle.list(None).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text.as_deref(), Some("a"));
        assert_ne!(list[0].id, a);
        assert_eq!(list[1].text.as_deref(), Some("b"));
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn activating_the_newest_entry_is_an_echo() {
    let (app, f) = app();
    let handle = app.handle();

    let driver = async {
        f.clipboard.set_text("top");
        wait(600).await;
        let id = handle.list(None).await.unwrap()[0].id;
        assert!(handle.activate(id).await.unwrap());
        wait(1000).await;

        let list = handle.list(None).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, id);
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn repeated_activation_pastes_once() {
    let (app, f) = app();
    let handle = app.handle();

    let driver = async {
        f.clipboard.set_text("x");
        wait(600).await;
        let id = handle.list(None).await.unwrap()[0].id;

        assert!(handle.activate(id).await.unwrap());
        wait(100).await;
        assert!(handle.activate(id).await.unwrap());
        wait(150).await;
        assert_eq!(f.paste.count(), 0);
        wait(100).await;
        assert_eq!(f.paste.count(), 1);
        wait(1000).await;
        assert_eq!(f.paste.count(), 1);
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unknown_ids_are_noops() {
    let (app, f) = app();
    let handle = app.handle();

    let driver = async {
        f.clipboard.set_text("gone");
        wait(600).await;
        let id = handle.list(None).await.unwrap()[0].id;
        assert!(handle.delete(id).await.unwrap());

        assert!(!handle.activate(id).await.unwrap());
        assert!(!handle.copy(id).await.unwrap());
        assert_eq!(handle.toggle_pin(id).await.unwrap(), None);
        assert!(!handle.delete(id).await.unwrap());
        wait(300).await;
        assert!(f.clipboard.writes().is_empty());
        assert_eq!(f.paste.count(), 0);
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn copy_writes_without_pasting() {
    let (app, f) = app();
    let handle = app.handle();

    let driver = async {
        f.clipboard.set_text("one");
        wait(600).await;
        let id = handle.list(None).await.unwrap()[0].id;
        assert_eq!(handle.toggle_pin(id).await.unwrap(), Some(true));
        assert_eq!(handle.toggle().await.unwrap(), SurfaceState::Shown);

        assert!(handle.copy(id).await.unwrap());
        wait(500).await;
        assert_eq!(f.clipboard.writes(), [Snapshot::text("one")]);
        assert_eq!(f.paste.count(), 0);
        assert_eq!(f.surface.calls(), ["show"]);
        assert!(handle.list(None).await.unwrap()[0].pinned);
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn hotkey_toggles_and_focus_loss_hides() {
    let (app, f) = app();
    let handle = app.handle();

    let driver = async {
        settle().await;
        f.hotkeys.press(HotkeyBinding::default());
        settle().await;
        assert_eq!(handle.status().await.unwrap().surface, SurfaceState::Shown);

        f.hotkeys.press(HotkeyBinding::default());
        settle().await;
        assert_eq!(handle.status().await.unwrap().surface, SurfaceState::Hidden);

        f.hotkeys.press(HotkeyBinding::default());
        settle().await;
        assert_eq!(handle.focus_lost().await.unwrap(), SurfaceState::Hidden);
        assert_eq!(handle.focus_lost().await.unwrap(), SurfaceState::Hidden);
        assert_eq!(f.surface.calls(), ["show", "hide", "show", "hide"]);
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rebind_switches_chords_and_persists() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("settings.toml"));
    let (app, f) = app();
    let app = app.with_settings_store(store.clone());
    let handle = app.handle();
    let old: HotkeyBinding = HotkeyBinding::default();
    let new: HotkeyBinding = "ctrl+alt+v".parse().unwrap();

    let driver = async {
        settle().await;
        let stale = f.hotkeys.active()[0].0;
        handle.rebind(new).await.unwrap();

        let active = f.hotkeys.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].1, new);

        f.hotkeys.press(old);
        f.hotkeys.fire(stale);
        settle().await;
        assert!(f.surface.calls().is_empty());

        f.hotkeys.press(new);
        settle().await;
        assert_eq!(f.surface.calls(), ["show"]);

        let status = handle.status().await.unwrap();
        assert!(status.registered);
        assert_eq!(status.binding, Some(new));
        assert_eq!(status.shortcut.as_deref(), Some("⌃ ⌥ V"));
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
    assert_eq!(store.load().unwrap().hotkey, new);
}

#[tokio::test(start_paused = true)]
async fn refused_rebind_reports_error_and_is_not_saved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    let taken: HotkeyBinding = "cmd+space".parse().unwrap();
    let (app, f) = app_with(&Settings::default(), |f| f.hotkeys.refuse(taken));
    let app = app.with_settings_store(SettingsStore::new(&path));
    let handle = app.handle();

    let driver = async {
        settle().await;
        let err = handle.rebind(taken).await.unwrap_err();
        assert!(matches!(err, Error::HotkeyRegistration { .. }));

        let status = handle.status().await.unwrap();
        assert!(!status.registered);
        assert_eq!(status.binding, Some(taken));
        assert!(f.hotkeys.active().is_empty());

        f.hotkeys.press(HotkeyBinding::default());
        settle().await;
        assert!(f.surface.calls().is_empty());
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
    assert!(!path.exists());
}

#[tokio::test(start_paused = true)]
async fn loop_keeps_running_without_a_shortcut() {
    let (app, f) = app_with(&Settings::default(), |f| {
        f.hotkeys.refuse(HotkeyBinding::default())
    });
    let handle = app.handle();

    let driver = async {
        f.clipboard.set_text("still recorded");
        wait(600).await;
        let status = handle.status().await.unwrap();
        assert!(!status.registered);
        assert!(status.polling);
        assert_eq!(status.entries, 1);
        assert_eq!(status.shortcut.as_deref(), Some("⌘ ⇧ V"));
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_the_hotkey_and_closes_the_handle() {
    let settings = Settings {
        capacity: 3,
        poll_interval_ms: 250,
        ..Settings::default()
    };
    let (app, f) = app_with(&settings, |_| {});
    let handle = app.handle();

    let driver = async {
        settle().await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.capacity, 3);
        assert_eq!(status.poll_interval_ms, 250);
        assert_eq!(f.hotkeys.active().len(), 1);
        handle.shutdown().unwrap();
    };

    let (res, ()) = tokio::join!(app.run(), driver);
    res.unwrap();
    assert!(f.hotkeys.active().is_empty());
    assert!(matches!(handle.list(None).await, Err(Error::LoopClosed)));
}
