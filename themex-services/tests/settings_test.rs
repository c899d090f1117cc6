use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use smol::{LocalExecutor, Timer};
use themex_services::{callback, KeyStore, Owner, SettingsStore, Value};

fn schema() -> Vec<(&'static str, Value)> {
    vec![
        ("gtk", Value::from("Adwaita")),
        ("gtk-night", Value::from("Adwaita-dark")),
        ("night", Value::from(true)),
    ]
}

#[tokio::test]
async fn test_settings_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");

    let store = SettingsStore::with_path("settings", schema(), &path).await.unwrap();
    assert_eq!(store.path(), path.as_path());
    assert_eq!(store.get_string("gtk"), "Adwaita");
    assert!(store.get_bool("night"));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_settings_load_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "gtk = \"Yaru\"\nnight = false\n").unwrap();

    let store = SettingsStore::with_path("settings", schema(), &path).await.unwrap();
    assert_eq!(store.get_string("gtk"), "Yaru");
    assert_eq!(store.get_string("gtk-night"), "Adwaita-dark");
    assert!(!store.get_bool("night"));
}

#[tokio::test]
async fn test_settings_set_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("themex").join("settings.toml");

    let store = SettingsStore::with_path("settings", schema(), &path).await.unwrap();
    assert!(store.set_string("gtk-night", "Yaru-dark").unwrap());

    let reopened = SettingsStore::with_path("settings", schema(), &path).await.unwrap();
    assert_eq!(reopened.get_string("gtk-night"), "Yaru-dark");
}

#[tokio::test]
async fn test_settings_reload_notifies_changed_keys_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "gtk = \"Adwaita\"\n").unwrap();

    let store = SettingsStore::with_path("settings", schema(), &path).await.unwrap();
    let changed = Rc::new(RefCell::new(Vec::new()));
    let owner = Owner::new();
    for key in ["gtk", "gtk-night", "night"] {
        let changed = changed.clone();
        store
            .connect(
                key,
                owner,
                callback(move |key| {
                    changed.borrow_mut().push(key.to_string());
                    Ok(())
                }),
            )
            .unwrap();
    }

    fs::write(&path, "gtk = \"Adwaita\"\ngtk-night = \"Yaru-dark\"\nnight = true\n").unwrap();
    store.reload().await.unwrap();

    assert_eq!(*changed.borrow(), vec!["gtk-night".to_string()]);
}

#[tokio::test]
async fn test_settings_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "gtk = ").unwrap();

    assert!(SettingsStore::with_path("settings", schema(), &path).await.is_err());
}

#[test]
fn test_settings_follow_external_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("themex").join("settings.toml");
    let store = Rc::new(smol::block_on(SettingsStore::with_path("settings", schema(), &path)).unwrap());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let reader = Rc::downgrade(&store);
    store
        .connect(
            "gtk",
            Owner::new(),
            callback(move |key| {
                if let Some(store) = reader.upgrade() {
                    log.borrow_mut().push(store.get_string(key));
                }
                Ok(())
            }),
        )
        .unwrap();

    let executor = LocalExecutor::new();
    smol::block_on(executor.run(async {
        let _handle = SettingsStore::watch(&store, &executor, Duration::from_millis(30)).unwrap();
        Timer::after(Duration::from_millis(50)).await;

        fs::write(&path, "gtk = \"Yaru\"\n").unwrap();
        Timer::after(Duration::from_millis(300)).await;

        // The store's own save is read back without reporting "gtk" again.
        assert!(store.set_string("gtk-night", "Yaru-dark").unwrap());
        Timer::after(Duration::from_millis(200)).await;
    }));

    assert_eq!(*seen.borrow(), vec!["Yaru".to_string()]);
    assert_eq!(store.get_string("gtk"), "Yaru");
    assert_eq!(store.get_string("gtk-night"), "Yaru-dark");
}
