// SPDX-License-Identifier: LGPL-3.0-only
//! TOML-backed [KeyStore] for the themex preferences.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use smol::{fs, LocalExecutor, Task, Timer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use xdg::BaseDirectories;

use crate::filesystem::FileSystemWatcher;
use crate::keystore::{Callback, KeyStore, MemoryStore, Owner, StoreResult, Value, ValueKind};

const PREFIX: &str = "themex";
const FILENAME: &str = "settings.toml";

/// The on-disk form: a flat table of strings and booleans.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
struct SettingsFile {
    values: BTreeMap<String, toml::Value>,
}

/// Keeps a [SettingsStore] following edits of its file. Dropping it stops watching.
pub struct WatchHandle {
    _task: Task<()>,
}

/// A [KeyStore] persisted as a TOML file.
///
/// Every effective write is saved back to the user file. Keys missing from
/// the files keep the default given in the schema.
pub struct SettingsStore {
    cache: MemoryStore,
    path: PathBuf,
}

impl SettingsStore {
    /// Load the settings from the standard locations.
    ///
    /// Order (later overrides earlier):
    /// 1. System Data: /usr/share/themex/settings.toml (and XDG_DATA_DIRS)
    /// 2. System Config: /etc/xdg/themex/settings.toml (and XDG_CONFIG_DIRS)
    /// 3. User Config: ~/.config/themex/settings.toml (XDG_CONFIG_HOME)
    ///
    /// Writes go to the user file.
    pub async fn load<'a>(
        name: impl Into<String>,
        schema: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<Self> {
        let xdg_dirs = BaseDirectories::with_prefix(PREFIX)?;
        let user_path = xdg_dirs.get_config_home().join(FILENAME);
        let store = Self {
            cache: MemoryStore::new(name, schema),
            path: user_path.clone(),
        };

        // 1. Load from system data directories
        for path in xdg_dirs.find_data_files(FILENAME).rev() {
            store.merge_file(&path).await;
        }

        // 2. Load from system config directories
        for path in xdg_dirs.find_config_files(FILENAME).rev() {
            if path != user_path {
                store.merge_file(&path).await;
            }
        }

        // 3. Load from user config directory
        if user_path.exists() {
            store.merge_file(&user_path).await;
        }

        Ok(store)
    }

    /// Load the settings from a single file, which need not exist yet.
    pub async fn with_path<'a>(
        name: impl Into<String>,
        schema: impl IntoIterator<Item = (&'a str, Value)>,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let store = Self {
            cache: MemoryStore::new(name, schema),
            path: path.into(),
        };
        if store.path.exists() {
            let values = read_file(&store.path).await?;
            store.apply(&store.path, values, false);
        }
        Ok(store)
    }

    /// Re-read the user file, notifying listeners of every key that changed.
    pub async fn reload(&self) -> Result<()> {
        let values = read_file(&self.path).await?;
        self.apply(&self.path, values, true);
        Ok(())
    }

    /// Reload whenever the user file is edited by someone else.
    ///
    /// Bursts of file events are collapsed by waiting `delay` before reading.
    /// The store's own saves cause no notification, since only keys whose
    /// value changed are reported.
    pub fn watch(this: &Rc<Self>, executor: &LocalExecutor<'static>, delay: Duration) -> Result<WatchHandle> {
        let directory = this
            .path
            .parent()
            .with_context(|| format!("{:?} has no parent directory", this.path))?;
        let file_name = this
            .path
            .file_name()
            .with_context(|| format!("{:?} has no file name", this.path))?
            .to_os_string();
        std::fs::create_dir_all(directory)?;

        let mut watcher = FileSystemWatcher::new()?;
        watcher.watch(directory)?;

        let store = Rc::downgrade(this);
        let task = executor.spawn(async move {
            while let Some(changes) = watcher.next_changes().await {
                if !changes.iter().any(|change| change.concerns(&file_name)) {
                    continue;
                }
                Timer::after(delay).await;
                watcher.poll_events();

                let Some(store) = store.upgrade() else {
                    break;
                };
                if let Err(e) = store.reload().await {
                    log::warn!("Cannot reload {:?}: {:#}", store.path, e);
                }
            }
        });
        Ok(WatchHandle { _task: task })
    }

    /// The file writes are saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn merge_file(&self, path: &Path) {
        log::info!("Loading settings from: {:?}", path);
        match read_file(path).await {
            Ok(values) => self.apply(path, values, false),
            Err(e) => log::warn!("{:#}", e),
        }
    }

    fn apply(&self, path: &Path, file: SettingsFile, notify: bool) {
        for (key, raw) in file.values {
            let Some(kind) = self.cache.kind_of(&key) else {
                log::warn!("Ignoring unknown setting '{}' in {:?}", key, path);
                continue;
            };
            let value = match (kind, raw) {
                (ValueKind::String, toml::Value::String(s)) => Value::String(s),
                (ValueKind::Bool, toml::Value::Boolean(b)) => Value::Bool(b),
                (kind, raw) => {
                    log::warn!(
                        "Ignoring setting '{}' in {:?}: expected {:?}, found {}",
                        key,
                        path,
                        kind,
                        raw.type_str()
                    );
                    continue;
                },
            };
            match self.cache.replace(&key, value) {
                Ok(true) if notify => self.cache.notify(&key),
                Ok(_) => {},
                Err(e) => log::warn!("{}", e),
            }
        }
    }

    fn save(&self) -> std::io::Result<()> {
        let file = SettingsFile {
            values: self
                .cache
                .snapshot()
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => toml::Value::String(s),
                        Value::Bool(b) => toml::Value::Boolean(b),
                    };
                    (key, value)
                })
                .collect(),
        };
        let content = toml::to_string(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)
    }
}

impl KeyStore for SettingsStore {
    fn name(&self) -> &str {
        self.cache.name()
    }

    fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.cache.kind_of(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<bool> {
        if !self.cache.replace(key, value)? {
            log::trace!("{}: '{}' unchanged, not saving", self.name(), key);
            return Ok(false);
        }
        if let Err(e) = self.save() {
            log::warn!("Failed to save settings to {:?}: {}", self.path, e);
        }
        self.cache.notify(key);
        Ok(true)
    }

    fn connect(&self, key: &str, owner: Owner, callback: Callback) -> StoreResult<()> {
        self.cache.connect(key, owner, callback)
    }

    fn detach_all(&self, owner: Owner) {
        self.cache.detach_all(owner);
    }
}

async fn read_file(path: &Path) -> Result<SettingsFile> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read settings file {:?}: {}", path, e))?;
    toml::from_str(&content).map_err(|e| anyhow::anyhow!("Failed to parse settings file {:?}: {}", path, e))
}
