// SPDX-License-Identifier: LGPL-3.0-only
//! [KeyStore] backed by the desktop's GSettings database, driven through the
//! `gsettings` command line tool.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::process::{Command, Stdio};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smol::io::{AsyncBufReadExt, BufReader};
use smol::stream::StreamExt;
use smol::{LocalExecutor, Task};

use super::memory::MemoryStore;
use super::{gvariant, Callback, KeyStore, Owner, StoreError, StoreResult, Value, ValueKind};

const GSETTINGS: &str = "gsettings";

/// Writes per key still expected back from the monitor.
const MAX_ECHOES: usize = 8;

/// Keys of one GSettings schema.
pub type SchemaKeys<'a> = (&'a str, &'a [(&'a str, ValueKind)]);

/// Keeps the `gsettings monitor` processes of a [GSettingsStore] alive.
///
/// Dropping the handle kills the processes.
pub struct MonitorHandle {
    _tasks: Vec<Task<()>>,
}

/// A [KeyStore] over one or more GSettings schemas.
///
/// Values are cached in memory. Writes go through `gsettings set`; changes
/// made by other processes arrive through [GSettingsStore::monitor].
pub struct GSettingsStore {
    cache: MemoryStore,
    schemas: IndexMap<String, String>,
    program: String,
    echoes: RefCell<HashMap<String, VecDeque<Value>>>,
}

impl GSettingsStore {
    /// Open the store, reading the current value of every key.
    ///
    /// Keys that cannot be read start out with their zero value.
    pub fn open(name: impl Into<String>, layout: &[SchemaKeys<'_>]) -> StoreResult<Self> {
        Self::open_with_program(name, layout, GSETTINGS)
    }

    /// Like [GSettingsStore::open], running `program` instead of `gsettings`.
    pub fn open_with_program(
        name: impl Into<String>,
        layout: &[SchemaKeys<'_>],
        program: impl Into<String>,
    ) -> StoreResult<Self> {
        let name = name.into();
        let program = program.into();
        let mut schemas = IndexMap::new();
        let mut initial = Vec::new();

        for (schema, keys) in layout {
            for (key, kind) in keys.iter() {
                let value = match read_key(&program, schema, key, *kind) {
                    Ok(value) => value,
                    Err(StoreError::Io(e)) => {
                        return Err(StoreError::backend(&name, format!("cannot run {}: {}", program, e)));
                    },
                    Err(e) => {
                        log::warn!("{}: cannot read {} {}: {}", name, schema, key, e);
                        Value::zero(*kind)
                    },
                };
                schemas.insert(key.to_string(), schema.to_string());
                initial.push((key.to_string(), value));
            }
        }

        let cache = MemoryStore::new(
            name,
            initial.iter().map(|(key, value)| (key.as_str(), value.clone())),
        );
        Ok(Self {
            cache,
            schemas,
            program,
            echoes: RefCell::new(HashMap::new()),
        })
    }

    /// Follow changes made by other processes.
    ///
    /// Spawns one `gsettings monitor` per schema on `executor`. Listeners are
    /// notified on the executor's thread for every key whose value changed.
    pub fn monitor(this: &Rc<Self>, executor: &LocalExecutor<'static>) -> StoreResult<MonitorHandle> {
        let mut distinct: Vec<&str> = Vec::new();
        for schema in this.schemas.values() {
            if !distinct.contains(&schema.as_str()) {
                distinct.push(schema);
            }
        }

        let mut tasks = Vec::new();
        for schema in distinct {
            let mut child = smol::process::Command::new(&this.program)
                .arg("monitor")
                .arg(schema)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()?;
            let Some(stdout) = child.stdout.take() else {
                return Err(StoreError::backend(this.name(), "monitor has no stdout"));
            };

            let store: Weak<Self> = Rc::downgrade(this);
            let schema = schema.to_string();
            tasks.push(executor.spawn(async move {
                // Owned by the task so the process dies with it.
                let _child = child;
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next().await {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            log::error!("gsettings monitor for {} failed: {}", schema, e);
                            break;
                        },
                    };
                    let Some(store) = store.upgrade() else {
                        break;
                    };
                    store.apply_monitor_line(&line);
                }
                log::debug!("gsettings monitor for {} stopped", schema);
            }));
        }

        Ok(MonitorHandle { _tasks: tasks })
    }

    /// The schema a key belongs to.
    pub fn schema_of(&self, key: &str) -> Option<&str> {
        self.schemas.get(key).map(String::as_str)
    }

    fn apply_monitor_line(&self, line: &str) {
        let Some((key, text)) = split_monitor_line(line) else {
            log::trace!("{}: ignoring monitor output {:?}", self.name(), line);
            return;
        };
        let Some(kind) = self.cache.kind_of(key) else {
            return;
        };
        match gvariant::parse(key, kind, text) {
            Ok(value) => {
                if self.take_echo(key, &value) {
                    log::trace!("{}: '{}' echoed our own write", self.name(), key);
                    return;
                }
                if let Ok(true) = self.cache.replace(key, value) {
                    log::debug!("{}: '{}' changed externally", self.name(), key);
                    self.cache.notify(key);
                }
            },
            Err(e) => log::warn!("{}: {}", self.name(), e),
        }
    }

    /// Consume the pending write matching `value`, along with older writes
    /// the monitor skipped over.
    fn take_echo(&self, key: &str, value: &Value) -> bool {
        let mut echoes = self.echoes.borrow_mut();
        let Some(pending) = echoes.get_mut(key) else {
            return false;
        };
        match pending.iter().position(|written| written == value) {
            Some(index) => {
                pending.drain(..=index);
                true
            },
            None => false,
        }
    }

    fn expect_echo(&self, key: &str, value: Value) {
        let mut echoes = self.echoes.borrow_mut();
        let pending = echoes.entry(key.to_string()).or_default();
        if pending.len() == MAX_ECHOES {
            pending.pop_front();
        }
        pending.push_back(value);
    }
}

impl KeyStore for GSettingsStore {
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
        let schema = self
            .schemas
            .get(key)
            .ok_or_else(|| StoreError::unknown_key(self.name(), key))?;
        if self.cache.get(key).as_ref() == Some(&value) {
            log::trace!("{}: '{}' unchanged, not writing", self.name(), key);
            return Ok(false);
        }
        if let Some(kind) = self.cache.kind_of(key) {
            if kind != value.kind() {
                return Err(StoreError::TypeMismatch {
                    key: key.to_string(),
                    expected: kind,
                    found: value.kind(),
                });
            }
        }

        let text = gvariant::format(&value);
        let status = Command::new(&self.program)
            .args(["set", schema.as_str(), key, text.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(StoreError::backend(
                self.name(),
                format!("gsettings set {} {} exited with {}", schema, key, status),
            ));
        }

        self.expect_echo(key, value.clone());
        self.cache.set(key, value)
    }

    fn connect(&self, key: &str, owner: Owner, callback: Callback) -> StoreResult<()> {
        self.cache.connect(key, owner, callback)
    }

    fn detach_all(&self, owner: Owner) {
        self.cache.detach_all(owner);
    }
}

fn read_key(program: &str, schema: &str, key: &str, kind: ValueKind) -> StoreResult<Value> {
    let output = Command::new(program)
        .args(["get", schema, key])
        .stdin(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(StoreError::backend(
            schema,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    gvariant::parse(key, kind, &String::from_utf8_lossy(&output.stdout))
}

/// Split a `gsettings monitor` line of the form `key: value`.
fn split_monitor_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(": ")?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::callback;

    #[test]
    fn test_split_monitor_line() {
        assert_eq!(
            split_monitor_line("gtk-theme: 'Adwaita-dark'"),
            Some(("gtk-theme", "'Adwaita-dark'"))
        );
        assert_eq!(
            split_monitor_line("picture-uri: 'file:///a: b.png'"),
            Some(("picture-uri", "'file:///a: b.png'"))
        );
        assert_eq!(split_monitor_line("garbage"), None);
        assert_eq!(split_monitor_line("two words: 'x'"), None);
    }

    #[test]
    fn test_missing_program_is_a_backend_error() {
        let layout: &[SchemaKeys] = &[("org.gnome.desktop.interface", &[("gtk-theme", ValueKind::String)])];
        let result = GSettingsStore::open_with_program("system", layout, "/nonexistent/themex/gsettings");
        assert!(matches!(result, Err(StoreError::Backend { .. })));
    }

    fn recording_store() -> (GSettingsStore, Rc<RefCell<Vec<String>>>) {
        let store = GSettingsStore {
            cache: MemoryStore::new("system", [("gtk-theme", Value::from("Adwaita"))]),
            schemas: IndexMap::from([("gtk-theme".to_string(), "org.gnome.desktop.interface".to_string())]),
            program: "true".to_string(),
            echoes: RefCell::new(HashMap::new()),
        };
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        store
            .connect(
                "gtk-theme",
                Owner::new(),
                callback(move |key| {
                    log.borrow_mut().push(key.to_string());
                    Ok(())
                }),
            )
            .unwrap();
        (store, seen)
    }

    #[test]
    fn test_own_writes_echoed_by_monitor_are_not_external() {
        let (store, seen) = recording_store();
        assert!(store.set("gtk-theme", Value::from("Yaru")).unwrap());
        assert!(store.set("gtk-theme", Value::from("Arc")).unwrap());
        assert_eq!(seen.borrow().len(), 2);
        seen.borrow_mut().clear();

        // The monitor reports both writes after the second one landed.
        store.apply_monitor_line("gtk-theme: 'Yaru'");
        store.apply_monitor_line("gtk-theme: 'Arc'");
        assert!(seen.borrow().is_empty());
        assert_eq!(store.get_string("gtk-theme"), "Arc");

        store.apply_monitor_line("gtk-theme: 'Adwaita-dark'");
        assert_eq!(*seen.borrow(), vec!["gtk-theme".to_string()]);
        assert_eq!(store.get_string("gtk-theme"), "Adwaita-dark");
    }

    #[test]
    fn test_skipped_echo_is_dropped_with_later_one() {
        let (store, seen) = recording_store();
        store.set("gtk-theme", Value::from("Yaru")).unwrap();
        store.set("gtk-theme", Value::from("Arc")).unwrap();
        seen.borrow_mut().clear();

        // Coalesced by dconf: only the last write comes back.
        store.apply_monitor_line("gtk-theme: 'Arc'");
        store.apply_monitor_line("gtk-theme: 'Yaru'");
        assert_eq!(*seen.borrow(), vec!["gtk-theme".to_string()]);
        assert_eq!(store.get_string("gtk-theme"), "Yaru");
    }
}
