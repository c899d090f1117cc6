use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use smol::{LocalExecutor, Task};
use themex_services::{callback, KeyStore, Owner, StoreResult, ThemeLocator};
use themex_theme::ThemeEngine;

use crate::component::Component;

/// Loads the shell theme named in the system store into the [ThemeEngine].
///
/// Names resolve to stylesheets through a [ThemeLocator]; an empty or unknown
/// name means the default stylesheet.
#[derive(Clone)]
pub struct ShellLoader {
    inner: Rc<ShellInner>,
}

struct ShellInner {
    remote: Rc<dyn KeyStore>,
    key: String,
    locator: Rc<dyn ThemeLocator>,
    engine: Rc<dyn ThemeEngine>,
    executor: Rc<LocalExecutor<'static>>,
    owner: Owner,
    active: Cell<bool>,
    pending: RefCell<Option<Task<()>>>,
}

impl ShellLoader {
    /// Create a stopped loader following `key` of `remote`.
    pub fn new(
        remote: Rc<dyn KeyStore>,
        key: impl Into<String>,
        locator: Rc<dyn ThemeLocator>,
        engine: Rc<dyn ThemeEngine>,
        executor: Rc<LocalExecutor<'static>>,
    ) -> Self {
        Self {
            inner: Rc::new(ShellInner {
                remote,
                key: key.into(),
                locator,
                engine,
                executor,
                owner: Owner::new(),
                active: Cell::new(false),
                pending: RefCell::new(None),
            }),
        }
    }

    /// Follow the shell theme key and load the current theme.
    pub fn start(&self) -> StoreResult<()> {
        let inner = &self.inner;
        if inner.active.get() {
            return Ok(());
        }

        let weak = Rc::downgrade(inner);
        inner.remote.connect(
            &inner.key,
            inner.owner,
            callback(move |_| {
                if let Some(inner) = weak.upgrade() {
                    ShellInner::refresh(&inner);
                }
                Ok(())
            }),
        )?;
        inner.active.set(true);
        ShellInner::refresh(inner);
        Ok(())
    }

    /// Stop following the key and go back to the default stylesheet.
    pub fn stop(&self) {
        let inner = &self.inner;
        inner.remote.detach_all(inner.owner);
        drop(inner.pending.take());
        if !inner.active.replace(false) {
            return;
        }

        if inner.engine.theme_stylesheet().is_some() {
            inner.engine.set_theme_stylesheet(None);
            if let Err(e) = inner.engine.load_theme() {
                log::warn!("Failed to restore default shell theme: {}", e);
            }
        }
    }

    /// Returns true while the loader follows the key.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }
}

impl ShellInner {
    fn refresh(inner: &Rc<ShellInner>) {
        let name = inner.remote.get_string(&inner.key);
        let locator = inner.locator.clone();
        let weak = Rc::downgrade(inner);
        let task = inner.executor.spawn(async move {
            let path = locator.shell_theme_path(&name).await;
            if let Some(inner) = weak.upgrade() {
                inner.apply(&name, path);
            }
        });
        *inner.pending.borrow_mut() = Some(task);
    }

    fn apply(&self, name: &str, path: Option<PathBuf>) {
        if !self.active.get() {
            return;
        }
        if self.engine.theme_stylesheet() == path {
            log::debug!("Shell theme {:?} already loaded", name);
            return;
        }

        self.engine.set_theme_stylesheet(path);
        match self.engine.load_theme() {
            Ok(()) => log::info!("Loaded shell theme {:?}", name),
            Err(e) => log::warn!("Failed to load shell theme {:?}: {}", name, e),
        }
    }
}

impl Component for ShellLoader {
    fn start(&self) -> anyhow::Result<()> {
        Ok(ShellLoader::start(self)?)
    }

    fn stop(&self) {
        ShellLoader::stop(self);
    }

    fn is_active(&self) -> bool {
        ShellLoader::is_active(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use smol::Timer;
    use std::collections::HashMap;
    use std::time::Duration;
    use themex_services::{AvailableThemes, MemoryStore, Value};
    use themex_theme::ThemeContext;

    struct StubLocator(HashMap<String, PathBuf>);

    #[async_trait(?Send)]
    impl ThemeLocator for StubLocator {
        async fn available_themes(&self) -> AvailableThemes {
            AvailableThemes::default()
        }

        async fn shell_theme_path(&self, name: &str) -> Option<PathBuf> {
            self.0.get(name).cloned()
        }
    }

    struct Fixture {
        remote: Rc<MemoryStore>,
        engine: Rc<ThemeContext>,
        executor: Rc<LocalExecutor<'static>>,
        loader: ShellLoader,
    }

    fn fixture(name: &str) -> Fixture {
        let remote = Rc::new(MemoryStore::new("system", [("name", Value::from(name))]));
        let engine = Rc::new(ThemeContext::new("user", Some(PathBuf::from("/usr/share/gnome-shell/default.css"))));
        let locator = StubLocator(HashMap::from([
            ("Foo".to_string(), PathBuf::from("/themes/Foo/gnome-shell/gnome-shell.css")),
            ("Bar".to_string(), PathBuf::from("/themes/Bar/gnome-shell/gnome-shell.css")),
        ]));
        let executor = Rc::new(LocalExecutor::new());
        let loader = ShellLoader::new(
            remote.clone(),
            "name",
            Rc::new(locator),
            engine.clone(),
            executor.clone(),
        );
        Fixture {
            remote,
            engine,
            executor,
            loader,
        }
    }

    fn settle(f: &Fixture, work: impl FnOnce()) {
        smol::block_on(f.executor.run(async {
            work();
            Timer::after(Duration::from_millis(20)).await;
        }));
    }

    #[test]
    fn test_follows_shell_theme_name() {
        let f = fixture("Foo");
        settle(&f, || f.loader.start().unwrap());
        assert_eq!(
            f.engine.theme_stylesheet(),
            Some(PathBuf::from("/themes/Foo/gnome-shell/gnome-shell.css"))
        );

        settle(&f, || {
            f.remote.set_string("name", "Bar").unwrap();
        });
        assert_eq!(
            f.engine.theme_stylesheet(),
            Some(PathBuf::from("/themes/Bar/gnome-shell/gnome-shell.css"))
        );
        assert_eq!(f.engine.replacements(), 2);
    }

    #[test]
    fn test_unknown_name_keeps_default_without_reload() {
        let f = fixture("Missing");
        settle(&f, || f.loader.start().unwrap());
        assert_eq!(f.engine.theme_stylesheet(), None);
        assert_eq!(f.engine.replacements(), 0);
    }

    #[test]
    fn test_stop_restores_default() {
        let f = fixture("Foo");
        settle(&f, || f.loader.start().unwrap());
        f.loader.stop();

        assert!(!f.loader.is_active());
        assert_eq!(f.engine.theme_stylesheet(), None);
        assert_eq!(f.remote.listener_count(), 0);

        settle(&f, || {
            f.remote.set_string("name", "Bar").unwrap();
        });
        assert_eq!(f.engine.theme_stylesheet(), None);
    }
}
