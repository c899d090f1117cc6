//! Day/night custom stylesheet loading.
//!
//! The cache loads either the light or the dark stylesheet from the custom
//! stylesheet directory into the [ThemeEngine], keeps the other custom
//! stylesheets of the engine in place, and reloads when the files change or
//! the engine's custom stylesheets change under it.

use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::path::PathBuf;
use std::rc::Rc;

use smol::{LocalExecutor, Task};
use themex_services::filesystem::FileSystemWatcher;
use themex_services::io_helpers;
use themex_theme::{HandlerId, ThemeEngine, ThemeError, ThemeResult};

use crate::component::Component;
use crate::config::StylesheetConfig;
use crate::signal::NightSignal;
use crate::tasks::Debouncer;

/// Lifecycle of a [StylesheetCache].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing loaded.
    Unloaded,
    /// Enabled, waiting for the first successful load.
    Loading,
    /// A stylesheet is loaded.
    Loaded,
}

/// The stylesheet currently loaded by the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylesheetRecord {
    /// Path of the loaded stylesheet.
    pub path: Option<PathBuf>,
    /// Digest of its content when it was loaded.
    pub digest: Option<md5::Digest>,
}

/// Loads the day or night custom stylesheet into a [ThemeEngine].
#[derive(Clone)]
pub struct StylesheetCache {
    inner: Rc<CacheInner>,
}

struct CacheInner {
    engine: Rc<dyn ThemeEngine>,
    night: NightSignal,
    config: StylesheetConfig,
    executor: Rc<LocalExecutor<'static>>,
    debouncer: Debouncer,
    state: Cell<CacheState>,
    record: RefCell<StylesheetRecord>,
    enabled: Cell<bool>,
    epoch: Cell<u64>,
    pending_bubbling: Cell<Option<bool>>,
    watcher: RefCell<Option<Task<()>>>,
    refresh: RefCell<Option<Task<()>>>,
    handler: Cell<Option<HandlerId>>,
}

impl StylesheetCache {
    /// Create a disabled cache.
    pub fn new(
        engine: Rc<dyn ThemeEngine>,
        night: NightSignal,
        config: StylesheetConfig,
        executor: Rc<LocalExecutor<'static>>,
    ) -> Self {
        let debouncer = Debouncer::new(executor.clone(), config.debounce);
        Self {
            inner: Rc::new(CacheInner {
                engine,
                night,
                config,
                executor,
                debouncer,
                state: Cell::new(CacheState::Unloaded),
                record: RefCell::new(StylesheetRecord::default()),
                enabled: Cell::new(false),
                epoch: Cell::new(0),
                pending_bubbling: Cell::new(None),
                watcher: RefCell::new(None),
                refresh: RefCell::new(None),
                handler: Cell::new(None),
            }),
        }
    }

    /// Start watching the stylesheet directory and the engine, and load the
    /// stylesheet in the background.
    pub fn enable(&self) {
        let inner = &self.inner;
        if inner.enabled.replace(true) {
            return;
        }
        inner.state.set(CacheState::Loading);

        CacheInner::start_watcher(inner);

        let weak = Rc::downgrade(inner);
        let id = inner.engine.connect_stylesheets_changed(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                CacheInner::schedule(&inner, true);
            }
        }));
        inner.handler.set(Some(id));

        self.refresh();
    }

    /// Stop watching, unload the day and night stylesheets and forget the record.
    ///
    /// A reload that is pending or in progress is abandoned.
    pub fn disable(&self) {
        let inner = &self.inner;
        inner.enabled.set(false);
        inner.epoch.set(inner.epoch.get() + 1);
        inner.debouncer.cancel();
        inner.pending_bubbling.set(None);
        drop(inner.watcher.take());
        drop(inner.refresh.take());
        if let Some(id) = inner.handler.take() {
            inner.engine.disconnect(id);
        }

        let record = inner.record.take();
        inner.engine.unload_stylesheet(&inner.config.light_path());
        inner.engine.unload_stylesheet(&inner.config.dark_path());
        if let Some(path) = record.path {
            inner.engine.unload_stylesheet(&path);
        }
        if inner.state.replace(CacheState::Unloaded) != CacheState::Unloaded {
            log::debug!("Custom stylesheet unloaded");
        }
    }

    /// Load the stylesheet matching the night state now.
    ///
    /// Returns true if the engine's theme was replaced. Unless `bubbling`,
    /// an unchanged stylesheet is not reloaded. With `bubbling`, the reload
    /// is skipped if the stylesheet already comes first in the engine.
    pub async fn load(&self, bubbling: bool) -> ThemeResult<bool> {
        self.inner.load(bubbling).await
    }

    /// Load after the debounce delay, coalescing with other requests.
    pub fn schedule(&self, bubbling: bool) {
        CacheInner::schedule(&self.inner, bubbling);
    }

    /// Load in the background right away, if enabled.
    pub fn refresh(&self) {
        let inner = &self.inner;
        if !inner.enabled.get() {
            return;
        }
        let weak = Rc::downgrade(inner);
        let task = inner.executor.spawn(async move {
            if let Some(inner) = weak.upgrade() {
                report(inner.load(false).await);
            }
        });
        *inner.refresh.borrow_mut() = Some(task);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CacheState {
        self.inner.state.get()
    }

    /// The loaded stylesheet.
    pub fn record(&self) -> StylesheetRecord {
        self.inner.record.borrow().clone()
    }

    /// Returns true between [StylesheetCache::enable] and [StylesheetCache::disable].
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }
}

impl CacheInner {
    fn start_watcher(inner: &Rc<CacheInner>) {
        let directory = &inner.config.directory;
        let mut watcher = match FileSystemWatcher::new() {
            Ok(watcher) => watcher,
            Err(e) => {
                log::warn!("Cannot create stylesheet watcher: {}", e);
                return;
            },
        };
        // Only existing directories can be watched.
        if let Err(e) = std::fs::create_dir_all(directory) {
            log::warn!("Cannot create {:?}: {}", directory, e);
            return;
        }
        if let Err(e) = watcher.watch(directory) {
            log::warn!("Not watching {:?}: {}", directory, e);
            return;
        }

        let weak = Rc::downgrade(inner);
        let light = OsString::from(&inner.config.light);
        let dark = OsString::from(&inner.config.dark);
        let task = inner.executor.spawn(async move {
            while let Some(changes) = watcher.next_changes().await {
                if !changes
                    .iter()
                    .any(|change| change.concerns(&light) || change.concerns(&dark))
                {
                    continue;
                }
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                log::trace!("Custom stylesheet changed on disk");
                CacheInner::schedule(&inner, false);
            }
        });
        *inner.watcher.borrow_mut() = Some(task);
    }

    fn schedule(inner: &Rc<CacheInner>, bubbling: bool) {
        // A direct request wins over bubbling ones in the same burst.
        let merged = inner.pending_bubbling.get().map_or(bubbling, |pending| pending && bubbling);
        inner.pending_bubbling.set(Some(merged));

        let weak = Rc::downgrade(inner);
        inner.debouncer.schedule(move || async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let bubbling = inner.pending_bubbling.take().unwrap_or(false);
            if !inner.enabled.get() {
                log::debug!("Stylesheet cache disabled, dropping reload");
                return;
            }
            report(inner.load(bubbling).await);
        });
    }

    async fn load(&self, bubbling: bool) -> ThemeResult<bool> {
        let epoch = self.epoch.get();
        let Some(is_night) = self.night.is_night() else {
            log::debug!("Night state unknown, not loading custom stylesheet");
            return Ok(false);
        };

        let light = self.config.light_path();
        let dark = self.config.dark_path();
        let candidate = if is_night && io_helpers::is_file(&dark).await {
            dark.clone()
        } else if io_helpers::is_file(&light).await {
            light.clone()
        } else {
            return Err(ThemeError::not_found(if is_night { &dark } else { &light }));
        };

        let bytes = io_helpers::read_file(&candidate)
            .await
            .map_err(|e| ThemeError::load_error(&candidate, e))?;
        let digest = md5::compute(&bytes);

        if self.epoch.get() != epoch {
            log::debug!("Stylesheet cache disabled while loading {:?}", candidate);
            return Ok(false);
        }

        if bubbling {
            if self.engine.custom_stylesheets().first() == Some(&candidate) {
                log::trace!("{:?} already first, skipping reload", candidate);
                return Ok(false);
            }
        } else {
            let record = self.record.borrow();
            if record.path.as_ref() == Some(&candidate) && record.digest == Some(digest) {
                log::debug!("{:?} unchanged, skipping reload", candidate);
                return Ok(false);
            }
        }

        let previous = self.engine.current_or_base_theme();
        let replaced = self.record.borrow().path.clone();
        let mut theme = previous.derive();
        theme.load_stylesheet(&candidate)?;
        for sheet in previous.custom_stylesheets() {
            if *sheet == candidate || *sheet == light || *sheet == dark || Some(sheet) == replaced.as_ref() {
                continue;
            }
            if let Err(e) = theme.load_stylesheet(sheet) {
                log::warn!("Dropping custom stylesheet {:?}: {}", sheet, e);
            }
        }

        self.engine.set_theme(theme);
        *self.record.borrow_mut() = StylesheetRecord {
            path: Some(candidate.clone()),
            digest: Some(digest),
        };
        self.state.set(CacheState::Loaded);
        log::info!("Loaded custom stylesheet {:?}", candidate);
        Ok(true)
    }
}

fn report(result: ThemeResult<bool>) {
    match result {
        Ok(_) => {},
        Err(e) if e.is_not_found() => log::info!("No custom stylesheet: {}", e),
        Err(e) => log::warn!("Failed to load custom stylesheet: {}", e),
    }
}

impl Component for StylesheetCache {
    fn start(&self) -> anyhow::Result<()> {
        self.enable();
        Ok(())
    }

    fn stop(&self) {
        self.disable();
    }

    fn is_active(&self) -> bool {
        self.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::Timer;
    use std::path::Path;
    use std::time::Duration;
    use themex_theme::{ShellTheme, ThemeContext};

    struct Fixture {
        _dir: tempfile::TempDir,
        config: StylesheetConfig,
        engine: Rc<ThemeContext>,
        night: NightSignal,
        executor: Rc<LocalExecutor<'static>>,
        cache: StylesheetCache,
    }

    fn fixture_with(engine: ThemeContext) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StylesheetConfig::new(dir.path());
        config.debounce = Duration::from_millis(30);
        let engine = Rc::new(engine);
        let night = NightSignal::new();
        let executor = Rc::new(LocalExecutor::new());
        let cache = StylesheetCache::new(engine.clone(), night.clone(), config.clone(), executor.clone());
        Fixture {
            _dir: dir,
            config,
            engine,
            night,
            executor,
            cache,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ThemeContext::new("user", Some(PathBuf::from("/usr/share/gnome-shell/default.css"))))
    }

    fn write(path: &Path, css: &str) {
        std::fs::write(path, css).unwrap();
    }

    #[test]
    fn test_unchanged_stylesheet_loads_once() {
        let f = fixture();
        write(&f.config.light_path(), "stage { color: red; }");

        assert!(smol::block_on(f.cache.load(false)).unwrap());
        assert!(!smol::block_on(f.cache.load(false)).unwrap());
        assert_eq!(f.engine.replacements(), 1);
        assert_eq!(f.cache.record().path, Some(f.config.light_path()));
        assert_eq!(f.cache.state(), CacheState::Loaded);
    }

    #[test]
    fn test_content_change_reloads() {
        let f = fixture();
        write(&f.config.light_path(), "stage { color: red; }");
        assert!(smol::block_on(f.cache.load(false)).unwrap());

        write(&f.config.light_path(), "stage { color: blue; }");
        assert!(smol::block_on(f.cache.load(false)).unwrap());
        assert_eq!(f.engine.replacements(), 2);
    }

    #[test]
    fn test_bubbling_skips_when_candidate_is_first() {
        let dir = tempfile::tempdir().unwrap();
        let light = dir.path().join("gnome-shell.css");
        write(&light, "stage {}");
        let mut theme = ShellTheme::new(Some(PathBuf::from("/usr/share/gnome-shell/default.css")));
        theme.load_stylesheet(&light).unwrap();

        let f = fixture_with(ThemeContext::with_theme("user", theme));
        let mut config = f.config.clone();
        config.directory = dir.path().to_path_buf();
        let cache = StylesheetCache::new(f.engine.clone(), f.night.clone(), config, f.executor.clone());

        assert!(!smol::block_on(cache.load(true)).unwrap());
        assert_eq!(f.engine.replacements(), 0);
    }

    #[test]
    fn test_bubbling_reloads_after_engine_dropped_stylesheet() {
        let f = fixture();
        write(&f.config.light_path(), "stage {}");
        assert!(smol::block_on(f.cache.load(false)).unwrap());

        f.engine.unload_stylesheet(&f.config.light_path());
        assert!(smol::block_on(f.cache.load(true)).unwrap());
        assert_eq!(f.engine.custom_stylesheets(), vec![f.config.light_path()]);
    }

    #[test]
    fn test_night_prefers_dark_and_falls_back_to_light() {
        let f = fixture();
        f.night.set_enabled(true);
        f.night.set_light_active(true);
        write(&f.config.light_path(), "stage {}");

        assert!(smol::block_on(f.cache.load(false)).unwrap());
        assert_eq!(f.engine.custom_stylesheets(), vec![f.config.light_path()]);

        write(&f.config.dark_path(), "stage { background: black; }");
        assert!(smol::block_on(f.cache.load(false)).unwrap());
        assert_eq!(f.engine.custom_stylesheets(), vec![f.config.dark_path()]);
    }

    #[test]
    fn test_unknown_night_state_loads_nothing() {
        let f = fixture();
        f.night.set_enabled(true);
        write(&f.config.light_path(), "stage {}");

        assert!(!smol::block_on(f.cache.load(false)).unwrap());
        assert_eq!(f.engine.replacements(), 0);
    }

    #[test]
    fn test_missing_stylesheet_is_not_found() {
        let f = fixture();
        let err = smol::block_on(f.cache.load(false)).unwrap_err();
        assert!(err.is_not_found());
        assert!(f.engine.current_theme().is_none());
        assert_eq!(f.cache.record(), StylesheetRecord::default());
    }

    #[test]
    fn test_first_load_keeps_session_default_stylesheet() {
        let f = fixture();
        write(&f.config.light_path(), "stage {}");

        assert!(smol::block_on(f.cache.load(false)).unwrap());
        let theme = f.engine.current_theme().unwrap();
        assert_eq!(
            theme.default_stylesheet(),
            Some(Path::new("/usr/share/gnome-shell/default.css"))
        );
        assert_eq!(theme.custom_stylesheets(), &[f.config.light_path()]);
    }

    #[test]
    fn test_unrelated_stylesheets_are_kept() {
        let f = fixture();
        let other = f.config.directory.join("extension.css");
        write(&other, "#panel {}");
        f.engine.load_stylesheet(&other).unwrap();
        write(&f.config.light_path(), "stage {}");

        assert!(smol::block_on(f.cache.load(false)).unwrap());
        assert_eq!(f.engine.custom_stylesheets(), vec![f.config.light_path(), other]);
    }

    #[test]
    fn test_disable_unloads_and_forgets() {
        let f = fixture();
        write(&f.config.light_path(), "stage {}");
        smol::block_on(f.cache.load(false)).unwrap();

        f.cache.disable();
        assert!(f.engine.custom_stylesheets().is_empty());
        assert_eq!(f.cache.record(), StylesheetRecord::default());
        assert_eq!(f.cache.state(), CacheState::Unloaded);

        // Unloading again is harmless.
        f.cache.disable();
    }

    #[test]
    fn test_burst_of_requests_reloads_once() {
        let f = fixture();
        write(&f.config.light_path(), "stage {}");

        smol::block_on(f.executor.run(async {
            f.cache.enable();
            Timer::after(Duration::from_millis(150)).await;
            assert_eq!(f.engine.replacements(), 1);

            write(&f.config.light_path(), "stage { color: red; }");
            for _ in 0..3 {
                f.cache.schedule(false);
            }
            Timer::after(Duration::from_millis(250)).await;
        }));

        assert_eq!(f.engine.replacements(), 2);
        f.cache.disable();
    }

    #[test]
    fn test_disable_drops_pending_reload() {
        let f = fixture();
        write(&f.config.light_path(), "stage {}");

        smol::block_on(f.executor.run(async {
            f.cache.enable();
            Timer::after(Duration::from_millis(150)).await;

            write(&f.config.light_path(), "stage { color: red; }");
            f.cache.schedule(false);
            f.cache.disable();
            Timer::after(Duration::from_millis(150)).await;
        }));

        assert_eq!(f.engine.replacements(), 1);
        assert_eq!(f.cache.record(), StylesheetRecord::default());
        assert!(!f.cache.is_enabled());
    }

    #[test]
    fn test_missing_directory_is_created_and_watched() {
        let f = fixture();
        let mut config = f.config.clone();
        config.directory = f.config.directory.join("themex");
        let cache = StylesheetCache::new(f.engine.clone(), f.night.clone(), config.clone(), f.executor.clone());

        smol::block_on(f.executor.run(async {
            cache.enable();
            Timer::after(Duration::from_millis(100)).await;
            assert!(config.directory.is_dir());
            assert_eq!(f.engine.replacements(), 0);

            write(&config.light_path(), "stage {}");
            Timer::after(Duration::from_millis(300)).await;
        }));

        assert_eq!(f.engine.replacements(), 1);
        assert_eq!(cache.record().path, Some(config.light_path()));
        cache.disable();
    }
}
