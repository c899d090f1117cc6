// SPDX-License-Identifier: LGPL-3.0-only
//! Wiring of the synchronizer.
//!
//! The [Orchestrator] owns every component, binds them to the toggles of the
//! extension store and routes night flips to the components that depend on
//! them: the [SyncEngine] resynchronizes first, then the [StylesheetCache]
//! reloads.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smol::{LocalExecutor, Task};
use themex_services::{callback, KeyStore, Owner, ThemeLocator, ValueKind, WallpaperPair, WallpaperWriter};
use themex_theme::ThemeEngine;

use crate::component::Component;
use crate::config::ThemexConfig;
use crate::keys::{extension, system};
use crate::shell::ShellLoader;
use crate::signal::NightSignal;
use crate::stylesheet::StylesheetCache;
use crate::sync::{SyncEngine, SyncError, SyncResult};

/// Owns and wires every component of the synchronizer.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Rc<OrchestratorInner>,
}

struct OrchestratorInner {
    local: Rc<dyn KeyStore>,
    remote: Rc<dyn KeyStore>,
    executor: Rc<LocalExecutor<'static>>,
    night: NightSignal,
    sync: SyncEngine,
    stylesheets: StylesheetCache,
    shell: ShellLoader,
    wallpaper: Rc<WallpaperWriter>,
    owner: Owner,
    active: Cell<bool>,
    wallpaper_task: RefCell<Option<Task<()>>>,
    night_light_task: RefCell<Option<Task<()>>>,
}

impl Orchestrator {
    /// Build every component over the given stores and collaborators.
    ///
    /// `local` is the extension store, `remote` the system store. Fails if a
    /// store lacks a key the synchronizer needs.
    pub fn new(
        local: Rc<dyn KeyStore>,
        remote: Rc<dyn KeyStore>,
        engine: Rc<dyn ThemeEngine>,
        locator: Rc<dyn ThemeLocator>,
        executor: Rc<LocalExecutor<'static>>,
        config: ThemexConfig,
    ) -> SyncResult<Self> {
        for toggle in extension::TOGGLES {
            require(local.as_ref(), toggle, ValueKind::Bool)?;
        }
        for key in [system::SHELL, system::PICTURE_URI, system::PICTURE_URI_DARK] {
            require(remote.as_ref(), key, ValueKind::String)?;
        }

        let night = NightSignal::new();
        let sync = SyncEngine::new(local.clone(), remote.clone(), night.clone(), config.rules)?;
        let stylesheets = StylesheetCache::new(engine.clone(), night.clone(), config.stylesheets, executor.clone());
        let shell = ShellLoader::new(remote.clone(), system::SHELL, locator, engine, executor.clone());
        let wallpaper = Rc::new(WallpaperWriter::new(config.wallpaper.name, config.wallpaper.output));

        Ok(Self {
            inner: Rc::new(OrchestratorInner {
                local,
                remote,
                executor,
                night,
                sync,
                stylesheets,
                shell,
                wallpaper,
                owner: Owner::new(),
                active: Cell::new(false),
                wallpaper_task: RefCell::new(None),
                night_light_task: RefCell::new(None),
            }),
        })
    }

    /// Connect the toggles and start the components they enable.
    pub fn start(&self) -> SyncResult<()> {
        let inner = &self.inner;
        if inner.active.get() {
            return Ok(());
        }

        inner.night.bind(&inner.local, extension::NIGHT)?;

        let weak = Rc::downgrade(inner);
        inner.night.on_change(
            inner.owner,
            Rc::new(move |value: &Option<bool>| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if value.is_some() {
                    inner.sync.handle_flip();
                    inner.stylesheets.refresh();
                }
            }),
        );

        for toggle in [extension::THEME, extension::STYLESHEET, extension::WALLPAPER] {
            let weak = Rc::downgrade(inner);
            inner.local.connect(
                toggle,
                inner.owner,
                callback(move |key| {
                    if let Some(inner) = weak.upgrade() {
                        OrchestratorInner::apply_toggle(&inner, key);
                    }
                    Ok(())
                }),
            )?;
        }

        for key in [system::PICTURE_URI, system::PICTURE_URI_DARK] {
            let weak = Rc::downgrade(inner);
            inner.remote.connect(
                key,
                inner.owner,
                callback(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        if inner.local.get_bool(extension::WALLPAPER) {
                            OrchestratorInner::save_wallpaper(&inner);
                        }
                    }
                    Ok(())
                }),
            )?;
        }

        inner.active.set(true);
        inner.shell.start()?;
        for toggle in [extension::THEME, extension::STYLESHEET, extension::WALLPAPER] {
            OrchestratorInner::apply_toggle(inner, toggle);
        }
        log::info!("Synchronizer started");
        Ok(())
    }

    /// Detach every listener, stop every component and unload the custom
    /// stylesheet.
    pub fn stop(&self) {
        let inner = &self.inner;
        inner.local.detach_all(inner.owner);
        inner.remote.detach_all(inner.owner);
        inner.night.detach(inner.owner);
        inner.night.unbind();

        inner.sync.deactivate();
        inner.stylesheets.disable();
        inner.shell.stop();
        drop(inner.wallpaper_task.take());
        drop(inner.night_light_task.take());

        if inner.active.replace(false) {
            log::info!("Synchronizer stopped");
        }
    }

    /// Follow the desktop's Night Light status over D-Bus.
    ///
    /// Runs on the executor until [Orchestrator::stop]. When the settings
    /// daemon is unreachable or goes away, the night state becomes unknown.
    #[cfg(feature = "night-light")]
    pub fn watch_night_light(&self) {
        let night = self.inner.night.clone();
        let task = self.inner.executor.spawn(async move {
            let light = match themex_services::night_light::NightLight::connect().await {
                Ok(light) => light,
                Err(e) => {
                    log::warn!("Night Light unavailable: {}", e);
                    return;
                },
            };
            if let Err(e) = light.follow(|active| night.set_light_active(active)).await {
                log::warn!("Lost Night Light status: {}", e);
            }
            night.clear_light();
        });
        *self.inner.night_light_task.borrow_mut() = Some(task);
    }

    /// The night state.
    pub fn night(&self) -> &NightSignal {
        &self.inner.night
    }

    /// The preference synchronizer.
    pub fn sync_engine(&self) -> &SyncEngine {
        &self.inner.sync
    }

    /// The custom stylesheet cache.
    pub fn stylesheets(&self) -> &StylesheetCache {
        &self.inner.stylesheets
    }

    /// The shell theme loader.
    pub fn shell(&self) -> &ShellLoader {
        &self.inner.shell
    }

    /// The wallpaper descriptor writer.
    pub fn wallpaper(&self) -> &WallpaperWriter {
        &self.inner.wallpaper
    }

    /// Returns true between [Orchestrator::start] and [Orchestrator::stop].
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }
}

impl OrchestratorInner {
    fn apply_toggle(inner: &Rc<OrchestratorInner>, key: &str) {
        let on = inner.local.get_bool(key);
        log::debug!("Toggle '{}' is {}", key, if on { "on" } else { "off" });
        match key {
            extension::THEME => inner.sync.set_active(on),
            extension::STYLESHEET => inner.stylesheets.set_active(on),
            extension::WALLPAPER if on => Self::save_wallpaper(inner),
            _ => {},
        }
    }

    fn save_wallpaper(inner: &Rc<OrchestratorInner>) {
        let pair = WallpaperPair::new(
            &inner.remote.get_string(system::PICTURE_URI),
            &inner.remote.get_string(system::PICTURE_URI_DARK),
        );
        let writer = inner.wallpaper.clone();
        let task = inner.executor.spawn(async move { writer.save(pair).await });
        *inner.wallpaper_task.borrow_mut() = Some(task);
    }
}

impl Component for Orchestrator {
    fn start(&self) -> anyhow::Result<()> {
        Ok(Orchestrator::start(self)?)
    }

    fn stop(&self) {
        Orchestrator::stop(self);
    }

    fn is_active(&self) -> bool {
        Orchestrator::is_active(self)
    }
}

fn require(store: &dyn KeyStore, key: &str, kind: ValueKind) -> SyncResult<()> {
    if store.kind_of(key) == Some(kind) {
        return Ok(());
    }
    Err(SyncError::UnknownKey {
        store: store.name().to_string(),
        key: key.to_string(),
    })
}
