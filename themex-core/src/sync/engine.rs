use std::cell::Cell;
use std::rc::{Rc, Weak};

use themex_services::{callback, Callback, KeyStore, Owner, StoreResult, ValueKind};

use super::{reconcile, SyncError, SyncResult, SyncRule};
use crate::component::Component;
use crate::signal::NightSignal;

/// Keeps the remote key of every [SyncRule] equal to its active local key.
///
/// Listeners read the night state through the [NightSignal] when they fire,
/// so a flip never leaves a listener working with a stale value.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Rc<EngineInner>,
}

struct EngineInner {
    local: Rc<dyn KeyStore>,
    remote: Rc<dyn KeyStore>,
    night: NightSignal,
    rules: Vec<SyncRule>,
    owner: Owner,
    active: Cell<bool>,
}

#[derive(Clone, Copy)]
enum Direction {
    /// Remote changed: store it in the active local key.
    Store,
    /// A local key changed: fetch it into remote if it is the active one.
    Fetch { night: bool },
}

impl SyncEngine {
    /// Create an engine for `rules`.
    ///
    /// Fails if a rule names a key that is missing from its store or does not
    /// hold strings.
    pub fn new(
        local: Rc<dyn KeyStore>,
        remote: Rc<dyn KeyStore>,
        night: NightSignal,
        rules: Vec<SyncRule>,
    ) -> SyncResult<Self> {
        for rule in &rules {
            check_key(local.as_ref(), &rule.day)?;
            check_key(local.as_ref(), &rule.night)?;
            check_key(remote.as_ref(), &rule.remote)?;
        }

        Ok(Self {
            inner: Rc::new(EngineInner {
                local,
                remote,
                night,
                rules,
                owner: Owner::new(),
                active: Cell::new(false),
            }),
        })
    }

    /// Push the active local value of every rule into remote.
    ///
    /// An empty active local key is seeded from remote instead. Does nothing
    /// while the night state is unknown.
    pub fn resync_all(&self) {
        self.inner.resync_all();
    }

    /// Install the listeners and resynchronize.
    pub fn activate(&self) -> SyncResult<()> {
        if self.inner.active.get() {
            return Ok(());
        }

        let inner = &self.inner;
        for (index, rule) in inner.rules.iter().enumerate() {
            inner
                .remote
                .connect(&rule.remote, inner.owner, self.listener(index, Direction::Store))?;
            inner.local.connect(
                &rule.day,
                inner.owner,
                self.listener(index, Direction::Fetch { night: false }),
            )?;
            inner.local.connect(
                &rule.night,
                inner.owner,
                self.listener(index, Direction::Fetch { night: true }),
            )?;
        }

        inner.active.set(true);
        log::debug!("Sync activated for {} rules", inner.rules.len());
        inner.resync_all();
        Ok(())
    }

    /// Remove every listener installed by [SyncEngine::activate].
    pub fn deactivate(&self) {
        let inner = &self.inner;
        inner.local.detach_all(inner.owner);
        inner.remote.detach_all(inner.owner);
        if inner.active.replace(false) {
            log::debug!("Sync deactivated");
        }
    }

    /// React to a change of the night state.
    ///
    /// Listeners stay installed across flips; the values that drifted while
    /// their direction was suppressed are pushed by a full resync.
    pub fn handle_flip(&self) {
        if self.inner.active.get() {
            self.inner.resync_all();
        }
    }

    /// Returns true while the listeners are installed.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// The rules being synchronized.
    pub fn rules(&self) -> &[SyncRule] {
        &self.inner.rules
    }

    fn listener(&self, index: usize, direction: Direction) -> Callback {
        let weak: Weak<EngineInner> = Rc::downgrade(&self.inner);
        callback(move |_| {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            inner.propagate(index, direction)?;
            Ok(())
        })
    }
}

impl EngineInner {
    fn resync_all(&self) {
        let Some(is_night) = self.night.is_night() else {
            log::debug!("Night state unknown, not resyncing");
            return;
        };
        for rule in &self.rules {
            if let Err(e) = self.resync(rule, is_night) {
                log::warn!("Failed to sync '{}': {}", rule.remote, e);
            }
        }
    }

    fn resync(&self, rule: &SyncRule, is_night: bool) -> StoreResult<bool> {
        let local_key = rule.local(is_night);
        if self.local.get_string(local_key).is_empty() {
            return reconcile(self.remote.as_ref(), &rule.remote, self.local.as_ref(), local_key);
        }
        reconcile(self.local.as_ref(), local_key, self.remote.as_ref(), &rule.remote)
    }

    fn propagate(&self, index: usize, direction: Direction) -> StoreResult<bool> {
        let Some(rule) = self.rules.get(index) else {
            return Ok(false);
        };
        let Some(is_night) = self.night.is_night() else {
            return Ok(false);
        };

        match direction {
            Direction::Store => {
                reconcile(self.remote.as_ref(), &rule.remote, self.local.as_ref(), rule.local(is_night))
            },
            Direction::Fetch { night } if night == is_night => {
                reconcile(self.local.as_ref(), rule.local(night), self.remote.as_ref(), &rule.remote)
            },
            Direction::Fetch { .. } => Ok(false),
        }
    }
}

impl Component for SyncEngine {
    fn start(&self) -> anyhow::Result<()> {
        Ok(self.activate()?)
    }

    fn stop(&self) {
        self.deactivate();
    }

    fn is_active(&self) -> bool {
        SyncEngine::is_active(self)
    }
}

fn check_key(store: &dyn KeyStore, key: &str) -> SyncResult<()> {
    match store.kind_of(key) {
        Some(ValueKind::String) => Ok(()),
        _ => Err(SyncError::UnknownKey {
            store: store.name().to_string(),
            key: key.to_string(),
        }),
    }
}
