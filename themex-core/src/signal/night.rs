use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use themex_services::{callback, KeyStore, Owner, StoreResult};

use super::state::{Listener, StateSignal};

/// Whether night values are in effect.
///
/// Derived from two inputs: the auto-switch toggle and the Night Light
/// status. The value is [None] while the toggle is on but no Night Light
/// status has been received yet; consumers do nothing until it is known.
/// With the toggle off it is always `Some(false)`.
///
/// Every upstream event is forwarded; listeners fire whenever the derived
/// value changes. The handle is cheap to clone.
#[derive(Clone)]
pub struct NightSignal {
    inner: Rc<NightInner>,
}

struct NightInner {
    enabled: Cell<bool>,
    light_active: Cell<Option<bool>>,
    state: StateSignal<Option<bool>>,
    owner: Owner,
    bound: RefCell<Option<Weak<dyn KeyStore>>>,
}

impl NightInner {
    fn derive(&self) -> Option<bool> {
        if !self.enabled.get() {
            return Some(false);
        }
        self.light_active.get()
    }

    fn update(&self) {
        let value = self.derive();
        if self.state.set(value) {
            log::debug!("Night changed to {:?}", value);
        }
    }
}

impl NightSignal {
    /// Create a signal with the toggle off.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(NightInner {
                enabled: Cell::new(false),
                light_active: Cell::new(None),
                state: StateSignal::new(Some(false)),
                owner: Owner::new(),
                bound: RefCell::new(None),
            }),
        }
    }

    /// Follow the boolean toggle `key` of `store`.
    pub fn bind(&self, store: &Rc<dyn KeyStore>, key: &str) -> StoreResult<()> {
        self.unbind();

        let weak = Rc::downgrade(&self.inner);
        let source = Rc::downgrade(store);
        store.connect(
            key,
            self.inner.owner,
            callback(move |key| {
                if let (Some(inner), Some(store)) = (weak.upgrade(), source.upgrade()) {
                    inner.enabled.set(store.get_bool(key));
                    inner.update();
                }
                Ok(())
            }),
        )?;
        *self.inner.bound.borrow_mut() = Some(Rc::downgrade(store));
        self.set_enabled(store.get_bool(key));
        Ok(())
    }

    /// Stop following the toggle.
    pub fn unbind(&self) {
        let bound = self.inner.bound.borrow_mut().take();
        if let Some(store) = bound.and_then(|store| store.upgrade()) {
            store.detach_all(self.inner.owner);
        }
    }

    /// Set the auto-switch toggle directly.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.set(enabled);
        self.inner.update();
    }

    /// Record a Night Light status reading.
    pub fn set_light_active(&self, active: bool) {
        self.inner.light_active.set(Some(active));
        self.inner.update();
    }

    /// Forget the Night Light status, e.g. when its source went away.
    pub fn clear_light(&self) {
        self.inner.light_active.set(None);
        self.inner.update();
    }

    /// Whether night values are in effect, if known.
    pub fn is_night(&self) -> Option<bool> {
        self.inner.state.get()
    }

    /// Register `listener` for changes on behalf of `owner`.
    pub fn on_change(&self, owner: Owner, listener: Listener<Option<bool>>) {
        self.inner.state.listen(owner, listener);
    }

    /// Remove the listeners of `owner`.
    pub fn detach(&self, owner: Owner) {
        self.inner.state.detach(owner);
    }
}

impl Default for NightSignal {
    fn default() -> Self {
        Self::new()
    }
}
