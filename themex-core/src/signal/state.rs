use std::cell::RefCell;
use std::rc::Rc;

use themex_services::Owner;

/// A listener of a [StateSignal]. Receives the new value.
pub type Listener<T> = Rc<dyn Fn(&T)>;

/// Simple signal implementation based on [Rc] and [RefCell] to get/set a value and notify listeners when it changes.
///
/// Setting the value it already holds does not notify. Listeners run in
/// registration order and may set the signal again.
pub struct StateSignal<T: 'static> {
    value: RefCell<T>,
    listeners: RefCell<Vec<(Owner, Listener<T>)>>,
}

impl<T: Clone + PartialEq + 'static> StateSignal<T> {
    /// Creates a new signal with the given value.
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            listeners: RefCell::new(Vec::with_capacity(1)),
        }
    }

    /// The current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Set the value. Returns false, without notifying, if it is unchanged.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify(&value);
        true
    }

    /// Register a listener on behalf of `owner`.
    pub fn listen(&self, owner: Owner, listener: Listener<T>) {
        self.listeners.borrow_mut().push((owner, listener));
    }

    /// Remove every listener of `owner`.
    pub fn detach(&self, owner: Owner) {
        self.listeners.borrow_mut().retain(|(o, _)| *o != owner);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(value);
        }
    }
}
