//! Change-notifying values.
//!
//! - [StateSignal](state::StateSignal): a value that notifies its listeners
//!   whenever it is set to something different
//! - [NightSignal](night::NightSignal): whether night values are in effect,
//!   derived from the Night Light status and the auto-switch toggle

/// Contains the [StateSignal](state::StateSignal) type.
pub mod state;

/// Contains the [NightSignal](night::NightSignal) type.
pub mod night;

pub use night::NightSignal;
pub use state::{Listener, StateSignal};
