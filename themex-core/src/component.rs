//! The lifecycle shared by every part of the synchronizer.

/// A part of the synchronizer that can be switched on and off.
///
/// Everything a component registers while started (store listeners, signal
/// handlers, watchers, pending tasks) is released by [Component::stop].
/// Both methods are idempotent.
pub trait Component {
    /// Start the component.
    fn start(&self) -> anyhow::Result<()>;

    /// Stop the component and release everything it registered.
    fn stop(&self);

    /// Returns true while the component is started.
    fn is_active(&self) -> bool;

    /// Start or stop the component. Start failures are logged.
    fn set_active(&self, active: bool) {
        if active == self.is_active() {
            return;
        }
        if active {
            if let Err(e) = self.start() {
                log::error!("Failed to start component: {:#}", e);
            }
        } else {
            self.stop();
        }
    }
}
