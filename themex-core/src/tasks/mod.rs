//! Delayed and coalesced work on the local executor.
use smol::{LocalExecutor, Task, Timer};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

type Pending = Rc<RefCell<Option<(u64, Task<()>)>>>;

/// Runs a job once a burst of requests has gone quiet.
///
/// Every [Debouncer::schedule] cancels the job scheduled before it and
/// restarts the delay, so only the last request of a burst runs.
pub struct Debouncer {
    executor: Rc<LocalExecutor<'static>>,
    delay: Duration,
    pending: Pending,
    generation: Cell<u64>,
}

impl Debouncer {
    /// Create a debouncer running its jobs on `executor` after `delay`.
    pub fn new(executor: Rc<LocalExecutor<'static>>, delay: Duration) -> Self {
        Self {
            executor,
            delay,
            pending: Rc::new(RefCell::new(None)),
            generation: Cell::new(0),
        }
    }

    /// Run `job` after the delay, replacing any job still waiting.
    pub fn schedule<F, Fut>(&self, job: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let pending = Rc::downgrade(&self.pending);
        let delay = self.delay;
        let task = self.executor.spawn(async move {
            Timer::after(delay).await;

            // Release our own handle first: the job may schedule again, and
            // that must not cancel the job that is running.
            if let Some(pending) = pending.upgrade() {
                let mut slot = pending.borrow_mut();
                if slot.as_ref().map(|(g, _)| *g) == Some(generation) {
                    if let Some((_, task)) = slot.take() {
                        task.detach();
                    }
                }
            }

            job().await;
        });

        let previous = self.pending.borrow_mut().replace((generation, task));
        drop(previous);
    }

    /// Cancel the waiting job, if any.
    pub fn cancel(&self) {
        let previous = self.pending.borrow_mut().take();
        if previous.is_some() {
            log::trace!("Cancelled pending job");
        }
    }

    /// Returns true if a job is waiting for its delay to pass.
    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
