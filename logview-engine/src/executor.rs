//! The background execution context.
//!
//! Store queries and observer callbacks never run on the caller's thread.
//! [`Background`] names the tokio runtime they run on; any thread, inside a
//! runtime or not, can hand work to it through the engine's fire-and-forget
//! entry points.

use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Handle to the executor that runs engine work.
#[derive(Debug, Clone)]
pub struct Background {
    handle: Handle,
}

impl Background {
    /// Use the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Use the runtime the caller is running on, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    /// Use an explicit runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Run `future` on the background executor.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// The underlying runtime handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawns_on_current_runtime() {
        let background = Background::current();
        let out = background.spawn(async { 21 * 2 }).await.unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn try_current_outside_runtime_is_none() {
        assert!(Background::try_current().is_none());
    }

    #[test]
    fn plain_threads_can_hand_work_over() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let background = Background::from_handle(runtime.handle().clone());

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            background.spawn(async move {
                tx.send(std::thread::current().name().map(str::to_owned)).unwrap();
            });
        })
        .join()
        .unwrap();

        let ran_on = rx.recv().unwrap();
        assert_eq!(ran_on.as_deref(), Some("tokio-runtime-worker"));
    }
}
