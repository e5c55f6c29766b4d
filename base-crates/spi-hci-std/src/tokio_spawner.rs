use spi_hci_transport::platform::{TaskSpawner, TaskSpec};
use tokio::runtime::{Handle, TryCurrentError};

/// Spawner of reader tasks onto the blocking thread pool of a tokio runtime
///
/// The reader task blocks on its signal so it cannot be an async task. It occupies one thread of
/// the blocking pool for as long as the transport exists. The stack size and priority of the task
/// are ignored, the stack size of the blocking pool is set with
/// [`Builder::thread_stack_size`](tokio::runtime::Builder::thread_stack_size).
#[derive(Debug, Clone)]
pub struct TokioBlockingSpawner {
    handle: Handle,
}

impl TokioBlockingSpawner {
    /// Create a `TokioBlockingSpawner` for the runtime of the current context
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(|handle| TokioBlockingSpawner { handle })
    }
}

impl From<Handle> for TokioBlockingSpawner {
    fn from(handle: Handle) -> Self {
        TokioBlockingSpawner { handle }
    }
}

impl TaskSpawner for TokioBlockingSpawner {
    type Error = core::convert::Infallible;

    fn spawn<F>(&self, spec: TaskSpec<'_>, task: F) -> Result<(), Self::Error>
    where
        F: FnOnce() + Send + 'static,
    {
        log::debug!("spawning blocking task '{}'", spec.name);

        // dropping the join handle does not cancel a blocking task
        self.handle.spawn_blocking(task);

        Ok(())
    }
}
