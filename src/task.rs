use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Group of background retry tasks that can be awaited as a whole.
///
/// Tasks run on the runtime captured at construction, so `spawn` works from
/// any thread, including ones the runtime does not own.
#[derive(Clone)]
pub struct RetryTasks {
    tracker: TaskTracker,
    runtime: Handle,
    idle: Arc<Mutex<()>>,
}

impl RetryTasks {
    /// Bind to the current runtime. Panics outside a Tokio runtime.
    pub fn new() -> Self {
        Self::with_runtime(Handle::current())
    }

    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            tracker: TaskTracker::new(),
            runtime,
            idle: Arc::new(Mutex::new(())),
        }
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn_on(task, &self.runtime)
    }

    /// Number of tasks still running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far (and any spawned meanwhile) has finished
    pub async fn wait_idle(&self) {
        // close/reopen must not interleave between concurrent waiters
        let _idle = self.idle.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
