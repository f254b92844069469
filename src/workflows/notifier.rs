// Completion notifier - refresh hook for transitions that finish asynchronously

use std::fmt;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::debug;

/// Handed to a command pipeline; completing it runs the registered callback once.
///
/// Dropping the signal without completing it means the callback never runs.
pub struct CompletionSignal {
    tx: Option<oneshot::Sender<()>>,
}

impl CompletionSignal {
    pub fn complete(mut self) {
        if let Some(tx) = self.tx.take() {
            // Receiver gone means nobody is waiting any more
            let _ = tx.send(());
        }
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("pending", &self.tx.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Pending {
    tasks: JoinSet<bool>,
    /// Callbacks that ran in tasks already reaped from `tasks`
    fired: usize,
}

impl Pending {
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if matches!(joined, Ok(true)) {
                self.fired += 1;
            }
        }
    }
}

/// Tracks callbacks registered for dispatched transitions.
///
/// Must be used from within a tokio runtime.
#[derive(Default)]
pub struct CompletionNotifier {
    pending: Mutex<Pending>,
}

impl CompletionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to run when the returned signal is completed
    pub fn on_batch_complete<F>(&self, callback: F) -> CompletionSignal
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<()>();

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.reap();
        pending.tasks.spawn(async move {
            match rx.await {
                Ok(()) => {
                    callback();
                    true
                }
                Err(_) => {
                    debug!("Completion signal dropped before the transition finished");
                    false
                }
            }
        });

        CompletionSignal { tx: Some(tx) }
    }

    /// Number of registrations whose outcome is still unknown
    pub fn outstanding(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.reap();
        pending.tasks.len()
    }

    /// Wait for every registration made so far and report how many callbacks
    /// ran since the previous call.
    ///
    /// Hangs for as long as a pipeline holds on to an uncompleted signal.
    pub async fn wait_idle(&self) -> usize {
        let Pending { mut tasks, mut fired } = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending)
        };

        while let Some(joined) = tasks.join_next().await {
            if matches!(joined, Ok(true)) {
                fired += 1;
            }
        }
        fired
    }
}

impl fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionNotifier")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}
