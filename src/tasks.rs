use crate::error::AppError;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::{debug, warn};

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send>>;

struct Task {
    name: &'static str,
    work: TaskFuture,
}

/// Queue for fire-and-forget side effects: click increments, visitor-log
/// writes, retention pruning. A single worker drains the queue in order,
/// which also keeps concurrent SQLite writes from piling up. Failures land
/// in the log, never in a response.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Task>,
}

impl TaskQueue {
    pub fn start() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                match task.work.await {
                    Ok(()) => debug!(task = task.name, "background task finished"),
                    Err(err) => warn!(task = task.name, error = %err, "background task failed"),
                }
            }
        });
        Self { sender }
    }

    /// Hands a unit of work to the worker. Never blocks and never reports
    /// back; callers must not depend on the outcome.
    pub fn dispatch<F>(&self, name: &'static str, work: F)
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let task = Task {
            name,
            work: Box::pin(work),
        };
        if self.sender.send(task).is_err() {
            warn!(task = name, "task queue is closed, dropping task");
        }
    }
}
