use futures::{StreamExt, stream};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs tasks with at most `limit` in flight at any instant. Completion
/// order is not guaranteed. Dropping the returned future cancels tasks that
/// have not started; permits held by in-flight tasks release on drop.
#[derive(Clone)]
pub struct WorkerPool {
    gate: Arc<Semaphore>,
    limit: usize,
}

impl WorkerPool {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            gate: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub async fn run_all<F, T>(&self, tasks: Vec<F>) -> Vec<T>
    where
        F: Future<Output = T>,
    {
        stream::iter(tasks)
            .map(|task| {
                let gate = self.gate.clone();
                async move {
                    // Held for the duration of the task; drops at end of scope.
                    let _permit = gate.acquire_owned().await;
                    task.await
                }
            })
            .buffer_unordered(self.limit)
            .collect()
            .await
    }
}
