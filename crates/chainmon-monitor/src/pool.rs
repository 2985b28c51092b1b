use chainmon_rpc::error::Result as RpcResult;
use chainmon_rpc::types::SignedCommit;
use chainmon_rpc::ChainRpc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Bounded-concurrency commit fetcher.
///
/// Every submitted height gets its own task, but at most `max_concurrency`
/// requests are in flight at once. Results come back unordered; the caller
/// sorts after draining.
pub struct FetchPool {
    rpc: Arc<dyn ChainRpc>,
    limiter: Arc<Semaphore>,
    tasks: JoinSet<(u64, RpcResult<SignedCommit>)>,
}

impl FetchPool {
    pub fn new(rpc: Arc<dyn ChainRpc>, max_concurrency: usize) -> Self {
        Self {
            rpc,
            limiter: Arc::new(Semaphore::new(max_concurrency.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Queues a fetch for `height`. The task blocks on a permit before it
    /// touches the network.
    pub fn submit(&mut self, height: u64) {
        let rpc = Arc::clone(&self.rpc);
        let limiter = Arc::clone(&self.limiter);
        self.tasks.spawn(async move {
            // The semaphore lives as long as the pool and is never closed.
            let _permit = limiter.acquire_owned().await.ok();
            (height, rpc.commit(height).await)
        });
    }

    /// Waits for every queued fetch and returns the per-height outcomes,
    /// in completion order.
    pub async fn drain(&mut self) -> Vec<(u64, RpcResult<SignedCommit>)> {
        let mut results = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(outcome) => results.push(outcome),
                Err(e) => tracing::error!(error = %e, "commit fetch task panicked"),
            }
        }
        results
    }
}
