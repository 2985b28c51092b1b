use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owns every periodic task the daemon runs and the shutdown signal that
/// stops them. A cycle that is already running when shutdown arrives is
/// allowed to finish; only the wait for the next tick is interrupted.
pub struct Scheduler {
    shutdown: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Spawns `cycle` to run every `period` until shutdown. The first run
    /// happens immediately.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, mut cycle: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut shutdown = self.shutdown.subscribe();
        self.handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => cycle().await,
                    _ = shutdown.recv() => {
                        tracing::info!(task = name, "scheduler task stopping");
                        break;
                    }
                }
            }
        }));
    }

    /// Signals every task to stop and waits for them to drain.
    pub async fn shutdown(self) {
        // Err here means no live subscriber, which is already the goal.
        let _ = self.shutdown.send(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "scheduler task did not shut down cleanly");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn periodic_task_runs_repeatedly_until_shutdown() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        let task_count = count.clone();
        scheduler.spawn_periodic("counter", Duration::from_millis(20), move || {
            let task_count = task_count.clone();
            async move {
                task_count.fetch_add(1, Ordering::SeqCst);
            }
        });

        // First tick fires immediately, then every 20ms.
        tokio::time::sleep(Duration::from_millis(110)).await;
        scheduler.shutdown().await;
        let runs = count.load(Ordering::SeqCst);
        assert!(runs >= 3, "expected several runs, got {runs}");
    }

    #[tokio::test]
    async fn shutdown_with_no_tasks_returns() {
        Scheduler::new().shutdown().await;
    }

    #[tokio::test]
    async fn a_stalled_unit_does_not_block_other_units() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.spawn_periodic("stalled", Duration::from_millis(20), || async {
            std::future::pending::<()>().await;
        });
        let task_count = count.clone();
        scheduler.spawn_periodic("counter", Duration::from_millis(20), move || {
            let task_count = task_count.clone();
            async move {
                task_count.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(110)).await;
        let runs = count.load(Ordering::SeqCst);
        assert!(runs >= 3, "expected several runs, got {runs}");
        // The stalled cycle never finishes, so joining it would hang.
        drop(scheduler);
    }
}
