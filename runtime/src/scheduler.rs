//! Periodic background jobs.
//!
//! Each job runs on its own task, ticking on a [`tokio::time::interval`]
//! and stopping when the shared `watch` channel flips to `true`. A tick
//! that finds the previous run still going is delayed, never doubled up.

use crate::reminders::DeliveryReminders;
use crate::sweep::ExpirySweep;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owns the periodic job tasks.
#[derive(Debug)]
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// A scheduler with no jobs.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Run `job` every `period`, starting immediately.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(job = name, period_secs = period.as_secs(), "Periodic job started");

            while !*shutdown.borrow() {
                tokio::select! {
                    _ = ticker.tick() => job().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!(job = name, "Periodic job stopped");
        });
        self.tasks.push(handle);
    }

    /// Run the expiry sweep every `period`.
    pub fn schedule_sweep(&mut self, sweep: ExpirySweep, period: Duration) {
        self.spawn_periodic("expiry_sweep", period, move || {
            let sweep = sweep.clone();
            async move {
                match sweep.run_once().await {
                    Ok(0) => {}
                    Ok(released) => tracing::info!(released, "Expiry sweep finished"),
                    Err(err) => tracing::warn!(error = %err, "Expiry sweep failed"),
                }
            }
        });
    }

    /// Send delivery reminders every `period`.
    pub fn schedule_reminders(&mut self, reminders: DeliveryReminders, period: Duration) {
        self.spawn_periodic("delivery_reminders", period, move || {
            let reminders = reminders.clone();
            async move {
                if let Err(err) = reminders.run_once().await {
                    tracing::warn!(error = %err, "Delivery reminder run failed");
                }
            }
        });
    }

    /// Number of running jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no job was scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every job to stop and wait for them. A job mid-run finishes
    /// that run first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for result in join_all(self.tasks).await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "Periodic job ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_job_ticks_until_shutdown() {
        let runs = Arc::new(AtomicU32::new(0));
        let mut scheduler = Scheduler::new();
        let counter = Arc::clone(&runs);
        scheduler.spawn_periodic("count", Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(scheduler.len(), 1);

        tokio::time::sleep(Duration::from_secs(25)).await;
        scheduler.shutdown().await;
        let after_shutdown = runs.load(Ordering::SeqCst);
        assert_eq!(after_shutdown, 3);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_shutdown);
    }

    #[tokio::test]
    async fn test_shutdown_without_jobs() {
        let scheduler = Scheduler::default();
        assert!(scheduler.is_empty());
        scheduler.shutdown().await;
    }
}
