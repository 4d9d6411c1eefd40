//! Fixed-interval background job driver.
//!
//! Each registered job gets its own tokio task that awaits the job body
//! before sleeping again, so executions of one job never overlap. Ticks
//! missed while a body runs long are delayed, not bursted.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Drives named jobs on fixed intervals, one serial worker per job.
#[derive(Default)]
pub struct Scheduler {
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    /// Creates a scheduler with no jobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `job` to run every `period`, starting one period from now.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; consume it so
            // the job starts one full period after registration.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!(job = name, "tick");
                job().await;
            }
        });
        info!(job = name, period_secs = period.as_secs_f64(), "job scheduled");
        self.workers.push((name, handle));
    }

    /// Number of registered jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops every worker.
    pub fn shutdown(mut self) {
        for (name, handle) in self.workers.drain(..) {
            handle.abort();
            debug!(job = name, "job stopped");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, handle) in &self.workers {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn jobs_fire_once_per_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();

        let mut scheduler = Scheduler::new();
        scheduler.every("tick-counter", Duration::from_secs(10), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_jobs_never_overlap() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (running_job, peak_job) = (running.clone(), peak.clone());

        let mut scheduler = Scheduler::new();
        scheduler.every("slow-job", Duration::from_secs(1), move || {
            let running = running_job.clone();
            let peak = peak_job.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Body takes three periods.
                tokio::time::sleep(Duration::from_secs(3)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }
}
