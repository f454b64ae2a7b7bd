//! Named recurring tasks with per-task cancellation

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

struct ScheduledTask {
    period: Duration,
    token: CancellationToken,
}

/// Owns recurring background jobs by name.
///
/// Each job ticks first one `period` after it is scheduled, then every
/// `period`. Cancelling a job prevents future ticks; a run already in
/// progress is left to finish.
#[derive(Default)]
pub struct Scheduler {
    tasks: HashMap<&'static str, ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `job` under `name`, replacing any task of the same name
    pub fn schedule<F, Fut>(&mut self, name: &'static str, period: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel(name);

        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => job().await,
                }
            }
            tracing::debug!(task = name, "Recurring task stopped");
        });

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Recurring task scheduled");
        self.tasks.insert(
            name,
            ScheduledTask { period, token },
        );
    }

    /// Cancel one task; returns whether it existed
    pub fn cancel(&mut self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.token.cancel();
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn period(&self, name: &str) -> Option<Duration> {
        self.tasks.get(name).map(|task| task.period)
    }

    /// Scheduled task names with their periods, sorted by name
    pub fn entries(&self) -> Vec<(&'static str, Duration)> {
        let mut entries: Vec<_> = self
            .tasks
            .iter()
            .map(|(name, task)| (*name, task.period))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
