//! Scheduled Jobs
//!
//! Background generation of the day's rent transactions. Generation is
//! idempotent per (store, day), so ticking more often than daily only
//! catches stores activated since the last run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use crate::error::AppError;
use crate::handlers::TransactionManager;

// =========================================================================
// Daily Transaction Generation Job
// =========================================================================

/// Create today's missing transactions on behalf of `actor`
pub async fn generate_daily_transactions(
    transactions: &TransactionManager,
    actor: Uuid,
) -> Result<usize, JobError> {
    let result = transactions.generate_daily(actor).await?;

    if result.created > 0 {
        tracing::info!(created = result.created, "Scheduled generation created transactions");
    } else {
        tracing::debug!("Scheduled generation found nothing to create");
    }

    Ok(result.created)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval between generation runs
    pub daily_generation_interval: Duration,
    /// User recorded as creator of generated transactions
    pub actor: Uuid,
}

impl JobSchedulerConfig {
    pub fn new(actor: Uuid) -> Self {
        Self {
            daily_generation_interval: Duration::from_secs(3600),
            actor,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.daily_generation_interval = interval;
        self
    }
}

/// Job Scheduler - runs periodic generation until shutdown is signalled
pub struct JobScheduler {
    transactions: TransactionManager,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    pub fn new(transactions: TransactionManager, config: JobSchedulerConfig) -> Self {
        Self {
            transactions,
            config,
        }
    }

    /// Start the job scheduler in the background.
    /// The loop exits once `shutdown` flips to `true` or its sender is dropped.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.config.daily_generation_interval.as_secs(),
            actor = %self.config.actor,
            "Job scheduler started"
        );

        let mut generation_interval = interval(self.config.daily_generation_interval);
        generation_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = generation_interval.tick() => {
                    if let Err(e) = generate_daily_transactions(&self.transactions, self.config.actor).await {
                        tracing::error!(error = %e, "Daily transaction generation failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Job scheduler stopped");
    }

    /// Run every job once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> GenerationReport {
        let mut report = GenerationReport::default();

        match generate_daily_transactions(&self.transactions, self.config.actor).await {
            Ok(created) => report.transactions_created = created,
            Err(e) => report.errors.push(format!("Daily generation: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running the jobs once
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub transactions_created: usize,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Generation failed: {0}")]
    Generation(#[from] AppError),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::domain::FixedClock;
    use crate::handlers::{CreateStoreCommand, StoreManager};
    use crate::repository::MemoryDatabase;

    fn manager(db: &MemoryDatabase) -> TransactionManager {
        TransactionManager::new(
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap())),
        )
    }

    #[test]
    fn test_job_scheduler_config() {
        let actor = Uuid::new_v4();
        let config = JobSchedulerConfig::new(actor);
        assert_eq!(config.daily_generation_interval, Duration::from_secs(3600));

        let config = config.with_interval(Duration::from_secs(60));
        assert_eq!(config.daily_generation_interval, Duration::from_secs(60));
        assert_eq!(config.actor, actor);
    }

    #[tokio::test]
    async fn test_run_all_once_generates_then_skips() {
        let db = MemoryDatabase::new();
        let actor = Uuid::new_v4();
        StoreManager::new(Arc::new(db.clone()))
            .create(
                CreateStoreCommand::new("M001", "VK OE", "Vannak", "V1", dec!(1000)).active(true),
                actor,
            )
            .await
            .unwrap();

        let scheduler = JobScheduler::new(manager(&db), JobSchedulerConfig::new(actor));

        let first = scheduler.run_all_once().await;
        assert_eq!(first.transactions_created, 1);
        assert!(first.errors.is_empty());

        let second = scheduler.run_all_once().await;
        assert_eq!(second.transactions_created, 0);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let db = MemoryDatabase::new();
        let config = JobSchedulerConfig::new(Uuid::new_v4()).with_interval(Duration::from_secs(3600));
        let (tx, rx) = watch::channel(false);

        let handle = JobScheduler::new(manager(&db), config).start(rx);
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
