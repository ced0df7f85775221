//! Interval scheduler for the sync and recheck cycles.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};

use pronotif_core::config::SyncConfig;
use pronotif_core::error::AppError;

use crate::synchronizer::{SyncScope, Synchronizer};

/// Runs the two synchronization cycles on fixed intervals.
pub struct SyncScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Cycle implementation
    synchronizer: Arc<Synchronizer>,
    /// Timer settings
    config: SyncConfig,
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("interval_seconds", &self.config.interval_seconds)
            .field("recheck_interval_seconds", &self.config.recheck_interval_seconds)
            .finish()
    }
}

impl SyncScheduler {
    /// Creates a new scheduler
    pub async fn new(synchronizer: Arc<Synchronizer>, config: SyncConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            synchronizer,
            config,
        })
    }

    /// Registers both cycles
    pub async fn register_cycles(&self) -> Result<(), AppError> {
        self.register_sync_cycle().await?;
        self.register_recheck_cycle().await?;
        tracing::info!("Synchronization cycles registered");
        Ok(())
    }

    /// Starts the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Sync scheduler started");
        Ok(())
    }

    /// Shuts down the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Sync scheduler shut down");
        Ok(())
    }

    /// Periodic sync cycle over all valid accounts
    async fn register_sync_cycle(&self) -> Result<(), AppError> {
        let interval = Duration::from_secs(self.config.interval_seconds.max(1));
        let synchronizer = Arc::clone(&self.synchronizer);
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let synchronizer = Arc::clone(&synchronizer);
            Box::pin(async move {
                if let Err(e) = synchronizer.run_sync_cycle(&SyncScope::All).await {
                    tracing::error!("Sync cycle failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create sync schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sync schedule: {e}")))?;

        tracing::info!("Registered: sync cycle (every {}s)", interval.as_secs());
        Ok(())
    }

    /// Invalidation-recheck cycle
    async fn register_recheck_cycle(&self) -> Result<(), AppError> {
        let interval = Duration::from_secs(self.config.recheck_interval_seconds.max(1));
        let synchronizer = Arc::clone(&self.synchronizer);
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let synchronizer = Arc::clone(&synchronizer);
            Box::pin(async move {
                if let Err(e) = synchronizer.run_recheck_cycle().await {
                    tracing::error!("Recheck cycle failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create recheck schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add recheck schedule: {e}")))?;

        tracing::info!("Registered: recheck cycle (every {}s)", interval.as_secs());
        Ok(())
    }
}
