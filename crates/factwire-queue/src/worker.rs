//! Background worker that drains the extraction queue

use crate::{QueueConfig, QueueError, QueueMetrics, QueueStatus, QueueStore};
use async_trait::async_trait;
use factwire_domain::DocumentId;
use futures::future::join_all;
use std::time::Instant;
use tokio::time::{interval, Duration};

/// Result of processing one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Extraction finished, fully or partially
    Done,
    /// Extraction failed with the given error
    Failed(String),
}

/// Something that extracts a queued document
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Process one document
    async fn process(&self, document_id: DocumentId) -> ProcessOutcome;
}

/// Counts for one worker cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Failed entries moved back to queued
    pub requeued: usize,
    /// Entries moved to running
    pub started: usize,
    /// Entries moved to done
    pub completed: usize,
    /// Entries moved to failed
    pub failed: usize,
}

/// Background worker that processes queued documents on a schedule
///
/// # Examples
///
/// ```no_run
/// use factwire_queue::{InMemoryQueue, QueueConfig, QueueWorker};
/// # use factwire_queue::{DocumentProcessor, ProcessOutcome};
/// # use factwire_domain::DocumentId;
/// # struct Noop;
/// # #[async_trait::async_trait]
/// # impl DocumentProcessor for Noop {
/// #     async fn process(&self, _id: DocumentId) -> ProcessOutcome { ProcessOutcome::Done }
/// # }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut queue = InMemoryQueue::new();
///     let mut worker = QueueWorker::new(QueueConfig::default());
///
///     // Run for 3 cycles then stop
///     worker.run_cycles(&mut queue, &Noop, 3).await?;
///     Ok(())
/// }
/// ```
pub struct QueueWorker {
    config: QueueConfig,
    interval: Duration,
    metrics: QueueMetrics,
}

impl QueueWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: QueueConfig) -> Self {
        let interval = config.poll_interval();
        Self {
            config,
            interval,
            metrics: QueueMetrics::new(),
        }
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Self {
        Self::new(QueueConfig::default())
    }

    /// Get the worker configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Run one cycle: requeue eligible failures, then process one batch
    ///
    /// The batch is processed concurrently; transitions are applied once
    /// every member has finished.
    pub async fn run_cycle<S, P>(
        &mut self,
        store: &mut S,
        processor: &P,
    ) -> Result<CycleReport, QueueError>
    where
        S: QueueStore,
        P: DocumentProcessor + ?Sized,
    {
        let started_at = Instant::now();
        let mut report = CycleReport::default();

        if let Some(limit) = self.config.requeue_failed_below {
            for entry in store.list(Some(QueueStatus::Failed))? {
                if entry.attempts < limit {
                    store.requeue(entry.document_id)?;
                    report.requeued += 1;
                }
            }
        }

        let mut batch = Vec::new();
        for entry in store.next_queued(self.config.batch_size)? {
            match store.start(entry.document_id) {
                Ok(_) => batch.push(entry.document_id),
                Err(QueueError::InvalidTransition { from, .. }) => {
                    tracing::warn!(
                        document_id = %entry.document_id,
                        status = %from,
                        "Queue entry changed before it could start, skipping"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        report.started = batch.len();

        let outcomes = join_all(batch.iter().map(|id| processor.process(*id))).await;

        // Every member gets its transition; the first store error is returned after
        let mut first_error = None;
        for (id, outcome) in batch.into_iter().zip(outcomes) {
            let applied = match outcome {
                ProcessOutcome::Done => store.complete(id).map(|_| report.completed += 1),
                ProcessOutcome::Failed(error) => {
                    tracing::warn!(document_id = %id, error = %error, "Extraction failed");
                    store.fail(id, &error).map(|_| report.failed += 1)
                }
            };
            if let Err(e) = applied {
                tracing::error!(document_id = %id, error = %e, "Could not record outcome");
                first_error.get_or_insert(e);
            }
        }

        self.metrics.record_transition(QueueStatus::Queued, report.requeued);
        self.metrics.record_transition(QueueStatus::Running, report.started);
        self.metrics.record_transition(QueueStatus::Done, report.completed);
        self.metrics.record_transition(QueueStatus::Failed, report.failed);
        self.metrics.record_cycle();
        self.metrics.total_runtime_ms += started_at.elapsed().as_millis() as u64;

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Run the worker indefinitely
    ///
    /// Cycles run at the configured interval until a shutdown signal
    /// (Ctrl+C) is received. A failing cycle is logged and the worker
    /// keeps going.
    pub async fn run<S, P>(&mut self, store: &mut S, processor: &P) -> Result<(), QueueError>
    where
        S: QueueStore,
        P: DocumentProcessor + ?Sized,
    {
        self.config.validate().map_err(QueueError::Config)?;
        let mut ticker = interval(self.interval);

        tracing::info!("Queue worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle(store, processor).await {
                        Ok(report) if report.started > 0 || report.requeued > 0 => {
                            tracing::info!(
                                "Cycle completed: {} requeued, {} started, {} done, {} failed",
                                report.requeued,
                                report.started,
                                report.completed,
                                report.failed
                            );
                        }
                        Ok(_) => tracing::debug!("Queue empty"),
                        Err(e) => tracing::error!("Cycle failed: {}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping queue worker");
                    break;
                }
            }
        }

        tracing::info!("Queue worker stopped. Final metrics:\n{}", self.metrics.summary());

        Ok(())
    }

    /// Run for a specific number of cycles
    pub async fn run_cycles<S, P>(
        &mut self,
        store: &mut S,
        processor: &P,
        cycles: usize,
    ) -> Result<(), QueueError>
    where
        S: QueueStore,
        P: DocumentProcessor + ?Sized,
    {
        self.config.validate().map_err(QueueError::Config)?;
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Queue worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            match self.run_cycle(store, processor).await {
                Ok(report) => {
                    tracing::debug!(
                        "Cycle {}/{} completed: {} started, {} done, {} failed",
                        cycle + 1,
                        cycles,
                        report.started,
                        report.completed,
                        report.failed
                    );
                }
                Err(e) => {
                    tracing::error!("Cycle {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Queue worker finished {} cycles. Final metrics:\n{}",
            cycles,
            self.metrics.summary()
        );

        Ok(())
    }

    /// Get the worker's current metrics
    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    /// Reset the worker's metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}
