//! # CSV Polling Ingestor
//!
//! A self-scheduling ingestor for an upstream that only publishes "latest"
//! snapshots. Each cycle, in order:
//!
//! 1. fetch the snapshot;
//! 2. merge it into the store when the fetch succeeded;
//! 3. check the daily reset window, whatever the fetch outcome;
//! 4. sleep for the fixed poll interval.
//!
//! Every step's error is logged and contained in its cycle; the loop keeps
//! running until the shutdown channel fires. Store I/O runs on the blocking
//! pool, which also turns a panic inside the merge into an ordinary cycle
//! error.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use chrono::{Local, NaiveDateTime};
use log::{debug, error, info, warn};
use tokio::sync::broadcast;
use tokio::task;

use super::csv_source::SnapshotSource;
use crate::configs::config_ingest::IngestConfig;
use crate::errors::{FailureClass, IngestError};
use crate::store::{maybe_reset, merge, MergeOptions, MergeOutcome, ResetWindow};

/// What one cycle did. Nothing here outlives the cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// A snapshot was fetched.
    pub fetched: bool,
    /// Result of the merge, if one ran and succeeded.
    pub merged: Option<MergeOutcome>,
    /// The store was truncated by the reset window.
    pub reset: bool,
    /// Failures contained in this cycle, in the order they happened.
    pub failures: Vec<FailureClass>,
}

/// # CSV Polling Ingestor
///
/// Owns the snapshot source and the store settings. Generic over the source
/// so tests can script fetch results.
pub struct CsvPollingIngestor<S> {
    source: S,
    store_path: PathBuf,
    poll_interval: Duration,
    window: ResetWindow,
    merge_options: MergeOptions,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<S: SnapshotSource> CsvPollingIngestor<S> {
    /// Creates an ingestor feeding the store described by `config`.
    pub fn new(source: S, config: &IngestConfig) -> Self {
        Self {
            source,
            store_path: config.store_path.clone(),
            poll_interval: config.poll_interval(),
            window: ResetWindow::new(config.reset_hour, config.reset_minute),
            merge_options: MergeOptions {
                atomic_publish: config.atomic_publish,
            },
            clock: local_now,
        }
    }

    /// Replaces the wall clock consulted by the reset check.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// # Main Execution Loop
    ///
    /// Runs cycles back to back with `poll_interval` between them. Returns
    /// only when `shutdown` fires (or its sender is dropped); the signal is
    /// observed during the sleep, so an in-progress cycle always completes.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "CSV polling started: store {}, every {}s, reset at {:02}:{:02}",
            self.store_path.display(),
            self.poll_interval.as_secs(),
            self.window.hour,
            self.window.minute
        );

        loop {
            let report = self.run_cycle().await;
            debug!("Cycle finished: {:?}", report);

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("CSV polling received shutdown signal.");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Runs one fetch → merge → reset check cycle. Never fails: errors are
    /// logged and listed in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        // --- Phase 1: Fetch ---
        let snapshot = match self.source.fetch().await {
            Ok(bytes) => {
                report.fetched = true;
                Some(bytes)
            }
            Err(e) => {
                warn!("{}", e);
                report.failures.push(e.class());
                None
            }
        };

        // --- Phase 2: Merge ---
        if let Some(bytes) = snapshot {
            match self.merge_blocking(bytes).await {
                Ok(outcome) => {
                    match outcome {
                        MergeOutcome::Created { data_rows } => {
                            info!("CSV created and data saved successfully! ({} rows)", data_rows)
                        }
                        MergeOutcome::Appended { data_rows } => {
                            info!("CSV updated successfully! ({} rows)", data_rows)
                        }
                    }
                    report.merged = Some(outcome);
                }
                Err(e) => {
                    error!("Merge aborted for this cycle: {}", e);
                    report.failures.push(FailureClass::Merge);
                }
            }
        }

        // --- Phase 3: Reset check ---
        // Sampled after the fetch, like the wall clock the check is about.
        let now = (self.clock)();
        match self.reset_blocking(now).await {
            Ok(reset) => report.reset = reset,
            Err(e) => {
                error!("{}", e);
                report.failures.push(FailureClass::Reset);
            }
        }

        report
    }

    async fn merge_blocking(&self, snapshot: Bytes) -> Result<MergeOutcome, IngestError> {
        let path = self.store_path.clone();
        let options = self.merge_options;
        task::spawn_blocking(move || merge(&snapshot, &path, options))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?
    }

    async fn reset_blocking(&self, now: NaiveDateTime) -> Result<bool, IngestError> {
        let path = self.store_path.clone();
        let window = self.window;
        task::spawn_blocking(move || maybe_reset(&path, &now, window))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?
    }
}
