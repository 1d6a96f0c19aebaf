use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::database::{CaseStore, DatabaseError, StoredFingerprint};
use crate::partner::{PartnerApi, PartnerError};

use super::mapping::{canonical_json, fingerprint, is_insurance_case, map_case};
use super::status::{SyncGuard, SyncStats};

/// Result of processing one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Upserted,
    SkippedNoChange,
    SkippedNotInsurance,
    ErrorFetchFailed,
    ErrorDbConnection,
    ErrorNoColumns,
    ErrorProcessing,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Upserted => "upserted",
            SyncOutcome::SkippedNoChange => "skipped_no_change",
            SyncOutcome::SkippedNotInsurance => "skipped_not_insurance",
            SyncOutcome::ErrorFetchFailed => "error_fetch_failed",
            SyncOutcome::ErrorDbConnection => "error_db_connection",
            SyncOutcome::ErrorNoColumns => "error_no_columns",
            SyncOutcome::ErrorProcessing => "error_processing",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            SyncOutcome::Upserted | SyncOutcome::SkippedNoChange | SyncOutcome::SkippedNotInsurance
        )
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to list cases: {0}")]
    List(#[from] PartnerError),

    #[error("failed to read table columns: {0}")]
    Columns(#[source] DatabaseError),
}

/// Mirrors partner cases into the store.
pub struct SyncEngine {
    partner: Arc<dyn PartnerApi>,
    store: Arc<dyn CaseStore>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(partner: Arc<dyn PartnerApi>, store: Arc<dyn CaseStore>, config: SyncConfig) -> Self {
        Self { partner, store, config }
    }

    /// One full pass over every listed case.
    pub async fn run_full(&self, guard: &SyncGuard) -> Result<SyncStats, SyncError> {
        let run_started = Utc::now();
        info!(run_id = %guard.run_id(), "Starting insurance case sync");

        let case_ids = self.partner.list_cases().await?;
        info!("Fetched {} cases from the partner API", case_ids.len());
        guard.set_total(case_ids.len());

        if case_ids.is_empty() {
            info!("No cases listed, nothing to sync");
            return Ok(guard.stats());
        }

        let columns = self.store.columns().await.map_err(SyncError::Columns)?;
        let columns = &columns;

        let total = case_ids.len();
        let progress_every = self.config.progress_every.max(1);
        let clock = Instant::now();
        info!("Processing {} cases with {} workers", total, self.config.max_workers);

        let mut outcomes = stream::iter(case_ids.iter().copied())
            .map(|case_id| async move { (case_id, self.process_case(case_id, run_started, columns).await) })
            .buffer_unordered(self.config.max_workers.max(1));

        let mut completed = 0usize;
        while let Some((case_id, outcome)) = outcomes.next().await {
            completed += 1;
            guard.record(outcome);
            debug!(case_id, outcome = %outcome, "Case processed");

            if completed % progress_every == 0 || completed == total {
                let elapsed = clock.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 { completed as f64 / elapsed } else { 0.0 };
                let eta = if rate > 0.0 { (total - completed) as f64 / rate } else { 0.0 };
                info!(
                    "Progress: {}/{} cases processed ({:.1} cases/sec, ETA: {:.0}s)",
                    completed, total, rate, eta
                );
            }
        }

        match self.store.reconcile_presence(&case_ids).await {
            Ok(changed) => info!("Presence flags updated on {} cases", changed),
            Err(e) => error!("Failed to update presence flags: {}", e),
        }

        let stats = guard.stats();
        info!(
            "Sync finished in {:.1}s. Upserted: {}, Skipped (no change): {}, Skipped (not insurance): {}, Errors: {}",
            clock.elapsed().as_secs_f64(),
            stats.upserted,
            stats.skipped_no_change,
            stats.skipped_not_insurance,
            stats.errors
        );
        Ok(stats)
    }

    /// Run the per-case pipeline for one id outside of a full run.
    pub async fn sync_single(&self, case_id: i64) -> SyncOutcome {
        let columns = match self.store.columns().await {
            Ok(columns) => columns,
            Err(e) => return store_failure(case_id, &e),
        };
        self.process_case(case_id, Utc::now(), &columns).await
    }

    pub async fn process_case(
        &self,
        case_id: i64,
        run_started: DateTime<Utc>,
        columns: &HashSet<String>,
    ) -> SyncOutcome {
        let payload = match self.fetch_with_retry(case_id).await {
            Some(payload) => payload,
            None => return SyncOutcome::ErrorFetchFailed,
        };

        if !is_insurance_case(&payload) {
            debug!(case_id, "Not an insurance case, skipping");
            return SyncOutcome::SkippedNotInsurance;
        }

        let hash = fingerprint(&payload);
        match self.store.stored_fingerprint(case_id).await {
            Ok(Some(stored)) if is_unchanged(&stored, &hash, &payload) => {
                debug!(case_id, "Payload unchanged, skipping");
                return SyncOutcome::SkippedNoChange;
            }
            Ok(_) => {}
            Err(e) => return store_failure(case_id, &e),
        }

        let mut row = map_case(case_id, &payload, &hash, run_started);
        let dropped = row.retain_known(columns);
        if row.is_empty() {
            warn!(case_id, "No known columns left to write");
            return SyncOutcome::ErrorNoColumns;
        }
        if !dropped.is_empty() {
            debug!(case_id, "{} fields not in table, skipped: {}", dropped.len(), dropped.join(", "));
        }

        match self.store.upsert(&row).await {
            Ok(()) => {
                debug!(case_id, columns = row.columns().len(), "Case upserted");
                SyncOutcome::Upserted
            }
            Err(e) => store_failure(case_id, &e),
        }
    }

    async fn fetch_with_retry(&self, case_id: i64) -> Option<Value> {
        let attempts = self.config.max_retries.max(1);
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);

        for attempt in 1..=attempts {
            match self.partner.fetch_case(case_id).await {
                Ok(payload) => {
                    if attempt > 1 {
                        info!(case_id, "Fetched on attempt {}", attempt);
                    }
                    return Some(payload);
                }
                Err(PartnerError::NotConfigured) => {
                    error!(case_id, "Partner API credentials are not configured");
                    return None;
                }
                Err(e) if attempt < attempts => {
                    let delay = retry_delay * attempt;
                    warn!(case_id, "Fetch failed (attempt {}/{}), retrying in {:?}: {}", attempt, attempts, delay, e);
                    sleep(delay).await;
                }
                Err(e) => {
                    warn!(case_id, "Fetch failed after {} attempts: {}", attempts, e);
                }
            }
        }
        None
    }
}

fn is_unchanged(stored: &StoredFingerprint, hash: &str, payload: &Value) -> bool {
    match (&stored.hash, &stored.payload) {
        (Some(stored_hash), _) => stored_hash == hash,
        (None, Some(stored_payload)) => canonical_json(stored_payload) == canonical_json(payload),
        (None, None) => false,
    }
}

fn store_failure(case_id: i64, err: &DatabaseError) -> SyncOutcome {
    if err.is_connection() {
        error!(case_id, "Database unavailable: {}", err);
        SyncOutcome::ErrorDbConnection
    } else {
        error!(case_id, "Failed to store case: {}", err);
        SyncOutcome::ErrorProcessing
    }
}
