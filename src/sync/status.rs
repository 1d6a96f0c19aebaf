use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::engine::SyncOutcome;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SyncStats {
    pub total_cases: usize,
    pub processed: usize,
    pub upserted: usize,
    pub skipped_no_change: usize,
    pub skipped_not_insurance: usize,
    pub errors: usize,
}

impl SyncStats {
    pub fn record(&mut self, outcome: SyncOutcome) {
        self.processed += 1;
        match outcome {
            SyncOutcome::Upserted => self.upserted += 1,
            SyncOutcome::SkippedNoChange => self.skipped_no_change += 1,
            SyncOutcome::SkippedNotInsurance => self.skipped_not_insurance += 1,
            _ => self.errors += 1,
        }
    }
}

/// Snapshot served by `GET /routes/sync-status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub is_running: bool,
    pub run_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<f64>,
    pub stats: SyncStats,
}

#[derive(Debug, Default)]
struct RunState {
    run_id: Option<Uuid>,
    start_time: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    stats: SyncStats,
}

/// Process-wide single-flight guard and progress record for full syncs.
#[derive(Debug, Default)]
pub struct SyncTracker {
    running: AtomicBool,
    state: Mutex<RunState>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the sync slot. `None` when another run holds it.
    pub fn try_begin(self: &Arc<Self>) -> Option<SyncGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let run_id = Uuid::new_v4();
        {
            let mut state = self.lock();
            *state = RunState {
                run_id: Some(run_id),
                start_time: Some(Utc::now()),
                finished_at: None,
                stats: SyncStats::default(),
            };
        }

        Some(SyncGuard {
            tracker: Arc::clone(self),
            run_id,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SyncStatus {
        let is_running = self.is_running();
        let state = self.lock();
        let end = if is_running { Some(Utc::now()) } else { state.finished_at };
        let elapsed_seconds = match (state.start_time, end) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        };

        SyncStatus {
            is_running,
            run_id: state.run_id,
            start_time: state.start_time,
            finished_at: state.finished_at,
            elapsed_seconds,
            stats: state.stats.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // A panic while holding the lock leaves plain counters behind; keep serving them.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held for the lifetime of one full run. Dropping it releases the slot.
#[derive(Debug)]
pub struct SyncGuard {
    tracker: Arc<SyncTracker>,
    run_id: Uuid,
}

impl SyncGuard {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn set_total(&self, total: usize) {
        self.tracker.lock().stats.total_cases = total;
    }

    pub fn record(&self, outcome: SyncOutcome) {
        self.tracker.lock().stats.record(outcome);
    }

    pub fn stats(&self) -> SyncStats {
        self.tracker.lock().stats.clone()
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.tracker.lock().finished_at = Some(Utc::now());
        self.tracker.running.store(false, Ordering::Release);
    }
}
