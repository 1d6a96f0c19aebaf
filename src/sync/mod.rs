pub mod engine;
pub mod mapping;
pub mod status;

pub use engine::{SyncEngine, SyncError, SyncOutcome};
pub use status::{SyncGuard, SyncStats, SyncStatus, SyncTracker};
