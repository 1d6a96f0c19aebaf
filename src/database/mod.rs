pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use models::{CaseCsvRow, CaseRow, CaseValue, RepairCase};
pub use repository::{CaseRepository, REPAIR_CASES_TABLE};
pub use store::{CaseStore, PgCaseStore, StoredFingerprint};
