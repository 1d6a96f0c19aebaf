pub mod case_row;
pub mod repair_case;

pub use case_row::{CaseRow, CaseValue};
pub use repair_case::{CaseCsvRow, RepairCase};
