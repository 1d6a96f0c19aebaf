pub mod case_filter;
pub mod error;
pub mod filter_order;
pub mod types;

pub use case_filter::{CaseFilter, CaseListParams};
pub use error::FilterError;
pub use filter_order::SortField;
pub use types::*;
