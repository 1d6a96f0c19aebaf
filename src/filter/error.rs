use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("page must be 1 or greater")]
    InvalidPage,

    #[error("limit must be between 1 and {max}")]
    InvalidLimit { max: i64 },

    #[error("timeRangeMonths must be 0 or greater")]
    InvalidTimeRange,
}

impl FilterError {
    /// Query parameter the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidPage => "page",
            FilterError::InvalidLimit { .. } => "limit",
            FilterError::InvalidTimeRange => "timeRangeMonths",
        }
    }
}
