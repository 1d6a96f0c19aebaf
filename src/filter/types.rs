#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` in any case sorts descending; everything else ascending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i32),
    BigInt(i64),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Statuses treated as closed when `showActiveOnly` is set. Compared lowercased.
pub const INACTIVE_STATUSES: &[&str] = &[
    "abgeschlossen",
    "geschlossen",
    "storniert",
    "abgelehnt",
    "cancelled",
    "closed",
    "completed",
    "rejected",
    "unsachgemäßer abbruch",
    "reparaturabbruch",
    "gerät entsorgen",
];

/// Sentinel the front end sends to mean "every insurance".
pub const ALL_INSURANCES: &str = "_ALL_INSURANCES_";

/// Insurer whose inactive cases are never shown.
pub const EXCLUDED_INSURANCE: &str = "wertgarantie";
