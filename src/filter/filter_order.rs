use super::types::SortDirection;

/// Columns the case list may be ordered by. Anything else falls back to `LastApiUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CaseId,
    CaseNumber,
    CustomerName,
    ProductName,
    Status,
    InsuranceName,
    LastApiUpdate,
    InsuranceContractNumber,
}

impl SortField {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("caseId") => SortField::CaseId,
            Some("caseNumber") => SortField::CaseNumber,
            Some("customerName") => SortField::CustomerName,
            Some("productName") => SortField::ProductName,
            Some("status") => SortField::Status,
            Some("insuranceName") => SortField::InsuranceName,
            Some("insuranceContractNumber") => SortField::InsuranceContractNumber,
            _ => SortField::LastApiUpdate,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CaseId => "case_id",
            SortField::CaseNumber => "case_number",
            SortField::CustomerName => "customer_name",
            SortField::ProductName => "product_name",
            SortField::Status => "status",
            SortField::InsuranceName => "insurance_name",
            SortField::LastApiUpdate => "last_api_update",
            SortField::InsuranceContractNumber => "insurance_contract_number",
        }
    }
}

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(field: SortField, direction: SortDirection) -> String {
        format!("ORDER BY \"{}\" {}", field.column(), direction.to_sql())
    }
}
