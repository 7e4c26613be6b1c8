//! Import outcome types and their JSON response shapes

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{ImportError, RowRejection};

/// A row that failed to normalize, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based row in the uploaded sheet
    pub row_index: usize,
    /// Rejection kind, e.g. `UnparseableDate`
    pub reason: String,
    pub detail: String,
}

impl RejectedRow {
    pub fn new(row_index: usize, rejection: &RowRejection) -> Self {
        Self {
            row_index,
            reason: rejection.kind().to_string(),
            detail: rejection.to_string(),
        }
    }
}

/// Aggregate summary of one statement import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub accepted_count: usize,
    pub total_withdrawals: Decimal,
    pub total_deposits: Decimal,
    /// Deposits minus withdrawals
    pub net: Decimal,
    pub rejected_rows: Vec<RejectedRow>,
    /// Identities assigned by the store; empty for a dry run
    pub transaction_ids: Vec<i64>,
}

impl ImportResult {
    pub fn response(&self) -> ImportResponse {
        ImportResponse {
            success: true,
            count: self.accepted_count,
            total_withdrawals: format!("{:.2}", self.total_withdrawals),
            total_deposits: format!("{:.2}", self.total_deposits),
            net: format!("{:.2}", self.net),
            rejected_rows: self.rejected_rows.clone(),
        }
    }
}

/// Wire shape returned to callers for a completed import
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub count: usize,
    pub total_withdrawals: String,
    pub total_deposits: String,
    pub net: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_rows: Vec<RejectedRow>,
}

/// Wire shape returned to callers for a fatal import error
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub kind: String,
    pub detail: String,
}

impl From<&ImportError> for ErrorResponse {
    fn from(err: &ImportError) -> Self {
        Self {
            success: false,
            kind: err.kind().to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_response_shape() {
        let result = ImportResult {
            accepted_count: 2,
            total_withdrawals: dec!(4.5),
            total_deposits: dec!(2000),
            net: dec!(1995.5),
            rejected_rows: vec![],
            transaction_ids: vec![1, 2],
        };
        let json = serde_json::to_value(result.response()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        assert_eq!(json["total_withdrawals"], "4.50");
        assert_eq!(json["total_deposits"], "2000.00");
        assert_eq!(json["net"], "1995.50");
        assert!(json.get("rejected_rows").is_none());
    }

    #[test]
    fn test_response_lists_rejections() {
        let result = ImportResult {
            accepted_count: 0,
            total_withdrawals: Decimal::ZERO,
            total_deposits: Decimal::ZERO,
            net: Decimal::ZERO,
            rejected_rows: vec![RejectedRow::new(
                4,
                &RowRejection::UnparseableDate("31/13/2024".into()),
            )],
            transaction_ids: vec![],
        };
        let json = serde_json::to_value(result.response()).unwrap();
        assert_eq!(json["rejected_rows"][0]["row_index"], 4);
        assert_eq!(json["rejected_rows"][0]["reason"], "UnparseableDate");
    }

    #[test]
    fn test_error_response() {
        let err = ImportError::UnreadableFile("bad zip".into());
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "UnreadableFile");
    }
}
