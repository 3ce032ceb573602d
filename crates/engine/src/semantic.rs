//! Semantic disambiguation seam.
//!
//! The engine only knows this trait; the HTTP implementation lives in its own
//! crate so the core stays testable with no network dependency. A failing or
//! absent disambiguator never fails a run — candidates keep their rule-based
//! confidence.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::{Invoice, Transaction};

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub date: NaiveDate,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
}

impl TransactionSummary {
    pub fn from_transaction(txn: &Transaction) -> Self {
        Self {
            id: txn.id.clone(),
            amount_cents: txn.amount_cents,
            currency: txn.currency.clone(),
            date: txn.date,
            description: txn.description.clone(),
            counterparty: txn.counterparty.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub id: String,
    pub number: String,
    pub company: String,
    pub amount_cents: i64,
    pub currency: String,
    pub due_date: NaiveDate,
}

impl InvoiceSummary {
    pub fn from_invoice(inv: &Invoice) -> Self {
        Self {
            id: inv.id.clone(),
            number: inv.number.clone(),
            company: inv.company.clone(),
            amount_cents: inv.amount_cents,
            currency: inv.currency.clone(),
            due_date: inv.due_date,
        }
    }
}

/// One bounded request: the transaction plus at most
/// `semantic.max_candidates` invoice summaries.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticRequest {
    pub transaction: TransactionSummary,
    pub candidates: Vec<InvoiceSummary>,
}

/// The service's judgment. `best_invoice_id = None` means "none of these".
#[derive(Debug, Clone, Deserialize)]
pub struct SemanticVerdict {
    pub best_invoice_id: Option<String>,
    pub rationale: String,
}

/// Any failure of the external call, already flattened — the engine treats
/// every variant identically (keep the rule-based result, count the failure).
#[derive(Debug)]
pub struct DisambiguationError(pub String);

impl std::fmt::Display for DisambiguationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "disambiguation failed: {}", self.0)
    }
}

impl std::error::Error for DisambiguationError {}

pub trait Disambiguator {
    fn disambiguate(&self, request: &SemanticRequest)
        -> Result<SemanticVerdict, DisambiguationError>;
}

/// The ambiguous band: at or above review, strictly below auto-approve.
pub fn in_ambiguous_band(confidence: f64, config: &EngineConfig) -> bool {
    confidence >= config.review_threshold && confidence < config.auto_approve_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges() {
        let config = EngineConfig::default(); // 95 / 70
        assert!(!in_ambiguous_band(69.9, &config));
        assert!(in_ambiguous_band(70.0, &config));
        assert!(in_ambiguous_band(94.9, &config));
        assert!(!in_ambiguous_band(95.0, &config));
    }

    #[test]
    fn verdict_parses_from_service_json() {
        let verdict: SemanticVerdict =
            serde_json::from_str(r#"{"best_invoice_id": "inv_7", "rationale": "amount and payer align"}"#)
                .unwrap();
        assert_eq!(verdict.best_invoice_id.as_deref(), Some("inv_7"));

        let none: SemanticVerdict =
            serde_json::from_str(r#"{"best_invoice_id": null, "rationale": "no plausible invoice"}"#)
                .unwrap();
        assert!(none.best_invoice_id.is_none());
    }
}
