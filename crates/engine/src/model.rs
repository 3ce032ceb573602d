use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

/// A bank transaction as supplied by the caller. Immutable for the run.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    /// Signed minor units (cents). Credits are positive.
    pub amount_cents: i64,
    pub currency: String,
    pub date: NaiveDate,
    pub description: String,
    /// Counterparty name from the bank feed. Often absent or garbled.
    pub counterparty: Option<String>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Void,
}

/// An invoice snapshot from the system of record. Immutable for the run.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub company: String,
    pub amount_cents: i64,
    pub currency: String,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

/// A learned counterparty→company pairing, supplied by the caller.
/// A hit scores like a confirmed name match.
#[derive(Debug, Clone)]
pub struct Association {
    /// Normalized-name fragment expected in the transaction side.
    pub counterparty_pattern: String,
    pub company: String,
}

/// A transaction–invoice pairing a human rejected. Never suggested again.
#[derive(Debug, Clone)]
pub struct DeniedPair {
    pub transaction_id: String,
    pub invoice_id: String,
}

/// One batch of caller-supplied snapshots. The engine holds no other state.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub transactions: Vec<Transaction>,
    pub invoices: Vec<Invoice>,
    pub associations: Vec<Association>,
    pub denied_pairs: Vec<DeniedPair>,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    InvoiceNumber,
    ExactAmount,
    FuzzyName,
    DateProximity,
    MultiInvoice,
    Semantic,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvoiceNumber => write!(f, "invoice_number"),
            Self::ExactAmount => write!(f, "exact_amount"),
            Self::FuzzyName => write!(f, "fuzzy_name"),
            Self::DateProximity => write!(f, "date_proximity"),
            Self::MultiInvoice => write!(f, "multi_invoice"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

/// One strategy's bounded sub-score for a candidate, 0..=100.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StrategyScore {
    pub strategy: StrategyKind,
    pub score: f64,
    pub fired: bool,
}

/// A (transaction, invoice subset) pairing under evaluation.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub txn_idx: usize,
    /// Indices into the eligible-invoice slice, discovery order preserved.
    pub invoice_idx: Vec<usize>,
    pub scores: Vec<StrategyScore>,
    pub confidence: f64,
    pub dominant: StrategyKind,
    /// Amount off by more than the tolerance but inside the fee-variance band.
    pub partial: bool,
    pub processor: Option<&'static str>,
    /// Set when the subset search gave up before exhausting the space.
    pub search_capped: bool,
    pub discovery_order: usize,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    AutoApproved,
    NeedsReview,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoApproved => write!(f, "auto_approved"),
            Self::NeedsReview => write!(f, "needs_review"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    RuleBased,
    AiConfirmed,
}

/// Which signals fired and anything the semantic step added.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub signals: Vec<StrategyScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    /// The subset-sum search hit a cap while this candidate was built; the
    /// pairing is plausible but the enumeration around it was not exhaustive.
    pub search_capped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// One emitted match. A transaction appears in at most one of these per run,
/// and so does every invoice id.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub transaction_id: String,
    pub invoice_ids: Vec<String>,
    /// Sum of the matched invoices' amounts, minor units.
    pub matched_cents: i64,
    pub confidence: f64,
    pub strategy: StrategyKind,
    pub classification: Classification,
    pub partial: bool,
    pub provenance: Provenance,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub auto_approved: usize,
    pub needs_review: usize,
    /// Best candidate existed but scored under the review threshold.
    pub below_review: usize,
    pub rule_based: usize,
    pub ai_confirmed: usize,
    pub total_matched_cents: i64,
    pub skipped_transactions: usize,
    pub skipped_invoices: usize,
    pub non_credit_transactions: usize,
    pub semantic_calls: usize,
    pub semantic_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub engine_version: String,
    pub matches: Vec<Match>,
    pub unmatched_transactions: Vec<String>,
    pub unmatched_invoices: Vec<String>,
    pub stats: RunStats,
}
