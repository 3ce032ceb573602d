//! Independent scoring strategies. Each emits a bounded sub-score and a
//! fired flag; nothing here decides a match on its own — that is the
//! combiner's job.

use crate::candidate::CandidateSet;
use crate::config::EngineConfig;
use crate::model::{Invoice, StrategyKind, StrategyScore, Transaction};
use crate::normalize::{name_similarity, normalize_name};
use crate::processor::{detect, strip_processor_tokens};

/// Per-transaction precomputed inputs shared by all candidate scorings.
#[derive(Debug)]
pub struct ScoreContext<'a> {
    pub config: &'a EngineConfig,
    /// Normalized counterparty with processor tokens removed. Falls back to
    /// the description when the bank feed omits the counterparty.
    pub norm_counterparty: String,
    pub norm_description: String,
    /// Uppercase alphanumeric-only description, for invoice-number scanning.
    pub desc_compact: String,
    pub processor: Option<&'static str>,
    /// Normalized (pattern, company) pairs from the caller's learned memory.
    pub associations: &'a [(String, String)],
}

impl<'a> ScoreContext<'a> {
    pub fn for_transaction(
        txn: &Transaction,
        associations: &'a [(String, String)],
        config: &'a EngineConfig,
    ) -> Self {
        let processor = detect(&txn.description);
        let norm_description = strip_processor_tokens(&normalize_name(&txn.description));
        let norm_counterparty = match txn.counterparty.as_deref() {
            Some(name) if !name.trim().is_empty() => {
                strip_processor_tokens(&normalize_name(name))
            }
            _ => norm_description.clone(),
        };
        Self {
            config,
            norm_counterparty,
            norm_description,
            desc_compact: compact_upper(&txn.description),
            processor,
            associations,
        }
    }
}

/// Score one candidate set. Output order is fixed:
/// invoice-number, exact-amount, fuzzy-name, date-proximity, multi-invoice.
pub fn score_candidate(
    ctx: &ScoreContext<'_>,
    txn: &Transaction,
    invoices: &[Invoice],
    cand: &CandidateSet,
) -> Vec<StrategyScore> {
    let members: Vec<&Invoice> = cand.invoice_idx.iter().map(|&i| &invoices[i]).collect();

    let number = score_invoice_number(ctx, &members);
    let amount = score_exact_amount(ctx, txn, &members);
    let fuzzy = score_fuzzy_name(ctx, &members);
    let date = score_date_proximity(ctx, txn, &members);
    let multi = score_multi_invoice(&members, &fuzzy, ctx);

    vec![number, amount, fuzzy, date, multi]
}

/// Amount difference past the tolerance marks a partial (fee-variance)
/// candidate. Only meaningful for single-invoice sets; subsets are generated
/// within tolerance by construction.
pub fn is_partial(
    txn: &Transaction,
    invoices: &[Invoice],
    cand: &CandidateSet,
    config: &EngineConfig,
) -> bool {
    if cand.invoice_idx.len() != 1 {
        return false;
    }
    let inv = &invoices[cand.invoice_idx[0]];
    (txn.amount_cents.abs() - inv.amount_cents).abs() > config.amount_tolerance_cents
}

// ---------------------------------------------------------------------------
// Individual scorers
// ---------------------------------------------------------------------------

/// Near-certain when the invoice number (or its digit core) appears in the
/// description. Multi-invoice sets fire only when every member is present —
/// anything less is not an unambiguous identification.
fn score_invoice_number(ctx: &ScoreContext<'_>, members: &[&Invoice]) -> StrategyScore {
    let mut worst: f64 = 100.0;
    let mut all_found = !members.is_empty();
    for inv in members {
        let full = compact_upper(&inv.number);
        let hit = if full.len() >= 4 && ctx.desc_compact.contains(&full) {
            Some(100.0)
        } else {
            let digits: String = inv.number.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() >= 4 && ctx.desc_compact.contains(&digits) {
                Some(85.0)
            } else {
                None
            }
        };
        match hit {
            Some(score) => worst = worst.min(score),
            None => all_found = false,
        }
    }
    StrategyScore {
        strategy: StrategyKind::InvoiceNumber,
        score: if all_found { worst } else { 0.0 },
        fired: all_found,
    }
}

/// Graduated amount tiers: exact within tolerance, then percent bands that
/// absorb processor fees. Zero past the fee-variance limit.
fn score_exact_amount(
    ctx: &ScoreContext<'_>,
    txn: &Transaction,
    members: &[&Invoice],
) -> StrategyScore {
    let mut score = 0.0;
    if let [inv] = members {
        let diff = (txn.amount_cents.abs() - inv.amount_cents).abs();
        if diff <= ctx.config.amount_tolerance_cents {
            score = 100.0;
        } else if inv.amount_cents > 0 {
            let pct = diff as f64 / inv.amount_cents as f64 * 100.0;
            score = if pct < 1.0 {
                95.0
            } else if pct < 2.0 {
                85.0
            } else if pct < 5.0 {
                70.0
            } else if pct < 10.0 {
                50.0
            } else {
                0.0
            };
        }
    }
    StrategyScore {
        strategy: StrategyKind::ExactAmount,
        score,
        fired: score > 0.0,
    }
}

/// Name similarity between the counterparty (or description) and the
/// candidate company. A learned association hit is a full-score match.
fn score_fuzzy_name(ctx: &ScoreContext<'_>, members: &[&Invoice]) -> StrategyScore {
    let company = members.first().map(|inv| inv.company.as_str()).unwrap_or("");
    let norm_company = normalize_name(company);

    let mut score = 0.0f64;
    for (pattern, assoc_company) in ctx.associations {
        if assoc_company == &norm_company
            && !pattern.is_empty()
            && (ctx.norm_counterparty.contains(pattern.as_str())
                || ctx.norm_description.contains(pattern.as_str()))
        {
            score = 100.0;
            break;
        }
    }
    if score < 100.0 {
        let from_counterparty = name_similarity(&ctx.norm_counterparty, &norm_company);
        let from_description = name_similarity(&ctx.norm_description, &norm_company);
        score = score.max(from_counterparty.max(from_description));
    }

    StrategyScore {
        strategy: StrategyKind::FuzzyName,
        score,
        fired: score >= ctx.config.fuzzy_threshold,
    }
}

/// Inverse-distance inside the date window, zero at and beyond the edge.
fn score_date_proximity(
    ctx: &ScoreContext<'_>,
    txn: &Transaction,
    members: &[&Invoice],
) -> StrategyScore {
    let range = i64::from(ctx.config.date_range_days);
    let closest = members
        .iter()
        .map(|inv| (txn.date - inv.due_date).num_days().abs())
        .min();
    let score = match closest {
        Some(dist) if range == 0 && dist == 0 => 100.0,
        Some(dist) if dist < range => (range - dist) as f64 / range as f64 * 100.0,
        _ => 0.0,
    };
    StrategyScore {
        strategy: StrategyKind::DateProximity,
        score,
        fired: score > 0.0,
    }
}

/// Subset sums already hold within tolerance by construction; the score
/// depends on whether the company also matches the counterparty.
fn score_multi_invoice(
    members: &[&Invoice],
    fuzzy: &StrategyScore,
    ctx: &ScoreContext<'_>,
) -> StrategyScore {
    let fired = members.len() >= 2;
    let score = if !fired {
        0.0
    } else if fuzzy.score >= ctx.config.fuzzy_threshold {
        100.0
    } else {
        60.0
    };
    StrategyScore {
        strategy: StrategyKind::MultiInvoice,
        score,
        fired,
    }
}

fn compact_upper(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
