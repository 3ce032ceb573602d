//! Run controller: one end-to-end reconciliation over a batch.
//!
//! Data flows strictly downstream: snapshots → candidates → strategy scores →
//! combined confidence → serial assignment → optional semantic refinement →
//! classified matches. Inputs are never mutated; the caller persists the
//! result.

use std::collections::{HashMap, HashSet};

use crate::candidate;
use crate::classify::{classify, tally_matches};
use crate::combine::combine;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{
    Direction, Explanation, Invoice, InvoiceStatus, Match, MatchCandidate, Provenance, RunInput,
    RunResult, RunStats, StrategyKind,
};
use crate::normalize::normalize_name;
use crate::resolve::resolve;
use crate::semantic::{
    in_ambiguous_band, Disambiguator, InvoiceSummary, SemanticRequest, TransactionSummary,
};
use crate::strategy::{is_partial, score_candidate, ScoreContext};

pub fn run(
    config: &EngineConfig,
    input: &RunInput,
    disambiguator: Option<&dyn Disambiguator>,
) -> Result<RunResult, EngineError> {
    // A misconfigured run must not produce meaningless classifications.
    config.validate()?;

    let mut stats = RunStats::default();

    // Input hygiene: malformed records are skipped and counted, the run
    // continues. Debits are out of scope by contract, not malformed.
    let mut eligible_txns: Vec<usize> = Vec::new();
    for (i, txn) in input.transactions.iter().enumerate() {
        if txn.direction == Direction::Debit {
            stats.non_credit_transactions += 1;
            continue;
        }
        if txn.id.is_empty() || txn.currency.is_empty() || txn.amount_cents <= 0 {
            stats.skipped_transactions += 1;
            continue;
        }
        eligible_txns.push(i);
    }

    let invoices: Vec<Invoice> = input
        .invoices
        .iter()
        .filter(|inv| !inv.id.is_empty() && !inv.currency.is_empty() && inv.amount_cents > 0)
        .cloned()
        .collect();
    stats.skipped_invoices = input.invoices.len() - invoices.len();

    let associations: Vec<(String, String)> = input
        .associations
        .iter()
        .map(|a| {
            (
                normalize_name(&a.counterparty_pattern),
                normalize_name(&a.company),
            )
        })
        .collect();

    let mut denied: HashMap<&str, HashSet<String>> = HashMap::new();
    for pair in &input.denied_pairs {
        denied
            .entry(pair.transaction_id.as_str())
            .or_default()
            .insert(pair.invoice_id.clone());
    }
    let no_denials = HashSet::new();

    // Scoring pass. Per-transaction work is independent; running it in input
    // order keeps discovery order (the final tie-break) trivially stable.
    let mut pool: Vec<MatchCandidate> = Vec::new();
    let mut shortlist: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut discovery = 0usize;
    for &ti in &eligible_txns {
        let txn = &input.transactions[ti];
        let ctx = ScoreContext::for_transaction(txn, &associations, config);
        let denied_ids = denied.get(txn.id.as_str()).unwrap_or(&no_denials);

        for cand in candidate::generate(txn, &invoices, config, denied_ids) {
            let scores = score_candidate(&ctx, txn, &invoices, &cand);
            if !scores.iter().any(|s| s.fired) {
                continue;
            }
            let combined = combine(&scores, ctx.processor.is_some());
            if combined.confidence <= 0.0 {
                continue;
            }

            // Candidate invoices for a later semantic request, in discovery
            // (plausibility) order.
            let entry = shortlist.entry(ti).or_default();
            for &idx in &cand.invoice_idx {
                if !entry.contains(&idx) {
                    entry.push(idx);
                }
            }

            pool.push(MatchCandidate {
                txn_idx: ti,
                invoice_idx: cand.invoice_idx.clone(),
                scores,
                confidence: combined.confidence,
                dominant: combined.dominant,
                partial: is_partial(txn, &invoices, &cand, config),
                processor: ctx.processor,
                search_capped: cand.search_capped,
                discovery_order: discovery,
            });
            discovery += 1;
        }
    }

    // The one sequential barrier: a single ordered pass over the full pool.
    let accepted = resolve(pool, &invoices);

    // Semantic refinement (ambiguous band only) + classification.
    let mut matches: Vec<Match> = Vec::new();
    for cand in accepted {
        let txn = &input.transactions[cand.txn_idx];
        let mut confidence = cand.confidence;
        let mut dominant = cand.dominant;
        let mut provenance = Provenance::RuleBased;
        let mut rationale = None;

        if config.semantic.enabled && in_ambiguous_band(confidence, config) {
            if let Some(judge) = disambiguator {
                stats.semantic_calls += 1;
                let request = SemanticRequest {
                    transaction: TransactionSummary::from_transaction(txn),
                    candidates: shortlist
                        .get(&cand.txn_idx)
                        .map(Vec::as_slice)
                        .unwrap_or(&[])
                        .iter()
                        .take(config.semantic.max_candidates)
                        .map(|&i| InvoiceSummary::from_invoice(&invoices[i]))
                        .collect(),
                };
                match judge.disambiguate(&request) {
                    Ok(verdict) => {
                        let confirms = verdict.best_invoice_id.as_deref().is_some_and(|best| {
                            cand.invoice_idx.iter().any(|&i| invoices[i].id == best)
                        });
                        if confirms {
                            confidence = config.semantic.ai_confirmed_confidence;
                            dominant = StrategyKind::Semantic;
                            provenance = Provenance::AiConfirmed;
                            rationale = Some(verdict.rationale);
                        }
                        // A "none" or different-invoice verdict leaves the
                        // rule-based result in place; re-assignment after
                        // resolution could break at-most-once.
                    }
                    Err(_) => stats.semantic_failures += 1,
                }
            }
        }

        match classify(confidence, cand.partial, config) {
            Some(classification) => {
                let matched_cents: i64 = cand
                    .invoice_idx
                    .iter()
                    .map(|&i| invoices[i].amount_cents)
                    .sum();
                matches.push(Match {
                    transaction_id: txn.id.clone(),
                    invoice_ids: cand
                        .invoice_idx
                        .iter()
                        .map(|&i| invoices[i].id.clone())
                        .collect(),
                    matched_cents,
                    confidence,
                    strategy: dominant,
                    classification,
                    partial: cand.partial,
                    provenance,
                    explanation: Explanation {
                        signals: cand.scores.clone(),
                        processor: cand.processor.map(String::from),
                        search_capped: cand.search_capped,
                        rationale,
                    },
                });
            }
            None => stats.below_review += 1,
        }
    }

    tally_matches(&matches, &mut stats);

    let matched_txn_ids: HashSet<&str> = matches
        .iter()
        .map(|m| m.transaction_id.as_str())
        .collect();
    let matched_invoice_ids: HashSet<&str> = matches
        .iter()
        .flat_map(|m| m.invoice_ids.iter().map(String::as_str))
        .collect();

    let unmatched_transactions: Vec<String> = eligible_txns
        .iter()
        .map(|&i| &input.transactions[i])
        .filter(|txn| !matched_txn_ids.contains(txn.id.as_str()))
        .map(|txn| txn.id.clone())
        .collect();

    let unmatched_invoices: Vec<String> = invoices
        .iter()
        .filter(|inv| inv.status == InvoiceStatus::Open)
        .filter(|inv| !matched_invoice_ids.contains(inv.id.as_str()))
        .map(|inv| inv.id.clone())
        .collect();

    Ok(RunResult {
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        matches,
        unmatched_transactions,
        unmatched_invoices,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::model::Transaction;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn credit(id: &str, amount: i64, on: &str, desc: &str) -> Transaction {
        Transaction {
            id: id.into(),
            amount_cents: amount,
            currency: "USD".into(),
            date: date(on),
            description: desc.into(),
            counterparty: None,
            direction: Direction::Credit,
        }
    }

    fn open_invoice(id: &str, number: &str, company: &str, amount: i64, due: &str) -> Invoice {
        Invoice {
            id: id.into(),
            number: number.into(),
            company: company.into(),
            amount_cents: amount,
            currency: "USD".into(),
            due_date: date(due),
            status: InvoiceStatus::Open,
        }
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() {
        let input = RunInput {
            transactions: vec![
                credit("", 100_000, "2026-03-10", "payment"),
                credit("t1", 100_000, "2026-03-10", "payment INV-0001"),
            ],
            invoices: vec![
                open_invoice("i9", "INV-9", "Acme", 0, "2026-03-10"),
                open_invoice("i1", "INV-0001", "Acme", 100_000, "2026-03-09"),
            ],
            ..Default::default()
        };
        let result = run(&EngineConfig::default(), &input, None).unwrap();
        assert_eq!(result.stats.skipped_transactions, 1);
        assert_eq!(result.stats.skipped_invoices, 1);
        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn debits_do_not_participate() {
        let mut debit = credit("t1", -100_000, "2026-03-10", "outgoing");
        debit.direction = Direction::Debit;
        let input = RunInput {
            transactions: vec![debit],
            invoices: vec![open_invoice("i1", "INV-1", "Acme", 100_000, "2026-03-09")],
            ..Default::default()
        };
        let result = run(&EngineConfig::default(), &input, None).unwrap();
        assert!(result.matches.is_empty());
        assert_eq!(result.stats.non_credit_transactions, 1);
        // not listed as unmatched either — it never entered the run
        assert!(result.unmatched_transactions.is_empty());
    }

    #[test]
    fn invalid_config_fails_before_processing() {
        let mut config = EngineConfig::default();
        config.review_threshold = 99.0;
        let err = run(&config, &RunInput::default(), None).unwrap_err();
        assert!(matches!(err, EngineError::ConfigValidation(_)));
    }
}
