//! Global assignment resolution.
//!
//! Candidates from different transactions can compete for the same invoice.
//! A single ordered pass consumes them greedily, highest confidence first —
//! deterministic and terminating, at the cost of global optimality.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::{Invoice, MatchCandidate};

/// Accept candidates highest-confidence-first, skipping any whose transaction
/// or invoices are already consumed. Ties break toward the simpler
/// explanation: fewer invoices, then the more recently due invoice, then
/// discovery order.
pub fn resolve(mut candidates: Vec<MatchCandidate>, invoices: &[Invoice]) -> Vec<MatchCandidate> {
    let newest_due = |cand: &MatchCandidate| -> NaiveDate {
        cand.invoice_idx
            .iter()
            .map(|&i| invoices[i].due_date)
            .max()
            .unwrap_or(NaiveDate::MIN)
    };

    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.invoice_idx.len().cmp(&b.invoice_idx.len()))
            .then_with(|| newest_due(b).cmp(&newest_due(a)))
            .then_with(|| a.discovery_order.cmp(&b.discovery_order))
    });

    let mut txn_used: HashSet<usize> = HashSet::new();
    let mut invoice_used: HashSet<usize> = HashSet::new();
    let mut accepted = Vec::new();

    for cand in candidates {
        if txn_used.contains(&cand.txn_idx)
            || cand.invoice_idx.iter().any(|i| invoice_used.contains(i))
        {
            continue;
        }
        // The consumption check above makes double assignment impossible;
        // tripping either assert is an engine defect, not a data problem.
        let fresh_txn = txn_used.insert(cand.txn_idx);
        debug_assert!(fresh_txn, "transaction assigned twice");
        for &i in &cand.invoice_idx {
            let fresh_invoice = invoice_used.insert(i);
            debug_assert!(fresh_invoice, "invoice assigned twice");
        }
        accepted.push(cand);
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::model::{InvoiceStatus, StrategyKind};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn invoice(id: &str, due: &str) -> Invoice {
        Invoice {
            id: id.into(),
            number: format!("INV-{id}"),
            company: "Acme".into(),
            amount_cents: 100_000,
            currency: "USD".into(),
            due_date: date(due),
            status: InvoiceStatus::Open,
        }
    }

    fn cand(txn_idx: usize, invoice_idx: Vec<usize>, confidence: f64, order: usize) -> MatchCandidate {
        MatchCandidate {
            txn_idx,
            invoice_idx,
            scores: Vec::new(),
            confidence,
            dominant: StrategyKind::ExactAmount,
            partial: false,
            processor: None,
            search_capped: false,
            discovery_order: order,
        }
    }

    #[test]
    fn higher_confidence_wins_contested_invoice() {
        let invoices = vec![invoice("i1", "2026-03-08")];
        let accepted = resolve(
            vec![cand(0, vec![0], 80.0, 0), cand(1, vec![0], 95.0, 1)],
            &invoices,
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].txn_idx, 1);
    }

    #[test]
    fn transaction_never_split_across_matches() {
        let invoices = vec![invoice("i1", "2026-03-08"), invoice("i2", "2026-03-09")];
        let accepted = resolve(
            vec![cand(0, vec![0], 90.0, 0), cand(0, vec![1], 85.0, 1)],
            &invoices,
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].invoice_idx, vec![0]);
    }

    #[test]
    fn tie_prefers_fewer_invoices() {
        let invoices = vec![
            invoice("i1", "2026-03-08"),
            invoice("i2", "2026-03-08"),
            invoice("i3", "2026-03-08"),
        ];
        let accepted = resolve(
            vec![cand(0, vec![1, 2], 90.0, 0), cand(0, vec![0], 90.0, 1)],
            &invoices,
        );
        assert_eq!(accepted[0].invoice_idx, vec![0]);
    }

    #[test]
    fn tie_prefers_more_recent_due_date() {
        let invoices = vec![invoice("i1", "2026-03-01"), invoice("i2", "2026-03-09")];
        let accepted = resolve(
            vec![cand(0, vec![0], 90.0, 0), cand(0, vec![1], 90.0, 1)],
            &invoices,
        );
        assert_eq!(accepted[0].invoice_idx, vec![1]);
    }

    #[test]
    fn final_tie_falls_to_discovery_order() {
        let invoices = vec![invoice("i1", "2026-03-08"), invoice("i2", "2026-03-08")];
        let accepted = resolve(
            vec![cand(0, vec![1], 90.0, 1), cand(0, vec![0], 90.0, 0)],
            &invoices,
        );
        assert_eq!(accepted[0].invoice_idx, vec![0]);
    }

    #[test]
    fn loser_falls_through_to_next_candidate() {
        // txn 1 loses invoice 0 to txn 0, but its second candidate still lands.
        let invoices = vec![invoice("i1", "2026-03-08"), invoice("i2", "2026-03-09")];
        let accepted = resolve(
            vec![
                cand(0, vec![0], 95.0, 0),
                cand(1, vec![0], 90.0, 1),
                cand(1, vec![1], 75.0, 2),
            ],
            &invoices,
        );
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].txn_idx, 0);
        assert_eq!(accepted[1].txn_idx, 1);
        assert_eq!(accepted[1].invoice_idx, vec![1]);
    }

    #[test]
    fn overlapping_subsets_consume_at_most_once() {
        let invoices = vec![
            invoice("i1", "2026-03-08"),
            invoice("i2", "2026-03-08"),
            invoice("i3", "2026-03-09"),
        ];
        let accepted = resolve(
            vec![cand(0, vec![0, 1], 92.0, 0), cand(1, vec![1, 2], 88.0, 1)],
            &invoices,
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].txn_idx, 0);
    }
}
