//! Candidate generation: cheap filters that narrow the invoice universe
//! before any scoring happens.

use std::collections::{BTreeMap, HashSet};

use crate::config::EngineConfig;
use crate::model::{Invoice, InvoiceStatus, Transaction};
use crate::subset::find_subsets;

/// Near-miss band for single-invoice candidates, in percent of the invoice
/// amount. Differences past the configured tolerance but inside this band are
/// plausible fee variance and surface as partial matches.
pub const FEE_VARIANCE_LIMIT_PCT: f64 = 10.0;

/// One invoice subset worth scoring against a transaction.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    /// Indices into the caller's invoice slice.
    pub invoice_idx: Vec<usize>,
    /// The subset-sum search was cut short; the set is plausible but the
    /// enumeration around it was not exhaustive.
    pub search_capped: bool,
}

/// Invoices eligible for this transaction at all: open, same currency,
/// due date inside the window, pairing not denied.
pub fn eligible_window(
    txn: &Transaction,
    invoices: &[Invoice],
    config: &EngineConfig,
    denied_invoice_ids: &HashSet<String>,
) -> Vec<usize> {
    invoices
        .iter()
        .enumerate()
        .filter(|(_, inv)| inv.status == InvoiceStatus::Open)
        .filter(|(_, inv)| inv.currency == txn.currency)
        .filter(|(_, inv)| {
            let days = (txn.date - inv.due_date).num_days().unsigned_abs();
            days <= u64::from(config.date_range_days)
        })
        .filter(|(_, inv)| !denied_invoice_ids.contains(&inv.id))
        .map(|(i, _)| i)
        .collect()
}

/// Ordered candidate sets for one transaction, most plausible first.
/// An empty result means the transaction goes unmatched; that is a report,
/// not an error.
pub fn generate(
    txn: &Transaction,
    invoices: &[Invoice],
    config: &EngineConfig,
    denied_invoice_ids: &HashSet<String>,
) -> Vec<CandidateSet> {
    let windowed = eligible_window(txn, invoices, config, denied_invoice_ids);
    let target = txn.amount_cents.abs();

    // Single-invoice candidates: exact within tolerance, or near-miss inside
    // the fee-variance band.
    let mut singles: Vec<(usize, i64)> = Vec::new();
    for &idx in &windowed {
        let inv = &invoices[idx];
        let diff = (target - inv.amount_cents).abs();
        if diff <= config.amount_tolerance_cents {
            singles.push((idx, diff));
        } else if inv.amount_cents > 0 {
            let diff_pct = diff as f64 / inv.amount_cents as f64 * 100.0;
            if diff_pct < FEE_VARIANCE_LIMIT_PCT {
                singles.push((idx, diff));
            }
        }
    }
    singles.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| invoices[b.0].due_date.cmp(&invoices[a.0].due_date))
            .then_with(|| invoices[a.0].id.cmp(&invoices[b.0].id))
    });

    let mut candidates: Vec<CandidateSet> = singles
        .into_iter()
        .map(|(idx, _)| CandidateSet {
            invoice_idx: vec![idx],
            search_capped: false,
        })
        .collect();

    // Multi-invoice candidates: per-company subset sums. Grouping by company
    // keeps the search space small; cross-company subsets are not a payment
    // pattern worth the blowup.
    if config.max_subset_size >= 2 {
        let mut by_company: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for &idx in &windowed {
            by_company
                .entry(invoices[idx].company.as_str())
                .or_default()
                .push(idx);
        }

        for group in by_company.values() {
            if group.len() < 2 {
                continue;
            }
            let amounts: Vec<i64> = group.iter().map(|&i| invoices[i].amount_cents).collect();
            let search = find_subsets(
                &amounts,
                target,
                config.amount_tolerance_cents,
                config.max_subset_size,
                config.subset_max_nodes,
            );
            for subset in &search.subsets {
                candidates.push(CandidateSet {
                    invoice_idx: subset.iter().map(|&i| group[i]).collect(),
                    search_capped: search.cap_hit,
                });
            }
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    use crate::model::Direction;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn txn(amount: i64, on: &str) -> Transaction {
        Transaction {
            id: "t1".into(),
            amount_cents: amount,
            currency: "USD".into(),
            date: date(on),
            description: "payment".into(),
            counterparty: None,
            direction: Direction::Credit,
        }
    }

    fn invoice(id: &str, company: &str, amount: i64, due: &str) -> Invoice {
        Invoice {
            id: id.into(),
            number: format!("INV-{id}"),
            company: company.into(),
            amount_cents: amount,
            currency: "USD".into(),
            due_date: date(due),
            status: InvoiceStatus::Open,
        }
    }

    #[test]
    fn window_filters_date_currency_status() {
        let t = txn(100_000, "2026-03-10");
        let mut far = invoice("i2", "Acme", 100_000, "2026-02-01");
        far.status = InvoiceStatus::Open;
        let mut paid = invoice("i3", "Acme", 100_000, "2026-03-09");
        paid.status = InvoiceStatus::Paid;
        let mut cad = invoice("i4", "Acme", 100_000, "2026-03-09");
        cad.currency = "CAD".into();
        let invoices = vec![
            invoice("i1", "Acme", 100_000, "2026-03-08"),
            far,
            paid,
            cad,
        ];
        let config = EngineConfig::default();
        let idx = eligible_window(&t, &invoices, &config, &HashSet::new());
        assert_eq!(idx, vec![0]);
    }

    #[test]
    fn denied_pair_is_never_generated() {
        let t = txn(100_000, "2026-03-10");
        let invoices = vec![invoice("i1", "Acme", 100_000, "2026-03-08")];
        let config = EngineConfig::default();
        let denied: HashSet<String> = ["i1".to_string()].into();
        assert!(generate(&t, &invoices, &config, &denied).is_empty());
    }

    #[test]
    fn exact_single_before_near_miss() {
        let t = txn(100_000, "2026-03-10");
        let invoices = vec![
            invoice("i1", "Acme", 98_000, "2026-03-08"), // 2% off
            invoice("i2", "Acme", 100_000, "2026-03-08"), // exact
        ];
        let config = EngineConfig::default();
        let cands = generate(&t, &invoices, &config, &HashSet::new());
        assert_eq!(cands[0].invoice_idx, vec![1]);
        assert_eq!(cands[1].invoice_idx, vec![0]);
    }

    #[test]
    fn near_miss_outside_band_dropped() {
        let t = txn(100_000, "2026-03-10");
        let invoices = vec![invoice("i1", "Acme", 80_000, "2026-03-08")]; // 25% off
        let config = EngineConfig::default();
        assert!(generate(&t, &invoices, &config, &HashSet::new()).is_empty());
    }

    #[test]
    fn multi_invoice_subset_same_company() {
        let t = txn(718_900, "2026-03-10");
        let invoices = vec![
            invoice("i1", "Acme", 418_900, "2026-03-08"),
            invoice("i2", "Acme", 300_000, "2026-03-12"),
            invoice("i3", "Other", 300_000, "2026-03-12"),
        ];
        let config = EngineConfig::default();
        let cands = generate(&t, &invoices, &config, &HashSet::new());
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].invoice_idx, vec![0, 1]);
    }

    #[test]
    fn no_cross_company_subsets() {
        let t = txn(718_900, "2026-03-10");
        let invoices = vec![
            invoice("i1", "Acme", 418_900, "2026-03-08"),
            invoice("i2", "Other", 300_000, "2026-03-12"),
        ];
        let config = EngineConfig::default();
        // 418_900 alone is >10% off, 300_000 alone is way off, and the pair
        // spans two companies.
        assert!(generate(&t, &invoices, &config, &HashSet::new()).is_empty());
    }

    #[test]
    fn subset_size_one_config_disables_multi() {
        let t = txn(718_900, "2026-03-10");
        let invoices = vec![
            invoice("i1", "Acme", 418_900, "2026-03-08"),
            invoice("i2", "Acme", 300_000, "2026-03-12"),
        ];
        let mut config = EngineConfig::default();
        config.max_subset_size = 1;
        assert!(generate(&t, &invoices, &config, &HashSet::new()).is_empty());
    }
}
