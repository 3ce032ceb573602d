//! Weighted, capped score combination.
//!
//! Not a plain sum: agreeing strong signals saturate at 100 instead of
//! stacking past it, and an unambiguous invoice-number identification
//! dominates — conflicting signals dent its confidence but never override it.

use crate::model::{StrategyKind, StrategyScore};

#[derive(Debug, Clone, Copy)]
pub struct Combined {
    pub confidence: f64,
    pub dominant: StrategyKind,
}

/// Weights for the generic path. Exact-amount and subset-sum are correlated
/// (a subset is an amount match by construction), so a candidate gets one or
/// the other, never both.
const W_AMOUNT: f64 = 0.40;
const W_NAME: f64 = 0.35;
const W_DATE: f64 = 0.15;
const W_MULTI: f64 = 0.50;

/// Flat bonus when a known payment processor is identified in the
/// description; the rail explains amount variance.
const PROCESSOR_BONUS: f64 = 5.0;

pub fn combine(scores: &[StrategyScore], processor_detected: bool) -> Combined {
    let get = |kind: StrategyKind| -> StrategyScore {
        scores
            .iter()
            .find(|s| s.strategy == kind)
            .copied()
            .unwrap_or(StrategyScore {
                strategy: kind,
                score: 0.0,
                fired: false,
            })
    };
    let number = get(StrategyKind::InvoiceNumber);
    let amount = get(StrategyKind::ExactAmount);
    let fuzzy = get(StrategyKind::FuzzyName);
    let date = get(StrategyKind::DateProximity);
    let multi = get(StrategyKind::MultiInvoice);

    let (mut confidence, dominant) = if number.fired {
        // Identification path. The number alone must be able to reach the
        // auto-approve band; disagreement subtracts bounded penalties.
        let mut c = number.score;
        if !amount.fired && !multi.fired {
            c -= 10.0;
        }
        if fuzzy.score > 0.0 && fuzzy.score < 30.0 {
            c -= 5.0;
        }
        if !date.fired {
            c -= 3.0;
        }
        if amount.fired || multi.fired {
            c = (c + 5.0).min(100.0);
        }
        (c, StrategyKind::InvoiceNumber)
    } else {
        let contributions = [
            (StrategyKind::ExactAmount, amount.score * W_AMOUNT),
            (StrategyKind::FuzzyName, fuzzy.score * W_NAME),
            (StrategyKind::DateProximity, date.score * W_DATE),
            (
                StrategyKind::MultiInvoice,
                if multi.fired { multi.score * W_MULTI } else { 0.0 },
            ),
        ];
        let mut c: f64 = contributions.iter().map(|(_, v)| v).sum();

        // Strong agreement saturates: a clearly-named counterparty paying a
        // clearly-matching amount is near-certain even though neither signal
        // is an identification by itself.
        if fuzzy.score >= 95.0 && amount.score >= 90.0 {
            c = c.max(85.0 + fuzzy.score * 0.1 + amount.score * 0.05);
        }
        if multi.fired && fuzzy.score >= 95.0 {
            c = c.max(85.0 + fuzzy.score * 0.1 + multi.score * 0.05);
        }

        let mut dominant = StrategyKind::ExactAmount;
        let mut best = f64::MIN;
        for (kind, value) in contributions {
            if value > best {
                best = value;
                dominant = kind;
            }
        }
        (c, dominant)
    };

    if processor_detected {
        confidence += PROCESSOR_BONUS;
    }

    Combined {
        confidence: round2(confidence.clamp(0.0, 100.0)),
        dominant,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
