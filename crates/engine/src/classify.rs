//! Classification policy and result statistics.

use crate::config::EngineConfig;
use crate::model::{Classification, Match, Provenance, RunStats};

/// Deterministic function of confidence and the configured thresholds.
/// `None` means the candidate is dropped (counted, not emitted).
/// Partial matches are capped at needs-review regardless of confidence.
pub fn classify(confidence: f64, partial: bool, config: &EngineConfig) -> Option<Classification> {
    if confidence < config.review_threshold {
        return None;
    }
    if confidence >= config.auto_approve_threshold && !partial {
        Some(Classification::AutoApproved)
    } else {
        Some(Classification::NeedsReview)
    }
}

/// Fold emitted matches into the classification / provenance counters.
/// The run controller fills in the input-hygiene and semantic-call counters.
pub fn tally_matches(matches: &[Match], stats: &mut RunStats) {
    for m in matches {
        match m.classification {
            Classification::AutoApproved => stats.auto_approved += 1,
            Classification::NeedsReview => stats.needs_review += 1,
        }
        match m.provenance {
            Provenance::RuleBased => stats.rule_based += 1,
            Provenance::AiConfirmed => stats.ai_confirmed += 1,
        }
        stats.total_matched_cents += m.matched_cents;
    }
}
