//! Counterparty / company name normalization and similarity.
//!
//! Bank counterparty strings are abbreviated and garbled relative to the
//! system-of-record company names ("TERRA CITY CENTER LLC" vs "Terra City
//! Center"), so both sides are normalized before comparison.

use std::collections::BTreeSet;

use strsim::jaro_winkler;

/// Corporate noise tokens dropped during normalization.
const CORPORATE_SUFFIXES: &[&str] = &[
    "llc", "inc", "corp", "corporation", "ltd", "limited", "lp", "llp", "plc", "co", "company",
    "gmbh", "owner", "owners", "properties", "property", "prop", "group", "holdings", "holding",
    "investments", "investment", "management", "mgmt", "partners", "partner", "associates",
    "assoc", "enterprises", "enterprise", "realty", "development", "capital", "ventures",
    "venture", "trust", "fund", "funds",
];

/// Connective words ignored when comparing token sets.
const STOPWORDS: &[&str] = &["the", "of", "and", "at", "in", "on", "for", "a", "an"];

/// Lowercase, replace punctuation with spaces, drop corporate suffix tokens,
/// collapse whitespace.
pub fn normalize_name(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                cleaned.push(lower);
            }
        } else {
            cleaned.push(' ');
        }
    }
    cleaned
        .split_whitespace()
        .filter(|token| !CORPORATE_SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Meaningful tokens of an already-normalized name.
fn meaningful_tokens(normalized: &str) -> BTreeSet<&str> {
    normalized
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .collect()
}

/// Similarity in 0..=100 between a normalized transaction-side string
/// (counterparty or whole description) and a normalized company name.
///
/// Three signals, best wins: substring containment, token-set coverage of the
/// company name (with fuzzy per-token matching for misspellings), and
/// whole-string Jaro-Winkler as a fallback for short names.
pub fn name_similarity(transaction_side: &str, company: &str) -> f64 {
    if transaction_side.is_empty() || company.is_empty() {
        return 0.0;
    }
    if transaction_side == company {
        return 100.0;
    }

    let mut best: f64 = 0.0;

    // Substring containment. Require some length so "co" doesn't match everything.
    if company.len() >= 5 && transaction_side.contains(company) {
        best = 100.0;
    } else if transaction_side.len() >= 5 && company.contains(transaction_side) {
        best = 95.0;
    }

    // Token coverage: how much of the company name appears in the transaction
    // side, counting close misspellings ("pnama" vs "panama") as hits.
    let company_tokens = meaningful_tokens(company);
    if !company_tokens.is_empty() {
        let side_tokens = meaningful_tokens(transaction_side);
        let mut found = 0usize;
        for ct in &company_tokens {
            if side_tokens.contains(ct) {
                found += 1;
            } else if ct.len() >= 3
                && side_tokens
                    .iter()
                    .any(|st| st.len() >= 3 && jaro_winkler(ct, st) >= 0.80)
            {
                found += 1;
            }
        }
        let coverage = found as f64 / company_tokens.len() as f64;
        best = best.max(coverage * 100.0);
    }

    // Whole-string fallback for single-token and heavily abbreviated names.
    best = best.max(jaro_winkler(transaction_side, company) * 100.0);

    best.clamp(0.0, 100.0)
}
