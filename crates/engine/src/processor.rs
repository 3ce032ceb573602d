//! Payment-processor detection from bank descriptions.
//!
//! Knowing the rail ("STRIPE TRANSFER", "FEDWIRE CREDIT") explains amount
//! variance and lets name matching ignore the processor's own tokens.

/// Keyword table, matched case-insensitively against the raw description.
const PROCESSORS: &[(&str, &[&str])] = &[
    ("stripe", &["stripe", "st-"]),
    ("avidpay", &["avidpay"]),
    ("ach", &["ach", "sec:ccd", "sec:ppd"]),
    ("wire", &["fedwire", "chips", "wire"]),
    ("rtp", &["real time payment"]),
    ("zelle", &["zelle"]),
    ("amex", &["american express"]),
];

pub fn detect(description: &str) -> Option<&'static str> {
    let lower = description.to_lowercase();
    for (name, keywords) in PROCESSORS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return Some(name);
        }
    }
    None
}

/// Drop processor-name tokens from an already-normalized string so they don't
/// pollute company-name similarity.
pub fn strip_processor_tokens(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .filter(|token| !PROCESSORS.iter().any(|(name, _)| name == token))
        .collect::<Vec<_>>()
        .join(" ")
}
