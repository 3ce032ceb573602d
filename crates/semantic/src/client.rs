//! Semantic disambiguation HTTP client.
//!
//! Blocking reqwest client (no async runtime required). One bounded call per
//! candidate: POST the structured summaries, parse a strict verdict. The
//! engine treats every failure here as "keep the rule-based confidence", so
//! this client never needs to be clever about recovery — just honest about
//! what went wrong.

use std::thread;
use std::time::Duration;

use paymatch_engine::semantic::{
    DisambiguationError, Disambiguator, SemanticRequest, SemanticVerdict,
};

/// Error type for disambiguation calls.
#[derive(Debug)]
pub enum SemanticError {
    /// Network error (DNS, connect, mid-body disconnect, client timeout)
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Response body was not valid JSON
    Parse(String),
    /// JSON arrived but doesn't carry a usable verdict
    Malformed(String),
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticError::Network(msg) => write!(f, "network error: {}", msg),
            SemanticError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            SemanticError::Parse(msg) => write!(f, "parse error: {}", msg),
            SemanticError::Malformed(msg) => write!(f, "malformed verdict: {}", msg),
        }
    }
}

impl std::error::Error for SemanticError {}

/// Judgment-service API client (blocking).
#[derive(Clone)]
pub struct SemanticClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: Option<String>,
    retries: u32,
}

impl SemanticClient {
    pub fn new(api_base: &str, token: Option<String>, timeout: Duration, retries: u32) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("paymatch/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            retries,
        }
    }

    /// One judgment call with the configured retry budget. 4xx responses are
    /// not retried — the request won't get better by repeating it.
    pub fn judge(&self, request: &SemanticRequest) -> Result<SemanticVerdict, SemanticError> {
        let url = format!("{}/v1/disambiguate", self.api_base);

        let mut last_err = SemanticError::Network("no attempt made".into());
        for attempt in 0..=self.retries {
            if attempt > 0 {
                thread::sleep(Duration::from_millis(250 * u64::from(attempt)));
            }
            match self.post_json(&url, request) {
                Ok(verdict) => return Ok(verdict),
                Err(err) => {
                    if matches!(err, SemanticError::Http(code, _) if code < 500) {
                        return Err(err);
                    }
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    fn post_json(
        &self,
        url: &str,
        request: &SemanticRequest,
    ) -> Result<SemanticVerdict, SemanticError> {
        let mut req = self.http.post(url).json(request);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        let response = req.send().map_err(|e| SemanticError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SemanticError::Http(status, body));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| SemanticError::Parse(e.to_string()))?;
        parse_verdict(&json)
    }
}

/// Wire format: `{"verdict": "<invoice_id>" | "none", "rationale": "..."}`.
/// Anything else is malformed — the engine falls back to rule-based scoring.
pub fn parse_verdict(json: &serde_json::Value) -> Result<SemanticVerdict, SemanticError> {
    let verdict = json["verdict"]
        .as_str()
        .ok_or_else(|| SemanticError::Malformed("missing 'verdict' field".into()))?;
    let rationale = json["rationale"].as_str().unwrap_or_default().to_string();

    let best_invoice_id = match verdict {
        "none" => None,
        "" => return Err(SemanticError::Malformed("empty verdict".into())),
        id => Some(id.to_string()),
    };

    Ok(SemanticVerdict {
        best_invoice_id,
        rationale,
    })
}

impl Disambiguator for SemanticClient {
    fn disambiguate(
        &self,
        request: &SemanticRequest,
    ) -> Result<SemanticVerdict, DisambiguationError> {
        self.judge(request)
            .map_err(|e| DisambiguationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_confirming_verdict() {
        let json = serde_json::json!({
            "verdict": "inv_42",
            "rationale": "amount and counterparty both align",
        });
        let verdict = parse_verdict(&json).unwrap();
        assert_eq!(verdict.best_invoice_id.as_deref(), Some("inv_42"));
        assert!(verdict.rationale.contains("align"));
    }

    #[test]
    fn parse_none_verdict() {
        let json = serde_json::json!({ "verdict": "none", "rationale": "nothing fits" });
        let verdict = parse_verdict(&json).unwrap();
        assert!(verdict.best_invoice_id.is_none());
    }

    #[test]
    fn missing_rationale_is_tolerated() {
        let json = serde_json::json!({ "verdict": "inv_1" });
        let verdict = parse_verdict(&json).unwrap();
        assert_eq!(verdict.rationale, "");
    }

    #[test]
    fn malformed_verdicts_rejected() {
        for body in [
            serde_json::json!({ "rationale": "no verdict field" }),
            serde_json::json!({ "verdict": 17 }),
            serde_json::json!({ "verdict": "" }),
            serde_json::json!([1, 2, 3]),
        ] {
            assert!(
                matches!(parse_verdict(&body), Err(SemanticError::Malformed(_))),
                "accepted {body}"
            );
        }
    }

    #[test]
    fn request_serializes_for_the_wire() {
        use chrono::NaiveDate;
        use paymatch_engine::semantic::{InvoiceSummary, TransactionSummary};

        let request = SemanticRequest {
            transaction: TransactionSummary {
                id: "t1".into(),
                amount_cents: 418_900,
                currency: "USD".into(),
                date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                description: "Payment INV-1236".into(),
                counterparty: None,
            },
            candidates: vec![InvoiceSummary {
                id: "i1".into(),
                number: "INV-1236".into(),
                company: "Acme".into(),
                amount_cents: 418_900,
                currency: "USD".into(),
                due_date: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["transaction"]["id"], "t1");
        assert_eq!(json["candidates"][0]["number"], "INV-1236");
        // absent counterparty is omitted, not null
        assert!(json["transaction"].get("counterparty").is_none());
    }
}
