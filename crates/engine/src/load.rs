//! CSV snapshot loaders.
//!
//! The engine does not fetch data; callers hand it exported snapshots. A row
//! that fails to parse is skipped and counted, never fatal. A missing column
//! is structural and fails the load.

use chrono::NaiveDate;

use crate::error::EngineError;
use crate::model::{Association, DeniedPair, Direction, Invoice, InvoiceStatus, Transaction};

/// Parsed rows plus the count of rows that didn't make it.
#[derive(Debug)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

/// Expected columns: id, date, amount, currency, description, counterparty,
/// direction. Amounts are decimal currency units ("4189.00").
pub fn load_transactions_csv(data: &str) -> Result<Loaded<Transaction>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());
    let headers = read_headers(&mut reader, "transactions")?;
    let idx = |name: &str| column_index(&headers, "transactions", name);

    let id_i = idx("id")?;
    let date_i = idx("date")?;
    let amount_i = idx("amount")?;
    let currency_i = idx("currency")?;
    let description_i = idx("description")?;
    let counterparty_i = idx("counterparty")?;
    let direction_i = idx("direction")?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::Io(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let id = field(id_i).to_string();
        let date = NaiveDate::parse_from_str(field(date_i), "%Y-%m-%d");
        let amount = parse_amount_cents(field(amount_i));
        let direction = match field(direction_i).to_ascii_lowercase().as_str() {
            "credit" => Some(Direction::Credit),
            "debit" => Some(Direction::Debit),
            _ => None,
        };

        let (Ok(date), Some(amount_cents), Some(direction)) = (date, amount, direction) else {
            skipped += 1;
            continue;
        };
        if id.is_empty() {
            skipped += 1;
            continue;
        }

        let counterparty = field(counterparty_i);
        records.push(Transaction {
            id,
            amount_cents,
            currency: field(currency_i).to_string(),
            date,
            description: field(description_i).to_string(),
            counterparty: if counterparty.is_empty() {
                None
            } else {
                Some(counterparty.to_string())
            },
            direction,
        });
    }

    Ok(Loaded { records, skipped })
}

/// Expected columns: id, number, company, amount, currency, due_date, status.
pub fn load_invoices_csv(data: &str) -> Result<Loaded<Invoice>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());
    let headers = read_headers(&mut reader, "invoices")?;
    let idx = |name: &str| column_index(&headers, "invoices", name);

    let id_i = idx("id")?;
    let number_i = idx("number")?;
    let company_i = idx("company")?;
    let amount_i = idx("amount")?;
    let currency_i = idx("currency")?;
    let due_i = idx("due_date")?;
    let status_i = idx("status")?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::Io(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let id = field(id_i).to_string();
        let due_date = NaiveDate::parse_from_str(field(due_i), "%Y-%m-%d");
        let amount = parse_amount_cents(field(amount_i));
        // CRM exports are inconsistent about status vocabulary.
        let status = match field(status_i).to_ascii_lowercase().as_str() {
            "open" | "unpaid" | "outstanding" | "" => Some(InvoiceStatus::Open),
            "paid" => Some(InvoiceStatus::Paid),
            "void" | "voided" => Some(InvoiceStatus::Void),
            _ => None,
        };

        let (Ok(due_date), Some(amount_cents), Some(status)) = (due_date, amount, status) else {
            skipped += 1;
            continue;
        };
        if id.is_empty() {
            skipped += 1;
            continue;
        }

        records.push(Invoice {
            id,
            number: field(number_i).to_string(),
            company: field(company_i).to_string(),
            amount_cents,
            currency: field(currency_i).to_string(),
            due_date,
            status,
        });
    }

    Ok(Loaded { records, skipped })
}

/// Expected columns: counterparty_pattern, company.
pub fn load_associations_csv(data: &str) -> Result<Loaded<Association>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());
    let headers = read_headers(&mut reader, "associations")?;
    let pattern_i = column_index(&headers, "associations", "counterparty_pattern")?;
    let company_i = column_index(&headers, "associations", "company")?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::Io(e.to_string()))?;
        let pattern = record.get(pattern_i).unwrap_or("").trim();
        let company = record.get(company_i).unwrap_or("").trim();
        if pattern.is_empty() || company.is_empty() {
            skipped += 1;
            continue;
        }
        records.push(Association {
            counterparty_pattern: pattern.to_string(),
            company: company.to_string(),
        });
    }
    Ok(Loaded { records, skipped })
}

/// Expected columns: transaction_id, invoice_id.
pub fn load_denied_pairs_csv(data: &str) -> Result<Loaded<DeniedPair>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());
    let headers = read_headers(&mut reader, "denied_pairs")?;
    let txn_i = column_index(&headers, "denied_pairs", "transaction_id")?;
    let inv_i = column_index(&headers, "denied_pairs", "invoice_id")?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::Io(e.to_string()))?;
        let txn = record.get(txn_i).unwrap_or("").trim();
        let inv = record.get(inv_i).unwrap_or("").trim();
        if txn.is_empty() || inv.is_empty() {
            skipped += 1;
            continue;
        }
        records.push(DeniedPair {
            transaction_id: txn.to_string(),
            invoice_id: inv.to_string(),
        });
    }
    Ok(Loaded { records, skipped })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_headers<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    input: &str,
) -> Result<Vec<String>, EngineError> {
    Ok(reader
        .headers()
        .map_err(|e| EngineError::Io(format!("{input}: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect())
}

fn column_index(headers: &[String], input: &str, name: &str) -> Result<usize, EngineError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| EngineError::MissingColumn {
            input: input.into(),
            column: name.into(),
        })
}

/// "4189.00" → 418900. Accepts a sign, thousands separators, and one or two
/// decimal digits. Anything else is a malformed amount.
pub fn parse_amount_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '$').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    let (sign, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, cleaned.strip_prefix('+').unwrap_or(cleaned)),
    };
    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().ok()?
    };
    let cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        2 => frac.parse::<i64>().ok()?,
        _ => return None,
    };
    Some(sign * (whole_value.checked_mul(100)? + cents))
}
