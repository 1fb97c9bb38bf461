use std::io::Read;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{AnalysisError, AnalysisResult};

use super::types::Transaction;

/// Transactions read from a CSV ledger.
#[derive(Debug)]
pub struct IngestedLedger {
    pub transactions: Vec<Transaction>,
    /// Set when `row_limit` stopped the reader before the end of the file.
    pub truncated: bool,
}

/// Column positions resolved from the header row.
struct ColumnMap {
    id: Option<usize>,
    sender: usize,
    receiver: usize,
    amount: usize,
    timestamp: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> AnalysisResult<Self> {
        let mut id = None;
        let mut sender = None;
        let mut receiver = None;
        let mut amount = None;
        let mut timestamp = None;

        for (idx, header) in headers.iter().enumerate() {
            let slot = match header.trim().to_lowercase().as_str() {
                "sender_id" | "sender" | "sender_account" | "source" | "source_account" => {
                    &mut sender
                }
                "receiver_id" | "receiver" | "receiver_account" | "destination"
                | "destination_account" => &mut receiver,
                "amount" | "txn_amount" | "transaction_amount" => &mut amount,
                "timestamp" | "date" | "txn_date" | "datetime" => &mut timestamp,
                "transaction_id" | "txn_id" | "id" => &mut id,
                _ => continue,
            };
            // First matching column wins.
            slot.get_or_insert(idx);
        }

        let require = |col: Option<usize>, name: &str| {
            col.ok_or_else(|| AnalysisError::malformed(0, format!("missing required column '{name}'")))
        };

        Ok(Self {
            id,
            sender: require(sender, "sender_id")?,
            receiver: require(receiver, "receiver_id")?,
            amount: require(amount, "amount")?,
            timestamp: require(timestamp, "timestamp")?,
        })
    }
}

/// Read a transaction ledger from CSV, normalizing column names.
///
/// At most `row_limit` data rows are read. Rows are numbered from 1, excluding
/// the header. Missing transaction ids are synthesized as `TXN_00001`, ...
pub fn read_transactions<R: Read>(
    reader: R,
    row_limit: Option<usize>,
) -> AnalysisResult<IngestedLedger> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(rdr.headers()?)?;
    let limit = row_limit.unwrap_or(usize::MAX);

    let mut transactions = Vec::new();
    let mut truncated = false;
    for result in rdr.records() {
        if transactions.len() >= limit {
            // At least one more row exists past the limit.
            truncated = true;
            break;
        }
        let record = result?;
        let row = transactions.len() + 1;
        transactions.push(parse_row(&record, &columns, row)?);
    }

    tracing::info!(
        rows = transactions.len(),
        truncated,
        "Ingested transaction ledger"
    );

    Ok(IngestedLedger {
        transactions,
        truncated,
    })
}

fn parse_row(record: &csv::StringRecord, columns: &ColumnMap, row: usize) -> AnalysisResult<Transaction> {
    let field = |idx: usize| record.get(idx).unwrap_or("").trim();

    let id = columns
        .id
        .map(field)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("TXN_{row:05}"));

    let raw_amount = field(columns.amount);
    let amount = BigDecimal::from_str(raw_amount)
        .map_err(|_| AnalysisError::malformed(row, format!("unparseable amount '{raw_amount}'")))?;

    let raw_ts = field(columns.timestamp);
    let timestamp = parse_timestamp(raw_ts)
        .ok_or_else(|| AnalysisError::malformed(row, format!("unparseable timestamp '{raw_ts}'")))?;

    Ok(Transaction {
        id,
        sender: field(columns.sender).to_string(),
        receiver: field(columns.receiver).to_string(),
        amount,
        timestamp,
    })
}

/// Accepts RFC 3339, naive date-times and dates (taken as UTC), and epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }

    if let Ok(secs) = raw.parse::<f64>() {
        if secs.is_finite() {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9) as u32;
            return DateTime::from_timestamp(whole as i64, nanos);
        }
    }

    None
}
