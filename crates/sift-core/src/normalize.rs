//! Conversion of raw bank records into canonical transactions
//!
//! Records come in two flavors, told apart by the merchant enrichment block:
//! merchant-tagged records carry vendor/location/description and still need a
//! category, bare records are transfers and are categorized as `Debit` on the spot.
//! Records missing a value, posted time or id are skipped, never fatal.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::bank::RawTransaction;
use crate::models::{Category, Transaction, BONUS_INTEREST_SOURCE};

/// Record shape, resolved once per raw record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFlavor {
    MerchantTagged {
        vendor: String,
        location: String,
        description: String,
    },
    Bare,
}

impl RecordFlavor {
    pub fn of(raw: &RawTransaction) -> Self {
        match &raw.lwc {
            Some(meta) => Self::MerchantTagged {
                vendor: meta.merchant_name.clone().unwrap_or_default(),
                location: meta.location.clone().unwrap_or_default(),
                description: raw.short_description.clone().unwrap_or_default(),
            },
            None => Self::Bare,
        }
    }
}

/// Why a raw record did not become a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    MissingValue,
    MissingPosted,
    InvalidAmount(String),
    InvalidPosted(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "no transaction id"),
            Self::MissingValue => write!(f, "no monetary value"),
            Self::MissingPosted => write!(f, "no posted timestamp"),
            Self::InvalidAmount(s) => write!(f, "unparseable amount '{}'", s),
            Self::InvalidPosted(s) => write!(f, "unparseable posted time '{}'", s),
        }
    }
}

/// A record the normalizer dropped
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub transaction_id: Option<String>,
    pub reason: SkipReason,
}

/// Normalizer output for one feed page
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<SkippedRecord>,
}

/// Convert a decimal amount in major units to integer cents (magnitude).
///
/// Rounds half-to-even at the cent boundary, so `"0.10"` is 10 and
/// `"12.345"` is 1234.
pub fn parse_minor_units(amount: &str) -> Option<i64> {
    let cleaned: String = amount
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let major = Decimal::from_str(&cleaned).ok()?;
    major
        .abs()
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
}

/// Parse a posted time into Unix seconds
pub fn parse_posted(posted: &str) -> Option<i64> {
    let posted = posted.trim();

    if let Ok(secs) = posted.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(posted) {
        return Some(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(posted, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(posted, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Normalize one raw record belonging to `account_id`
pub fn normalize_record(
    raw: &RawTransaction,
    account_id: &str,
) -> std::result::Result<Transaction, SkipReason> {
    let amount_text = raw
        .value
        .as_ref()
        .and_then(|v| v.amount.as_deref())
        .filter(|a| !a.trim().is_empty())
        .ok_or(SkipReason::MissingValue)?;

    let posted_text = raw
        .posted
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or(SkipReason::MissingPosted)?;

    let transaction_id = raw
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(SkipReason::MissingId)?
        .to_string();

    let amount = parse_minor_units(amount_text)
        .ok_or_else(|| SkipReason::InvalidAmount(amount_text.to_string()))?;
    let time = parse_posted(posted_text)
        .ok_or_else(|| SkipReason::InvalidPosted(posted_text.to_string()))?;

    let source = raw
        .counterparty
        .as_ref()
        .and_then(|c| c.legal_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(BONUS_INTEREST_SOURCE)
        .to_string();

    let (vendor, location, description, category) = match RecordFlavor::of(raw) {
        RecordFlavor::MerchantTagged {
            vendor,
            location,
            description,
        } => (vendor, location, description, None),
        RecordFlavor::Bare => (
            String::new(),
            String::new(),
            String::new(),
            Some(Category::Debit),
        ),
    };

    Ok(Transaction {
        account_id: account_id.to_string(),
        transaction_id,
        amount,
        source,
        time,
        vendor,
        category,
        location,
        description,
    })
}

/// Normalize a feed page, logging and dropping unusable records
pub fn normalize_batch(raws: &[RawTransaction], account_id: &str) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for raw in raws {
        match normalize_record(raw, account_id) {
            Ok(tx) => batch.transactions.push(tx),
            Err(reason) => {
                warn!(
                    account_id,
                    transaction_id = raw.id.as_deref().unwrap_or("<none>"),
                    %reason,
                    "Skipping bank record"
                );
                batch.skipped.push(SkippedRecord {
                    transaction_id: raw.id.clone(),
                    reason,
                });
            }
        }
    }

    debug!(
        account_id,
        normalized = batch.transactions.len(),
        skipped = batch.skipped.len(),
        "Normalized feed page"
    );
    batch
}
