//! Domain models for sift

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categorize::CategorizeReport;

/// Counterparty name used when a record has no legal name (e.g. interest credits)
pub const BONUS_INTEREST_SOURCE: &str = "bonus interest";

/// Spending category assigned to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Groceries,
    #[serde(rename = "Eating out")]
    EatingOut,
    Travel,
    Car,
    #[serde(rename = "Rent and bills")]
    RentAndBills,
    #[serde(rename = "Fitness or health")]
    FitnessOrHealth,
    /// Non-merchant transfer; never sent to the classifier
    Debit,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groceries => "Groceries",
            Self::EatingOut => "Eating out",
            Self::Travel => "Travel",
            Self::Car => "Car",
            Self::RentAndBills => "Rent and bills",
            Self::FitnessOrHealth => "Fitness or health",
            Self::Debit => "Debit",
        }
    }

    /// Categories the classifier may choose from
    pub fn classifiable() -> &'static [Category] {
        &[
            Self::Groceries,
            Self::EatingOut,
            Self::Travel,
            Self::Car,
            Self::RentAndBills,
            Self::FitnessOrHealth,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect();

        match key.as_str() {
            "groceries" => Ok(Self::Groceries),
            "eating out" => Ok(Self::EatingOut),
            "travel" => Ok(Self::Travel),
            "car" => Ok(Self::Car),
            "rent and bills" | "rent & bills" => Ok(Self::RentAndBills),
            "fitness or health" | "fitness & health" => Ok(Self::FitnessOrHealth),
            "debit" => Ok(Self::Debit),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination table for an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerTable {
    /// Everyday spending, categorized
    Transactions,
    /// Rent account activity, stored uncategorized
    Rent,
}

impl LedgerTable {
    /// SQL table name. Only these two literals are ever interpolated into queries.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Rent => "rent_transactions",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Rent => "rent",
        }
    }
}

impl std::str::FromStr for LedgerTable {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transactions" => Ok(Self::Transactions),
            "rent" | "rent_transactions" => Ok(Self::Rent),
            _ => Err(format!("Unknown ledger table: {}", s)),
        }
    }
}

impl std::fmt::Display for LedgerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical transaction, one per raw bank record that survives dedup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub account_id: String,
    pub transaction_id: String,
    /// Magnitude in minor units (cents)
    pub amount: i64,
    /// Counterparty legal name, or `BONUS_INTEREST_SOURCE`
    pub source: String,
    /// Unix timestamp (seconds) the transaction posted
    pub time: i64,
    pub vendor: String,
    pub category: Option<Category>,
    pub location: String,
    pub description: String,
}

impl Transaction {
    /// Assign a category unless one is already set.
    ///
    /// Returns true when the category was written.
    pub fn assign_category(&mut self, category: Category) -> bool {
        if self.category.is_some() {
            return false;
        }
        self.category = Some(category);
        true
    }

    pub fn is_categorized(&self) -> bool {
        self.category.is_some()
    }

    /// Category as stored in the ledger (empty string when unassigned)
    pub fn category_label(&self) -> &'static str {
        self.category.map(|c| c.as_str()).unwrap_or("")
    }
}

/// Identifies an account at the bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub account_id: String,
    pub bank_id: String,
    pub customer_id: String,
}

impl AccountRef {
    pub fn new(
        account_id: impl Into<String>,
        bank_id: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            bank_id: bank_id.into(),
            customer_id: customer_id.into(),
        }
    }
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub account_id: String,
    /// Raw records returned by the feed
    pub fetched: usize,
    /// Records dropped by the normalizer
    pub skipped: usize,
    /// Records already stored (or repeated in the batch)
    pub duplicates: usize,
    pub inserted: usize,
    /// Present when the run categorized its transactions
    pub categorization: Option<CategorizeReport>,
}

/// Kind of pipeline run recorded in history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Transactions,
    Rent,
    Recategorize,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Rent => "rent",
            Self::Recategorize => "recategorize",
        }
    }
}

impl std::str::FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transactions" => Ok(Self::Transactions),
            "rent" => Ok(Self::Rent),
            "recategorize" => Ok(Self::Recategorize),
            _ => Err(format!("Unknown run kind: {}", s)),
        }
    }
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a recorded run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// A row of the ingest run history
#[derive(Debug, Clone, Serialize)]
pub struct IngestRun {
    pub id: i64,
    pub kind: RunKind,
    pub account_id: Option<String>,
    pub status: RunStatus,
    pub fetched: i64,
    pub skipped: i64,
    pub duplicates: i64,
    pub inserted: i64,
    pub cache_hits: i64,
    pub classified: i64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
