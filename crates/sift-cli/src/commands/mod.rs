//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `ingest` - Ingestion and recategorization runs
//! - `transactions` - Ledger listing and learned vendor categories
//! - `history` - Pipeline run history
//! - `status` - Database and classifier status

pub mod core;
pub mod history;
pub mod ingest;
pub mod status;
pub mod transactions;

// Re-export command functions for main.rs
pub use core::*;
pub use history::*;
pub use ingest::*;
pub use status::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render an amount in cents as dollars
pub fn format_amount(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

/// Render a Unix timestamp as a UTC date
pub fn format_date(time: i64) -> String {
    chrono::DateTime::from_timestamp(time, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| time.to_string())
}
