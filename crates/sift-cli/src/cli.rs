//! CLI argument definitions using clap
//!
//! Command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sift - Ingest bank transactions and categorize your spending
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Bank transaction ingestion and categorization", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "sift.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to ~/.config/sift/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SIFT_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Fetch, deduplicate, categorize and store an account's transactions
    Ingest {
        /// Bank feed export (JSON array, or object keyed by account id)
        #[arg(short, long)]
        feed: PathBuf,

        /// Account id at the bank
        #[arg(short, long)]
        account: String,

        /// Bank id
        #[arg(long, default_value = "")]
        bank_id: String,

        /// Customer id
        #[arg(long, default_value = "")]
        customer_id: String,

        /// Store into the rent ledger (never categorized)
        #[arg(long)]
        rent: bool,

        /// Store new transactions without categorizing them
        #[arg(long)]
        no_classify: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Categorize stored transactions that have no category yet
    Recategorize {
        /// Use the rent ledger
        #[arg(long)]
        rent: bool,
    },

    /// List recent transactions
    Transactions {
        /// Use the rent ledger
        #[arg(long)]
        rent: bool,

        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show the vendor → category mapping learned from the ledger
    Vendors,

    /// Show recent pipeline runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Show database and classifier status
    Status,
}
