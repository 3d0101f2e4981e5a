//! Sift CLI - Bank transaction ingestion and categorization
//!
//! Usage:
//!   sift init                                   Initialize database
//!   sift ingest --feed export.json --account ID  Ingest and categorize
//!   sift recategorize                           Retry uncategorized rows
//!   sift history                                Show recent runs

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Ingest {
            feed,
            account,
            bank_id,
            customer_id,
            rent,
            no_classify,
            json,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let account = sift_core::AccountRef::new(account, bank_id, customer_id);
            commands::cmd_ingest(
                &db,
                &config,
                &feed,
                &account,
                commands::IngestFlags {
                    rent,
                    no_classify,
                    json,
                },
            )
            .await
        }
        Commands::Recategorize { rent } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_recategorize(&db, &config, commands::ledger_table(rent)).await
        }
        Commands::Transactions { rent, limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_transactions_list(&db, commands::ledger_table(rent), limit)
        }
        Commands::Vendors => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_vendors(&db)
        }
        Commands::History { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_history(&db, limit)
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.config.as_deref(), cli.no_encrypt),
    }
}
