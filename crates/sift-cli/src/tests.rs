//! CLI command tests

use std::io::Write;

use clap::Parser;
use sift_core::config::ClassifierBackend;
use sift_core::{AccountRef, Category, Config, Database, LedgerTable, RunStatus, Transaction};

use crate::cli::{Cli, Commands};
use crate::commands::{self, format_amount, format_date, truncate, IngestFlags};

const FEED: &str = r#"{
    "acc-1": [
        {
            "id": "t1",
            "value": {"amount": "-12.34"},
            "posted": "2024-03-01T10:00:00Z",
            "counterparty": {"legalName": "Aldi Stores"},
            "lwc": {"merchantName": "Aldi", "location": "Sydney"},
            "shortDescription": "ALDI SYDNEY"
        },
        {
            "id": "t2",
            "value": {"amount": "3.10"},
            "posted": "2024-03-02"
        },
        {
            "id": "t3",
            "posted": "2024-03-02"
        }
    ]
}"#;

fn mock_config() -> Config {
    let mut config = Config::default();
    config.classifier.backend = ClassifierBackend::Mock;
    config
}

fn feed_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", FEED).unwrap();
    file
}

fn account() -> AccountRef {
    AccountRef::new("acc-1", "bank", "cust")
}

fn seed_transaction(db: &Database, id: &str, vendor: &str, category: Option<Category>) {
    let tx = Transaction {
        account_id: "acc-1".into(),
        transaction_id: id.into(),
        amount: 450,
        source: format!("{} Pty Ltd", vendor),
        time: 1_700_000_000,
        vendor: vendor.into(),
        category,
        location: String::new(),
        description: String::new(),
    };
    db.insert_transactions(LedgerTable::Transactions, &[tx])
        .unwrap();
}

// ========== Formatting ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer vendor name", 10), "a much ...");
    assert_eq!(truncate("Café Crème Brûlée", 8), "Café ...");
}

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(1234), "$12.34");
    assert_eq!(format_amount(10), "$0.10");
    assert_eq!(format_amount(0), "$0.00");
}

#[test]
fn test_format_date() {
    assert_eq!(format_date(1_709_287_200), "2024-03-01");
}

// ========== Argument Parsing ==========

#[test]
fn test_parse_ingest_args() {
    let cli = Cli::try_parse_from([
        "sift",
        "--no-encrypt",
        "ingest",
        "--feed",
        "export.json",
        "--account",
        "acc-1",
        "--rent",
    ])
    .unwrap();

    assert!(cli.no_encrypt);
    match cli.command {
        Commands::Ingest {
            account,
            rent,
            no_classify,
            ..
        } => {
            assert_eq!(account, "acc-1");
            assert!(rent);
            assert!(!no_classify);
        }
        _ => panic!("expected ingest"),
    }
}

#[test]
fn test_parse_requires_account() {
    assert!(Cli::try_parse_from(["sift", "ingest", "--feed", "export.json"]).is_err());
}

#[test]
fn test_ledger_table() {
    assert_eq!(commands::ledger_table(false), LedgerTable::Transactions);
    assert_eq!(commands::ledger_table(true), LedgerTable::Rent);
}

// ========== Init / Status ==========

#[test]
fn test_cmd_init_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sift.db");

    commands::cmd_init(&db_path, true).unwrap();
    assert!(db_path.exists());
}

#[test]
fn test_cmd_status_without_database() {
    let dir = tempfile::tempdir().unwrap();
    let result = commands::cmd_status(&dir.path().join("missing.db"), None, true);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_status_with_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sift.db");
    commands::cmd_init(&db_path, true).unwrap();

    assert!(commands::cmd_status(&db_path, None, true).is_ok());
}

#[test]
fn test_load_config_missing_explicit_path() {
    let result = commands::load_config(Some(std::path::Path::new("/nonexistent/sift.toml")));
    assert!(result.is_err());
}

// ========== Ingest ==========

#[tokio::test]
async fn test_cmd_ingest_stores_and_dedups() {
    let db = Database::in_memory().unwrap();
    let feed = feed_file();
    let config = mock_config();

    commands::cmd_ingest(&db, &config, feed.path(), &account(), IngestFlags::default())
        .await
        .unwrap();
    assert_eq!(db.count_transactions(LedgerTable::Transactions).unwrap(), 2);

    commands::cmd_ingest(&db, &config, feed.path(), &account(), IngestFlags::default())
        .await
        .unwrap();
    assert_eq!(db.count_transactions(LedgerTable::Transactions).unwrap(), 2);

    let runs = db.list_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].inserted, 0);
    assert_eq!(runs[0].duplicates, 2);
    assert_eq!(runs[1].skipped, 1);
}

#[tokio::test]
async fn test_cmd_ingest_rent_json_output() {
    let db = Database::in_memory().unwrap();
    let feed = feed_file();
    let flags = IngestFlags {
        rent: true,
        json: true,
        ..Default::default()
    };

    commands::cmd_ingest(&db, &mock_config(), feed.path(), &account(), flags)
        .await
        .unwrap();

    assert_eq!(db.count_transactions(LedgerTable::Rent).unwrap(), 2);
    assert_eq!(db.count_transactions(LedgerTable::Transactions).unwrap(), 0);
}

fn unreachable_agent_config() -> Config {
    let mut config = Config::default();
    config.classifier.backend = ClassifierBackend::Agent;
    config.classifier.host = "http://127.0.0.1:1".into();
    config
}

#[test]
fn test_ingest_classifier_only_built_when_classifying() {
    let config = unreachable_agent_config();

    assert!(commands::ingest_classifier(&config, false).unwrap().is_mock());
    assert!(!commands::ingest_classifier(&config, true).unwrap().is_mock());
    assert!(commands::ingest_classifier(&mock_config(), true)
        .unwrap()
        .is_mock());
}

#[tokio::test]
async fn test_cmd_ingest_no_classify_ignores_agent_config() {
    let db = Database::in_memory().unwrap();
    let feed = feed_file();
    let flags = IngestFlags {
        no_classify: true,
        ..Default::default()
    };

    commands::cmd_ingest(&db, &unreachable_agent_config(), feed.path(), &account(), flags)
        .await
        .unwrap();

    assert_eq!(db.count_transactions(LedgerTable::Transactions).unwrap(), 2);
    assert_eq!(
        db.uncategorized_transactions(LedgerTable::Transactions)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(db.list_runs(1).unwrap()[0].classified, 0);
}

#[tokio::test]
async fn test_cmd_ingest_missing_feed() {
    let db = Database::in_memory().unwrap();
    let result = commands::cmd_ingest(
        &db,
        &mock_config(),
        std::path::Path::new("/nonexistent/export.json"),
        &account(),
        IngestFlags::default(),
    )
    .await;
    assert!(result.is_err());
    assert!(db.list_runs(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_cmd_recategorize_uses_vendor_history() {
    let db = Database::in_memory().unwrap();
    seed_transaction(&db, "old", "Aldi", Some(Category::Groceries));
    seed_transaction(&db, "new", "Aldi", None);

    commands::cmd_recategorize(&db, &mock_config(), LedgerTable::Transactions)
        .await
        .unwrap();

    assert!(db
        .uncategorized_transactions(LedgerTable::Transactions)
        .unwrap()
        .is_empty());
    assert_eq!(db.list_runs(1).unwrap()[0].status, RunStatus::Completed);
}

#[tokio::test]
async fn test_cmd_recategorize_nothing_pending() {
    let db = Database::in_memory().unwrap();
    let result = commands::cmd_recategorize(&db, &mock_config(), LedgerTable::Rent).await;
    assert!(result.is_ok());
}

// ========== Listing ==========

#[test]
fn test_cmd_transactions_list_empty() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_transactions_list(&db, LedgerTable::Transactions, 20).is_ok());
}

#[test]
fn test_cmd_transactions_list() {
    let db = Database::in_memory().unwrap();
    seed_transaction(&db, "t1", "Aldi", Some(Category::Groceries));
    seed_transaction(&db, "t2", "", None);

    assert!(commands::cmd_transactions_list(&db, LedgerTable::Transactions, 20).is_ok());
}

#[test]
fn test_cmd_vendors() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_vendors(&db).is_ok());

    seed_transaction(&db, "t1", "Aldi", Some(Category::Groceries));
    seed_transaction(&db, "t2", "Shell", Some(Category::Car));
    assert!(commands::cmd_vendors(&db).is_ok());
}

#[test]
fn test_cmd_history() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_history(&db, 10).is_ok());

    let run = db
        .start_run(sift_core::RunKind::Transactions, Some("acc-1"))
        .unwrap();
    db.fail_run(run, "Database error: disk full").unwrap();
    assert!(commands::cmd_history(&db, 10).is_ok());
}
