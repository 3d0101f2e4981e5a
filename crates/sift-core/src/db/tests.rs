//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, vendor: &str, time: i64, category: Option<Category>) -> Transaction {
        Transaction {
            account_id: "acc-1".into(),
            transaction_id: id.into(),
            amount: 1250,
            source: format!("{} Pty Ltd", vendor),
            time,
            vendor: vendor.into(),
            category,
            location: "Sydney".into(),
            description: String::new(),
        }
    }

    #[test]
    fn test_in_memory_db_is_empty() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.count_transactions(LedgerTable::Transactions).unwrap(), 0);
        assert_eq!(db.count_transactions(LedgerTable::Rent).unwrap(), 0);
        assert!(db.list_runs(10).unwrap().is_empty());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        let reopened = Database::new_unencrypted(db.path()).unwrap();
        assert_eq!(reopened.count_transactions(LedgerTable::Transactions).unwrap(), 0);
    }

    #[test]
    fn test_insert_and_list_round_trip() {
        let db = Database::in_memory().unwrap();
        let stored = vec![
            tx("t1", "Aldi", 100, Some(Category::Groceries)),
            tx("t2", "", 200, Some(Category::Debit)),
            tx("t3", "Mystery", 300, None),
        ];

        let inserted = db.insert_transactions(LedgerTable::Transactions, &stored).unwrap();
        assert_eq!(inserted, 3);

        let listed = db.list_transactions(LedgerTable::Transactions, 10).unwrap();
        assert_eq!(listed.len(), 3);
        // Most recent first
        assert_eq!(listed[0], stored[2]);
        assert_eq!(listed[1], stored[1]);
        assert_eq!(listed[2], stored[0]);
    }

    #[test]
    fn test_insert_empty_batch() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.insert_transactions(LedgerTable::Transactions, &[]).unwrap(), 0);
    }

    #[test]
    fn test_insert_batch_is_atomic() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(LedgerTable::Transactions, &[tx("t1", "Aldi", 1, None)])
            .unwrap();

        // t1 violates the unique constraint, so t2 must not be stored either
        let result = db.insert_transactions(
            LedgerTable::Transactions,
            &[tx("t2", "Coles", 2, None), tx("t1", "Aldi", 1, None)],
        );
        assert!(matches!(result, Err(crate::error::Error::Database(_))));
        assert_eq!(db.count_transactions(LedgerTable::Transactions).unwrap(), 1);
    }

    #[test]
    fn test_ledger_tables_are_separate() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(LedgerTable::Rent, &[tx("r1", "", 1, None)])
            .unwrap();

        assert_eq!(db.count_transactions(LedgerTable::Rent).unwrap(), 1);
        assert_eq!(db.count_transactions(LedgerTable::Transactions).unwrap(), 0);
        assert!(db
            .existing_transaction_ids(LedgerTable::Transactions, "backfill")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_existing_ids_exclude_sentinels() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(
            LedgerTable::Transactions,
            &[
                tx("t1", "Aldi", 1, None),
                tx("", "Legacy", 2, None),
                tx("backfill", "Legacy", 3, None),
            ],
        )
        .unwrap();

        let ids = db
            .existing_transaction_ids(LedgerTable::Transactions, "backfill")
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("t1"));
    }

    #[test]
    fn test_vendor_history_ordered_oldest_first() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(
            LedgerTable::Transactions,
            &[
                tx("t1", "Bunnings", 300, Some(Category::Car)),
                tx("t2", "Bunnings", 100, Some(Category::RentAndBills)),
                tx("t3", "", 200, Some(Category::Debit)),
                tx("t4", "Mystery", 400, None),
            ],
        )
        .unwrap();

        let history = db.vendor_category_history(LedgerTable::Transactions).unwrap();
        assert_eq!(
            history,
            vec![
                ("Bunnings".to_string(), Category::RentAndBills),
                ("Bunnings".to_string(), Category::Car),
            ]
        );
    }

    #[test]
    fn test_vendor_history_skips_unknown_labels() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(LedgerTable::Transactions, &[tx("t1", "Aldi", 1, None)])
            .unwrap();
        db.conn()
            .unwrap()
            .execute(
                "UPDATE transactions SET category = 'Shopping' WHERE transaction_id = 't1'",
                [],
            )
            .unwrap();

        assert!(db
            .vendor_category_history(LedgerTable::Transactions)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_category_is_write_once() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(
            LedgerTable::Transactions,
            &[
                tx("t1", "Qantas", 1, None),
                tx("t2", "Aldi", 2, Some(Category::Groceries)),
            ],
        )
        .unwrap();

        assert!(db
            .update_category(LedgerTable::Transactions, "t1", Category::Travel)
            .unwrap());
        assert!(!db
            .update_category(LedgerTable::Transactions, "t1", Category::Car)
            .unwrap());
        assert!(!db
            .update_category(LedgerTable::Transactions, "t2", Category::Car)
            .unwrap());
        assert!(!db
            .update_category(LedgerTable::Transactions, "missing", Category::Car)
            .unwrap());

        let listed = db.list_transactions(LedgerTable::Transactions, 10).unwrap();
        assert_eq!(listed[1].category, Some(Category::Travel));
        assert_eq!(listed[0].category, Some(Category::Groceries));
    }

    #[test]
    fn test_uncategorized_transactions() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(
            LedgerTable::Transactions,
            &[
                tx("t1", "Qantas", 2, None),
                tx("t2", "Aldi", 1, Some(Category::Groceries)),
                tx("t3", "Shell", 1, None),
            ],
        )
        .unwrap();

        let pending = db.uncategorized_transactions(LedgerTable::Transactions).unwrap();
        let ids: Vec<_> = pending.iter().map(|t| t.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t1"]);
    }

    #[test]
    fn test_ledger_stats() {
        let db = Database::in_memory().unwrap();
        db.insert_transactions(
            LedgerTable::Transactions,
            &[
                tx("t1", "Qantas", 1, None),
                tx("t2", "Qantas", 2, Some(Category::Travel)),
                tx("t3", "", 3, Some(Category::Debit)),
            ],
        )
        .unwrap();

        let stats = db.ledger_stats(LedgerTable::Transactions).unwrap();
        assert_eq!(
            stats,
            LedgerStats {
                total: 3,
                uncategorized: 1,
                vendors: 1,
            }
        );
        assert_eq!(db.ledger_stats(LedgerTable::Rent).unwrap(), LedgerStats::default());
    }

    #[test]
    fn test_run_lifecycle() {
        let db = Database::in_memory().unwrap();
        let run_id = db.start_run(RunKind::Transactions, Some("acc-1")).unwrap();

        let runs = db.list_runs(10).unwrap();
        assert_eq!(runs[0].status, RunStatus::Running);
        assert!(runs[0].finished_at.is_none());

        db.finish_run(
            run_id,
            &RunCounts {
                fetched: 5,
                skipped: 1,
                duplicates: 2,
                inserted: 2,
                cache_hits: 1,
                classified: 1,
            },
        )
        .unwrap();

        let run = &db.list_runs(10).unwrap()[0];
        assert_eq!(run.kind, RunKind::Transactions);
        assert_eq!(run.account_id.as_deref(), Some("acc-1"));
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.fetched, 5);
        assert_eq!(run.inserted, 2);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_failed_run_records_error() {
        let db = Database::in_memory().unwrap();
        let run_id = db.start_run(RunKind::Recategorize, None).unwrap();
        db.fail_run(run_id, "disk full").unwrap();

        let run = &db.list_runs(10).unwrap()[0];
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("disk full"));
        assert!(run.account_id.is_none());
    }

    #[test]
    fn test_finish_unknown_run_is_not_found() {
        let db = Database::in_memory().unwrap();
        let err = db.finish_run(42, &RunCounts::default()).unwrap_err();
        assert!(matches!(err, crate::error::Error::NotFound(_)));
    }

    #[test]
    fn test_list_runs_most_recent_first() {
        let db = Database::in_memory().unwrap();
        let first = db.start_run(RunKind::Rent, Some("rent-acc")).unwrap();
        let second = db.start_run(RunKind::Transactions, Some("acc-1")).unwrap();

        let runs = db.list_runs(1).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, second);
        assert!(second > first);
    }

    #[test]
    fn test_encrypted_database_requires_key() {
        std::env::remove_var(DB_KEY_ENV);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enc.db");
        let result = Database::new(path.to_str().unwrap());
        assert!(matches!(result, Err(crate::error::Error::Encryption(_))));
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let a = derive_key("passphrase").unwrap();
        let b = derive_key("passphrase").unwrap();
        let c = derive_key("other").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
