//! Ledger listing commands

use anyhow::Result;
use sift_core::{Database, LedgerTable, VendorCategoryCache};

use super::{format_amount, format_date, truncate};

pub fn cmd_transactions_list(db: &Database, table: LedgerTable, limit: i64) -> Result<()> {
    let transactions = db.list_transactions(table, limit)?;

    if transactions.is_empty() {
        println!("No transactions found. Ingest some with:");
        println!("  sift ingest --feed export.json --account <id>");
        return Ok(());
    }

    let total = db.count_transactions(table)?;

    println!();
    println!("📝 Recent Transactions ({}, {} total)", table, total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let category = if tx.is_categorized() {
            tx.category_label().to_string()
        } else {
            "\x1b[33muncategorized\x1b[0m".to_string()
        };
        let label = if tx.vendor.is_empty() {
            &tx.source
        } else {
            &tx.vendor
        };

        println!(
            "   {} │ {:>10} │ {:<30} │ {}",
            format_date(tx.time),
            format_amount(tx.amount),
            truncate(label, 30),
            category
        );
    }

    Ok(())
}

pub fn cmd_vendors(db: &Database) -> Result<()> {
    let history = db.vendor_category_history(LedgerTable::Transactions)?;
    let cache = VendorCategoryCache::from_history(history);

    if cache.is_empty() {
        println!("No categorized vendors yet.");
        return Ok(());
    }

    println!();
    println!("🏪 Known Vendors ({})", cache.len());
    println!("   ─────────────────────────────────────────────");

    for (vendor, category) in cache.entries() {
        println!("   {:<30} │ {}", truncate(vendor, 30), category);
    }

    Ok(())
}
