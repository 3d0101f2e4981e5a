//! Status command

use std::path::Path;

use anyhow::Result;
use sift_core::config::{default_config_path, ClassifierBackend};
use sift_core::db::DB_KEY_ENV;
use sift_core::LedgerTable;

use super::{load_config, open_db};

pub fn cmd_status(db_path: &Path, config_path: Option<&Path>, no_encrypt: bool) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 Sift Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Classifier configuration
    let source = match config_path {
        Some(path) => path.display().to_string(),
        None => match default_config_path() {
            Some(path) if path.exists() => path.display().to_string(),
            _ => "(built-in defaults)".to_string(),
        },
    };
    println!("   Config: {}", source);
    match load_config(config_path) {
        Ok(config) => match config.classifier.backend {
            ClassifierBackend::Mock => println!("   🧪 Classifier: mock"),
            ClassifierBackend::Agent => {
                println!(
                    "   🤖 Classifier: {} @ {}",
                    config.classifier.model, config.classifier.host
                );
                println!("   🔎 Search: {:?}", config.search.provider);
            }
        },
        Err(e) => println!("   ❌ Config error: {:#}", e),
    }

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                for table in [LedgerTable::Transactions, LedgerTable::Rent] {
                    if let Ok(stats) = db.ledger_stats(table) {
                        println!();
                        println!("   {}:", table.table_name());
                        println!("     Rows: {}", stats.total);
                        println!("     Uncategorized: {}", stats.uncategorized);
                        println!("     Vendors: {}", stats.vendors);
                    }
                }
                if let Ok(runs) = db.list_runs(1) {
                    if let Some(last) = runs.first() {
                        println!();
                        println!(
                            "   Last run: {} {} ({})",
                            last.kind,
                            last.started_at.format("%Y-%m-%d %H:%M"),
                            last.status.as_str()
                        );
                    }
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}
