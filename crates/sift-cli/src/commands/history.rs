//! Run history command

use anyhow::Result;
use sift_core::{Database, RunStatus};

use super::truncate;

pub fn cmd_history(db: &Database, limit: i64) -> Result<()> {
    let runs = db.list_runs(limit)?;

    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    println!();
    println!("🕘 Recent Runs");
    println!("   ─────────────────────────────────────────────────────────────");

    for run in runs {
        let status = match run.status {
            RunStatus::Completed => "✅",
            RunStatus::Running => "⏳",
            RunStatus::Failed => "❌",
        };

        println!(
            "   {} [{}] {} {:<12} {} │ fetched {} │ new {} │ dup {} │ cached {} │ classified {}",
            status,
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.kind.as_str(),
            run.account_id.as_deref().unwrap_or("-"),
            run.fetched,
            run.inserted,
            run.duplicates,
            run.cache_hits,
            run.classified
        );

        if let Some(ref error) = run.error {
            println!("      {}", truncate(error, 70));
        }
    }

    Ok(())
}
