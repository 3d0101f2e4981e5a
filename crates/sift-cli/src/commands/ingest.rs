//! Ingestion and recategorization commands

use std::path::Path;

use anyhow::{Context, Result};
use sift_core::{
    AccountRef, CategorizeReport, ClassifierClient, Config, Database, JsonFileFeed, LedgerTable,
    MockClassifier, Pipeline, PipelineOptions, StaticFeed,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestFlags {
    pub rent: bool,
    pub no_classify: bool,
    pub json: bool,
}

fn build_classifier(config: &Config) -> Result<ClassifierClient> {
    ClassifierClient::from_config(config).context("Failed to set up classifier")
}

/// Configured classifier, or an inert mock when the run never classifies
pub fn ingest_classifier(config: &Config, classify: bool) -> Result<ClassifierClient> {
    if classify {
        build_classifier(config)
    } else {
        Ok(ClassifierClient::Mock(MockClassifier::new()))
    }
}

fn describe_classifier(classifier: &ClassifierClient) {
    if classifier.is_mock() {
        println!("   🧪 Classifier: mock (SIFT_CLASSIFIER=mock)");
    } else {
        println!("   🤖 Classifier: {}", classifier.model());
    }
}

fn pipeline_options(config: &Config, classify: bool) -> PipelineOptions {
    PipelineOptions {
        backfill_marker: config.ledger.backfill_marker.clone(),
        classify,
    }
}

pub async fn cmd_ingest(
    db: &Database,
    config: &Config,
    feed: &Path,
    account: &AccountRef,
    flags: IngestFlags,
) -> Result<()> {
    if !feed.exists() {
        anyhow::bail!("Feed file not found: {}", feed.display());
    }

    let table = super::ledger_table(flags.rent);
    if !flags.json {
        println!(
            "📥 Ingesting {} into {} from {}...",
            account.account_id,
            table.table_name(),
            feed.display()
        );
    }

    let classify = !flags.rent && !flags.no_classify;
    let classifier = ingest_classifier(config, classify)?;
    if classify && !flags.json {
        describe_classifier(&classifier);
    }

    let pipeline = Pipeline::new(
        db.clone(),
        Box::new(JsonFileFeed::new(feed)),
        classifier,
    )
    .with_options(pipeline_options(config, classify));

    let report = match table {
        LedgerTable::Transactions => pipeline.ingest_transactions(account).await,
        LedgerTable::Rent => pipeline.ingest_rent(account).await,
    }
    .context("Ingest failed")?;

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("📊 Ingest Results");
    println!("   ─────────────────────────────");
    println!("   Fetched:    {}", report.fetched);
    if report.skipped > 0 {
        println!("   ⚠️  Skipped:    {}", report.skipped);
    }
    println!("   Duplicates: {}", report.duplicates);
    println!("   Inserted:   {}", report.inserted);

    if let Some(ref categorization) = report.categorization {
        print_categorization(categorization);
    }

    println!();
    println!("✅ Ingest complete");
    Ok(())
}

pub async fn cmd_recategorize(db: &Database, config: &Config, table: LedgerTable) -> Result<()> {
    println!("🏷️  Recategorizing {}...", table.table_name());

    let classifier = build_classifier(config)?;
    describe_classifier(&classifier);
    // Stored rows only; the feed is never consulted
    let pipeline = Pipeline::new(db.clone(), Box::new(StaticFeed::new()), classifier)
        .with_options(pipeline_options(config, true));

    let report = pipeline
        .recategorize(table)
        .await
        .context("Recategorize failed")?;

    if report.classifier_calls == 0 && report.cache_hits == 0 {
        println!("   Nothing to recategorize.");
        return Ok(());
    }

    print_categorization(&report);
    Ok(())
}

fn print_categorization(report: &CategorizeReport) {
    println!();
    println!("   Cache hits: {}", report.cache_hits);
    println!("   Classified: {}", report.classified);
    if report.unresolved > 0 {
        println!("   Unresolved: {}", report.unresolved);
    }
    if report.classifier_failed {
        println!("   ⚠️  Classifier unavailable; run 'sift recategorize' later");
    }
}
