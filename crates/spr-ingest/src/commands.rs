//! Subcommand implementations.
//!
//! Each load drains one lazy dump reader into its lookup-table family,
//! committing every `batch_size` records, and logs the reader- and
//! store-side counters when the dump is exhausted.

use std::path::Path;

use anyhow::Result;
use chrono::SecondsFormat;
use serde_json::Value;
use tracing::info;

use spr_server::config::Config;
use spr_server::ingest::readers::{
    CrossrefReader, HalReader, IstexReader, PmidReader, UnpaywallReader,
};
use spr_server::ingest::{IncrementalLoader, IndexSummary, RunKind, SearchIndexer};
use spr_store::LookupStore;

use crate::progress;

/// Load a Crossref metadata dump and advance the ingestion watermark to the
/// newest `indexed.date-time` seen in it.
pub fn load_crossref(config: &Config, store: &LookupStore, input: &Path) -> Result<()> {
    let reader = CrossrefReader::new(&config.crossref_feed.ignore_fields);
    let mut records = reader.records(input)?;
    let pb = progress::records_spinner("loading crossref metadata");

    let summary = store.crossref.load(
        records.by_ref().inspect(|_| pb.inc(1)),
        config.store.batch_size,
    )?;
    pb.finish_and_clear();

    if let Some(latest) = records.latest_indexed() {
        let watermark = latest.to_rfc3339_opts(SecondsFormat::Secs, true);
        store.crossref.set_last_indexed_date(&watermark)?;
        info!(watermark = %watermark, "ingestion watermark advanced");
    }
    info!(
        read = records.read(),
        stored = summary.stored,
        rejected = records.rejected(),
        "crossref load done"
    );
    Ok(())
}

/// Load a PMID/PMC/DOI mapping file.
pub fn load_pmid(config: &Config, store: &LookupStore, input: &Path) -> Result<()> {
    let mut rows = PmidReader::new().records(input)?;
    let pb = progress::records_spinner("loading pmid mappings");

    let summary = store.pmid.load(
        rows.by_ref().inspect(|_| pb.inc(1)),
        config.store.batch_size,
    )?;
    pb.finish_and_clear();

    info!(
        read = rows.read(),
        stored = summary.stored,
        skipped = rows.skipped(),
        rejected = summary.rejected,
        "pmid load done"
    );
    Ok(())
}

/// Load ISTEX identifier bundles.
pub fn load_istex(config: &Config, store: &LookupStore, input: &Path) -> Result<()> {
    let mut bundles = IstexReader::new().records(input)?;
    let pb = progress::records_spinner("loading istex bundles");

    let summary = store.istex.load(
        bundles.by_ref().inspect(|_| pb.inc(1)),
        config.store.batch_size,
    )?;
    pb.finish_and_clear();

    info!(
        read = bundles.read(),
        stored = summary.stored,
        skipped = bundles.skipped(),
        rejected = summary.rejected,
        "istex load done"
    );
    Ok(())
}

/// Load HAL metadata records.
pub fn load_hal(config: &Config, store: &LookupStore, input: &Path) -> Result<()> {
    let mut records = HalReader::new().records(input)?;
    let pb = progress::records_spinner("loading hal records");

    let summary = store.hal.load(
        records.by_ref().inspect(|_| pb.inc(1)),
        config.store.batch_size,
    )?;
    pb.finish_and_clear();

    info!(
        read = records.read(),
        stored = summary.stored,
        skipped = records.skipped(),
        rejected = summary.rejected,
        "hal load done"
    );
    Ok(())
}

/// Load Unpaywall open-access links.
pub fn load_oa(config: &Config, store: &LookupStore, input: &Path) -> Result<()> {
    let mut links = UnpaywallReader::new().records(input)?;
    let pb = progress::records_spinner("loading oa links");

    let summary = store.oa.load(
        links.by_ref().inspect(|_| pb.inc(1)),
        config.store.batch_size,
    )?;
    pb.finish_and_clear();

    info!(
        read = links.read(),
        stored = summary.stored,
        skipped = links.skipped(),
        "oa load done"
    );
    Ok(())
}

/// Rebuild the blocking index from a metadata dump.
pub async fn index(config: &Config, input: &Path) -> Result<()> {
    let reader = CrossrefReader::new(&config.crossref_feed.ignore_fields);
    let mut records = reader.records(input)?;
    let indexer = SearchIndexer::new(&config.search)?;
    let pb = progress::records_spinner("indexing metadata");

    let batch_size = config.search.indexing_batch_size.max(1);
    let mut totals = IndexSummary::default();
    let mut batch: Vec<Value> = Vec::with_capacity(batch_size);
    for record in records.by_ref() {
        batch.push(record);
        if batch.len() >= batch_size {
            totals.absorb(indexer.index_records(&batch).await?);
            pb.inc(batch.len() as u64);
            batch.clear();
        }
    }
    if !batch.is_empty() {
        totals.absorb(indexer.index_records(&batch).await?);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    info!(
        read = records.read(),
        indexed = totals.indexed,
        failed = totals.failed,
        rejected = records.rejected() + totals.skipped,
        "index rebuild done"
    );
    Ok(())
}

/// Run one incremental update against the Crossref change feed.
pub async fn update(config: &Config, store: LookupStore, daily: bool) -> Result<()> {
    let kind = if daily { RunKind::Daily } else { RunKind::Gap };
    let loader = IncrementalLoader::new(&config.crossref_feed, &config.search, store)?;
    let summary = loader.run(kind).await?;
    info!(
        pages = summary.pages,
        read = summary.read,
        stored = summary.stored,
        indexed = summary.indexed,
        rejected = summary.rejected,
        "incremental update done"
    );
    Ok(())
}

/// Print the entry counts of every lookup database as JSON.
pub fn sizes(store: &LookupStore) -> Result<()> {
    let sizes = store.sizes()?;
    println!("{}", serde_json::to_string_pretty(&sizes)?);
    Ok(())
}
