//! Incremental update runs against the Crossref change feed.
//!
//! One run walks the cursor-paged works listing filtered by
//! `from-update-date`, archives every page under the dump directory, and
//! dispatches the validated records to the metadata store and the blocking
//! index. The watermark only advances after every page task has drained; an
//! aborted run leaves it untouched and the next run covers the same ground.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, SecondsFormat, Utc};
use futures::future::join_all;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use spr_common::compress;
use spr_store::LookupStore;

use crate::config::{CrossrefFeedConfig, SearchConfig};
use crate::ingest::feed::{FeedClient, FeedPage, PAGE_ROWS};
use crate::ingest::indexer::SearchIndexer;
use crate::ingest::readers::crossref::CrossrefReader;

const RETRY_DELAY: Duration = Duration::from_secs(2);
const ARCHIVE_COUNTER_START: u64 = 1_000_000;

/// Where a run seeds its `from-update-date` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Scheduled catch-up over the last day, seeded from yesterday.
    Daily,
    /// Catch-up from the stored watermark, for gaps after downtime.
    Gap,
}

impl RunKind {
    fn archive_prefix(self) -> char {
        match self {
            RunKind::Daily => 'D',
            RunKind::Gap => 'G',
        }
    }
}

/// Counters accumulated over one incremental run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: u64,
    /// Items returned by the feed
    pub read: u64,
    /// Items dropped by record validation
    pub rejected: u64,
    /// Records written to the metadata store
    pub stored: u64,
    /// Documents accepted by the blocking index
    pub indexed: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct PageOutcome {
    stored: u64,
    indexed: u64,
}

/// Drives one incremental update end to end.
pub struct IncrementalLoader {
    feed: FeedClient,
    reader: CrossrefReader,
    indexer: SearchIndexer,
    store: LookupStore,
    dump_path: PathBuf,
    clean_archives: bool,
}

impl IncrementalLoader {
    pub fn new(
        feed: &CrossrefFeedConfig,
        search: &SearchConfig,
        store: LookupStore,
    ) -> Result<Self> {
        Ok(Self {
            feed: FeedClient::new(feed)?,
            reader: CrossrefReader::new(&feed.ignore_fields),
            indexer: SearchIndexer::new(search)?,
            store,
            dump_path: PathBuf::from(&feed.dump_path),
            clean_archives: feed.clean_archives,
        })
    }

    /// Run one incremental update.
    ///
    /// A feed failure aborts the run after a single retry, without touching
    /// the watermark. Store and index trouble on individual pages is logged
    /// and absorbed; those records are picked up again on the next run.
    pub async fn run(&self, kind: RunKind) -> Result<RunSummary> {
        let started = Utc::now();
        let from = seed_date(kind, started, &self.store)?;
        let filter_date = from.format("%Y-%m-%d").to_string();
        info!(kind = ?kind, from = %filter_date, "incremental update started");

        let archive = ArchiveWriter::new(&self.dump_path, started, kind);
        let mut summary = RunSummary::default();
        let mut handles: Vec<JoinHandle<PageOutcome>> = Vec::new();
        let mut cursor = "*".to_string();

        loop {
            let page = self.fetch_with_retry(&cursor, &filter_date).await?;
            if page.items.is_empty() {
                break;
            }
            summary.pages += 1;
            if let Err(e) = archive.persist(summary.pages, &page.items) {
                warn!(error = %e, "could not archive feed page");
            }

            let mut records = self.reader.page(&page.items);
            let validated: Vec<Value> = records.by_ref().collect();
            summary.read += page.items.len() as u64;
            summary.rejected += records.rejected();
            handles.push(self.dispatch_page(validated));

            match page.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }

        for outcome in join_all(handles).await {
            match outcome {
                Ok(outcome) => {
                    summary.stored += outcome.stored;
                    summary.indexed += outcome.indexed;
                }
                Err(e) => error!(error = %e, "page task panicked"),
            }
        }

        let watermark = match kind {
            RunKind::Daily => Utc::now(),
            RunKind::Gap => started,
        };
        let watermark = watermark.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.store
            .crossref
            .set_last_indexed_date(&watermark)
            .context("could not persist the ingestion watermark")?;

        if self.clean_archives {
            archive.clean();
        }
        info!(
            pages = summary.pages,
            read = summary.read,
            rejected = summary.rejected,
            stored = summary.stored,
            indexed = summary.indexed,
            watermark = %watermark,
            "incremental update finished"
        );
        Ok(summary)
    }

    async fn fetch_with_retry(&self, cursor: &str, from: &str) -> Result<FeedPage> {
        match self.feed.works_page(cursor, from).await {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!(error = %e, "feed page failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                self.feed
                    .works_page(cursor, from)
                    .await
                    .context("feed page failed twice, aborting the run")
            }
        }
    }

    /// Store then index one page off the fetch loop.
    ///
    /// Storage goes first so a hit on the fresh index always hydrates.
    fn dispatch_page(&self, records: Vec<Value>) -> JoinHandle<PageOutcome> {
        let crossref = self.store.crossref.clone();
        let indexer = self.indexer.clone();
        tokio::spawn(async move {
            let mut outcome = PageOutcome::default();

            let batch = records.clone();
            match tokio::task::spawn_blocking(move || crossref.load(batch, PAGE_ROWS)).await {
                Ok(Ok(loaded)) => outcome.stored = loaded.stored,
                Ok(Err(e)) => error!(error = %e, "page store load failed"),
                Err(e) => error!(error = %e, "page store task panicked"),
            }
            match indexer.index_records(&records).await {
                Ok(indexed) => outcome.indexed = indexed.indexed,
                Err(e) => error!(error = %e, "page indexing failed"),
            }
            outcome
        })
    }
}

/// The date the `from-update-date` filter starts from.
///
/// A gap run without a stored watermark has nothing to catch up from; that
/// state only exists before the first full dump load.
fn seed_date(kind: RunKind, started: DateTime<Utc>, store: &LookupStore) -> Result<NaiveDate> {
    match kind {
        RunKind::Daily => Ok((started - ChronoDuration::days(1)).date_naive()),
        RunKind::Gap => {
            let Some(stored) = store.crossref.last_indexed_date()? else {
                bail!("no ingestion watermark recorded, load a full dump first");
            };
            let date = DateTime::parse_from_rfc3339(&stored)
                .with_context(|| format!("unreadable ingestion watermark '{stored}'"))?;
            Ok(date.with_timezone(&Utc).date_naive())
        }
    }
}

/// Writes feed pages under `{dump_path}/{run date}/` as `D{n}.json.gz` or
/// `G{n}.json.gz`, newline-separated records.
struct ArchiveWriter {
    day_dir: PathBuf,
    prefix: char,
}

impl ArchiveWriter {
    fn new(dump_path: &Path, started: DateTime<Utc>, kind: RunKind) -> Self {
        Self {
            day_dir: dump_path.join(started.format("%Y-%m-%d").to_string()),
            prefix: kind.archive_prefix(),
        }
    }

    fn persist(&self, page_number: u64, items: &[Value]) -> Result<()> {
        fs::create_dir_all(&self.day_dir)?;
        let name = format!(
            "{}{}.json.gz",
            self.prefix,
            ARCHIVE_COUNTER_START + page_number
        );
        let lines = items
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        let packed = compress::gzip(lines.as_bytes())?;
        fs::write(self.day_dir.join(name), packed)?;
        Ok(())
    }

    fn clean(&self) {
        if let Err(e) = fs::remove_dir_all(&self.day_dir) {
            warn!(dir = %self.day_dir.display(), error = %e, "could not remove archive directory");
        }
    }
}
