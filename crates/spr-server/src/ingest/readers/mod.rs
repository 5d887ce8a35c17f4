//! Dump readers for the bibliographic source files.
//!
//! Every source arrives as some container around a stream of records: plain,
//! gzip or xz single files holding line-delimited JSON or one big JSON array,
//! or a `.tar.gz` of JSON-array files (the public Crossref snapshot). The
//! container shape is decided once by [`detect_format`] and decoded into a
//! single lazy iterator of `serde_json::Value` records; the per-source
//! readers layer their validation and post-processing on top.

pub mod crossref;
pub mod hal;
pub mod istex;
pub mod pmid;
pub mod unpaywall;

pub use crossref::{CrossrefReader, CrossrefRecords};
pub use hal::HalReader;
pub use istex::IstexReader;
pub use pmid::PmidReader;
pub use unpaywall::UnpaywallReader;

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde_json::Value;
use tracing::{debug, error};
use xz2::read::XzDecoder;

/// Container shape of a metadata dump file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    /// One JSON record per line.
    Jsonl,
    /// A single JSON array, possibly wrapped as `{"items":[...]}`.
    JsonArray,
    /// A `.tar.gz` archive of JSON-array files.
    TarOfJsonArray,
}

/// Decide the container shape from the file name and the first non-blank
/// line of the decompressed stream.
pub fn detect_format(path: &Path, head: &str) -> DumpFormat {
    if is_tar_name(path) {
        return DumpFormat::TarOfJsonArray;
    }
    let head = head.trim_start();
    if head.starts_with("{\"items\":[") || head.starts_with('[') {
        DumpFormat::JsonArray
    } else {
        DumpFormat::Jsonl
    }
}

fn is_tar_name(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Open a dump file, decompressing `.gz` and `.xz` transparently.
pub fn open_dump(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open dump file: {}", path.display()))?;
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    let reader: Box<dyn Read + Send> = match ext {
        "gz" => Box::new(GzDecoder::new(file)),
        "xz" => Box::new(XzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Sniff the container shape of a file on disk. Archives are decided by
/// name alone, the stream is only opened for single-file dumps.
pub fn sniff_format(path: &Path) -> Result<DumpFormat> {
    if is_tar_name(path) {
        return Ok(DumpFormat::TarOfJsonArray);
    }
    let head = first_non_blank_line(path)?;
    Ok(detect_format(path, &head))
}

fn first_non_blank_line(path: &Path) -> Result<String> {
    let mut reader = open_dump(path)?;
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .with_context(|| format!("failed to read dump head: {}", path.display()))?;
        if read == 0 {
            return Ok(String::new());
        }
        if !line.trim().is_empty() {
            return Ok(line);
        }
    }
}

/// Open a dump as one lazy stream of JSON records, whatever its container.
pub fn json_records(path: &Path) -> Result<JsonRecords> {
    let format = sniff_format(path)?;
    JsonRecords::open(path, format)
}

/// Lazy, single-pass record stream over any [`DumpFormat`].
///
/// Lines that do not parse as JSON are logged, counted in
/// [`JsonRecords::malformed`] and skipped; they never abort the stream.
pub struct JsonRecords {
    inner: RecordsInner,
    malformed: u64,
}

enum RecordsInner {
    Lines(Box<dyn BufRead + Send>),
    Array(std::vec::IntoIter<Value>),
    Tar(mpsc::IntoIter<Result<Value>>),
}

impl JsonRecords {
    pub fn open(path: &Path, format: DumpFormat) -> Result<Self> {
        let inner = match format {
            DumpFormat::Jsonl => RecordsInner::Lines(open_dump(path)?),
            DumpFormat::JsonArray => {
                let mut content = String::new();
                open_dump(path)?
                    .read_to_string(&mut content)
                    .with_context(|| format!("failed to read dump: {}", path.display()))?;
                RecordsInner::Array(drain_array(&content)?.into_iter())
            }
            DumpFormat::TarOfJsonArray => RecordsInner::Tar(spawn_tar_walker(path)?),
        };
        Ok(Self {
            inner,
            malformed: 0,
        })
    }

    /// Number of lines skipped because they were not valid JSON.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

impl Iterator for JsonRecords {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            match &mut self.inner {
                RecordsInner::Lines(reader) => {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => return None,
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "read error in dump stream, stopping");
                            return None;
                        }
                    }
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str(&line) {
                        Ok(value) => return Some(value),
                        Err(e) => {
                            self.malformed += 1;
                            debug!(error = %e, "skipping malformed dump line");
                        }
                    }
                }
                RecordsInner::Array(items) => return items.next(),
                RecordsInner::Tar(entries) => match entries.next()? {
                    Ok(value) => return Some(value),
                    Err(e) => {
                        error!(error = %e, "tar entry could not be decoded, stopping");
                        return None;
                    }
                },
            }
        }
    }
}

/// Pull the record array out of a JSON-array dump, unwrapping the
/// `{"items":[...]}` envelope used by the public snapshot files.
fn drain_array(content: &str) -> Result<Vec<Value>> {
    let parsed: Value =
        serde_json::from_str(content.trim()).context("failed to parse JSON array dump")?;
    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => anyhow::bail!("JSON dump object carries no items array"),
        },
        _ => anyhow::bail!("JSON dump is neither an array nor an items object"),
    }
}

/// Walk a `.tar.gz` of JSON-array files on a dedicated thread, handing
/// records over a bounded channel so only one entry is buffered at a time.
fn spawn_tar_walker(path: &Path) -> Result<mpsc::IntoIter<Result<Value>>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open archive: {}", path.display()))?;
    let (tx, rx) = mpsc::sync_channel::<Result<Value>>(1024);

    std::thread::spawn(move || {
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let entries = match archive.entries().context("failed to read tar entries") {
            Ok(entries) => entries,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        };
        for entry in entries {
            let mut entry = match entry.context("failed to read tar entry") {
                Ok(entry) => entry,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let mut content = String::new();
            if let Err(e) = entry
                .read_to_string(&mut content)
                .context("failed to read tar entry contents")
            {
                let _ = tx.send(Err(e));
                return;
            }
            if content.trim().is_empty() {
                continue;
            }
            let items = match drain_array(&content) {
                Ok(items) => items,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };
            for item in items {
                if tx.send(Ok(item)).is_err() {
                    // receiver dropped, stop decoding
                    return;
                }
            }
        }
    });

    Ok(rx.into_iter())
}
