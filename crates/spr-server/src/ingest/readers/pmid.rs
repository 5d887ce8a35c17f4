//! PMID/PMC/DOI mapping reader: gzip CSV, one mapping row per line.

use std::path::Path;

use anyhow::Result;
use csv::{ReaderBuilder, StringRecord};
use spr_store::records::strip_doi_prefix;
use spr_store::PmidData;
use tracing::{debug, error};

use super::open_dump;

/// Reads the `pmid,pmcid,doi` mapping file. Fields are quoted, blanks are
/// preserved, and short rows (1 or 2 columns) are accepted; rows without a
/// single identifier are counted and skipped.
#[derive(Debug, Clone, Default)]
pub struct PmidReader;

impl PmidReader {
    pub fn new() -> Self {
        Self
    }

    pub fn records(&self, path: &Path) -> Result<PmidRecords> {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(open_dump(path)?);
        Ok(PmidRecords {
            rows: reader.into_records(),
            read: 0,
            skipped: 0,
        })
    }
}

pub struct PmidRecords {
    rows: csv::StringRecordsIntoIter<Box<dyn std::io::BufRead + Send>>,
    read: u64,
    skipped: u64,
}

impl PmidRecords {
    pub fn read(&self) -> u64 {
        self.read
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for PmidRecords {
    type Item = PmidData;

    fn next(&mut self) -> Option<PmidData> {
        loop {
            let row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => {
                    error!(error = %e, "read error in pmid mapping file, stopping");
                    return None;
                }
            };
            self.read += 1;
            if row.len() > 3 {
                self.skipped += 1;
                debug!(columns = row.len(), "skipping over-wide pmid mapping row");
                continue;
            }
            let data = from_row(&row);
            if data.is_empty() {
                self.skipped += 1;
                continue;
            }
            return Some(data);
        }
    }
}

fn from_row(row: &StringRecord) -> PmidData {
    PmidData {
        pmid: column(row, 0),
        pmcid: column(row, 1),
        doi: column(row, 2).map(|doi| strip_doi_prefix(&doi).to_string()),
        license: None,
        subpath: None,
    }
}

fn column(row: &StringRecord, index: usize) -> Option<String> {
    row.get(index)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_csv_gz(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("pmid.csv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap();
        path
    }

    #[test]
    fn test_reads_quoted_rows_preserving_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv_gz(
            dir.path(),
            concat!(
                "\"9999\",\"PMC1234\",\"10.1/a\"\n",
                "\"8888\",\"\",\"10.1/b\"\n",
                "\"7777\",\"PMC5678\"\n",
                "\"\",\"\",\"\"\n",
            ),
        );

        let reader = PmidReader::new();
        let mut records = reader.records(&path).unwrap();
        let rows: Vec<PmidData> = records.by_ref().collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].pmid.as_deref(), Some("9999"));
        assert_eq!(rows[0].pmcid.as_deref(), Some("PMC1234"));
        assert_eq!(rows[0].doi.as_deref(), Some("10.1/a"));
        // blank pmcid preserved as absent, doi still present
        assert_eq!(rows[1].pmcid, None);
        assert_eq!(rows[1].doi.as_deref(), Some("10.1/b"));
        // two-column row accepted
        assert_eq!(rows[2].pmcid.as_deref(), Some("PMC5678"));
        assert_eq!(rows[2].doi, None);
        assert_eq!(records.read(), 4);
        assert_eq!(records.skipped(), 1);
    }

    #[test]
    fn test_strips_doi_org_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv_gz(
            dir.path(),
            "\"1\",\"PMC1\",\"https://doi.org/10.1/a\"\n\"2\",\"PMC2\",\"http://doi.org/10.1/b\"\n",
        );

        let reader = PmidReader::new();
        let rows: Vec<PmidData> = reader.records(&path).unwrap().collect();

        assert_eq!(rows[0].doi.as_deref(), Some("10.1/a"));
        assert_eq!(rows[1].doi.as_deref(), Some("10.1/b"));
    }
}
