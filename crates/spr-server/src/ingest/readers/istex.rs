//! ISTEX alias-bundle reader: gzip JSONL, one bundle per line.

use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use spr_store::IstexData;
use tracing::{debug, error};

use super::open_dump;

/// Reads ISTEX id bundles. Bundles without any DOI alias cannot be wired
/// into the cascade, so they are counted and skipped.
#[derive(Debug, Clone, Default)]
pub struct IstexReader;

impl IstexReader {
    pub fn new() -> Self {
        Self
    }

    pub fn records(&self, path: &Path) -> Result<IstexRecords> {
        Ok(IstexRecords {
            reader: open_dump(path)?,
            read: 0,
            skipped: 0,
        })
    }
}

pub struct IstexRecords {
    reader: Box<dyn BufRead + Send>,
    read: u64,
    skipped: u64,
}

impl IstexRecords {
    pub fn read(&self) -> u64 {
        self.read
    }

    /// Unparseable lines plus bundles without a DOI.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for IstexRecords {
    type Item = IstexData;

    fn next(&mut self) -> Option<IstexData> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "read error in istex dump, stopping");
                    return None;
                }
            }
            if line.trim().is_empty() {
                continue;
            }
            self.read += 1;
            match serde_json::from_str::<IstexData>(&line) {
                Ok(bundle) if bundle.doi.is_empty() => {
                    self.skipped += 1;
                }
                Ok(bundle) => return Some(bundle),
                Err(e) => {
                    self.skipped += 1;
                    debug!(error = %e, "skipping malformed istex line");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_reads_bundles_and_skips_doiless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("istex.json.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder
            .write_all(
                concat!(
                    r#"{"corpusName":"elsevier","istexId":"ISTEX1","doi":["10.1/a"],"pmid":["111"]}"#,
                    "\n",
                    r#"{"corpusName":"wiley","istexId":"ISTEX2","doi":[]}"#,
                    "\n",
                    "not json\n",
                    r#"{"istexId":"ISTEX3","doi":["10.1/c"],"pii":["S0001"]}"#,
                    "\n",
                )
                .as_bytes(),
            )
            .unwrap();
        encoder.finish().unwrap();

        let reader = IstexReader::new();
        let mut records = reader.records(&path).unwrap();
        let bundles: Vec<IstexData> = records.by_ref().collect();

        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].istex_id.as_deref(), Some("ISTEX1"));
        assert_eq!(bundles[1].pii, vec!["S0001"]);
        assert_eq!(records.read(), 4);
        assert_eq!(records.skipped(), 2);
    }
}
