//! HAL metadata reader: JSONL of HAL JSON documents keyed by `halId`.

use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, error};

use super::open_dump;

/// Reads HAL deposit records. A record must be a JSON object carrying a
/// string `halId`; its `doi` field, when present, feeds the DOI → HAL id
/// reverse table at load time.
#[derive(Debug, Clone, Default)]
pub struct HalReader;

impl HalReader {
    pub fn new() -> Self {
        Self
    }

    pub fn records(&self, path: &Path) -> Result<HalRecords> {
        Ok(HalRecords {
            reader: open_dump(path)?,
            read: 0,
            skipped: 0,
        })
    }
}

pub struct HalRecords {
    reader: Box<dyn BufRead + Send>,
    read: u64,
    skipped: u64,
}

impl HalRecords {
    pub fn read(&self) -> u64 {
        self.read
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for HalRecords {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "read error in hal dump, stopping");
                    return None;
                }
            }
            if line.trim().is_empty() {
                continue;
            }
            self.read += 1;
            match serde_json::from_str::<Value>(&line) {
                Ok(record) if has_hal_id(&record) => return Some(record),
                Ok(_) => self.skipped += 1,
                Err(e) => {
                    self.skipped += 1;
                    debug!(error = %e, "skipping malformed hal line");
                }
            }
        }
    }
}

fn has_hal_id(record: &Value) -> bool {
    record
        .get("halId")
        .and_then(Value::as_str)
        .is_some_and(|hal_id| !hal_id.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_hal_id_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hal.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"halId":"hal-01234567","doi":"10.1/a","title":["A"]}"#,
                "\n",
                r#"{"title":["no id"]}"#,
                "\n",
                r#"{"halId":"hal-07654321","title":["B"]}"#,
                "\n",
            ),
        )
        .unwrap();

        let reader = HalReader::new();
        let mut records = reader.records(&path).unwrap();
        let kept: Vec<Value> = records.by_ref().collect();

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0]["halId"], "hal-01234567");
        assert_eq!(records.read(), 3);
        assert_eq!(records.skipped(), 1);
    }
}
