//! Typed identifier-mapping records.

use serde::{Deserialize, Serialize};

/// PubMed mapping row: PMID ↔ PMC id ↔ DOI, with open-access license
/// details when the article is in the PMC OA subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmidData {
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub pmcid: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub subpath: Option<String>,
}

impl PmidData {
    /// True when the row carries no identifier at all.
    pub fn is_empty(&self) -> bool {
        self.pmid.is_none() && self.pmcid.is_none() && self.doi.is_none()
    }
}

/// ISTEX alias bundle. Field names follow the upstream JSONL dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IstexData {
    #[serde(rename = "corpusName", default)]
    pub corpus_name: Option<String>,
    #[serde(rename = "istexId", default)]
    pub istex_id: Option<String>,
    #[serde(default)]
    pub ark: Vec<String>,
    #[serde(default)]
    pub doi: Vec<String>,
    #[serde(default)]
    pub pmid: Vec<String>,
    #[serde(default)]
    pub pmc: Vec<String>,
    #[serde(default)]
    pub pii: Vec<String>,
    #[serde(default)]
    pub mesh: Vec<String>,
}

impl IstexData {
    /// True when the bundle has neither an ISTEX id nor any alias key.
    pub fn is_empty(&self) -> bool {
        self.istex_id.is_none() && self.doi.is_empty() && self.pii.is_empty()
    }
}

/// Strip a `doi.org` resolver prefix, leaving the bare DOI.
pub fn strip_doi_prefix(doi: &str) -> &str {
    doi.strip_prefix("https://doi.org/")
        .or_else(|| doi.strip_prefix("http://doi.org/"))
        .unwrap_or(doi)
}

/// Ensure a PMC identifier carries the `PMC` prefix.
///
/// An existing prefix is detected case-insensitively and kept as supplied;
/// bare numeric ids get `PMC` prepended.
pub fn normalize_pmc(pmc: &str) -> String {
    if pmc.len() >= 3 && pmc.as_bytes()[..3].eq_ignore_ascii_case(b"PMC") {
        pmc.to_string()
    } else {
        format!("PMC{pmc}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_doi_prefix() {
        assert_eq!(strip_doi_prefix("https://doi.org/10.1000/xyz"), "10.1000/xyz");
        assert_eq!(strip_doi_prefix("http://doi.org/10.1000/xyz"), "10.1000/xyz");
        assert_eq!(strip_doi_prefix("10.1000/xyz"), "10.1000/xyz");
    }

    #[test]
    fn test_normalize_pmc() {
        assert_eq!(normalize_pmc("1234567"), "PMC1234567");
        assert_eq!(normalize_pmc("PMC1234567"), "PMC1234567");
        assert_eq!(normalize_pmc("pmc1234567"), "pmc1234567");
        assert_eq!(normalize_pmc("12"), "PMC12");
    }

    #[test]
    fn test_pmid_data_is_empty() {
        assert!(PmidData::default().is_empty());
        let row = PmidData {
            doi: Some("10.1/x".to_string()),
            ..PmidData::default()
        };
        assert!(!row.is_empty());
    }

    #[test]
    fn test_istex_jsonl_shape() {
        let line = r#"{"corpusName":"elsevier","istexId":"ISTEX123","doi":["10.1/x"],"pmid":["123"]}"#;
        let data: IstexData = serde_json::from_str(line).unwrap();
        assert_eq!(data.istex_id.as_deref(), Some("ISTEX123"));
        assert_eq!(data.corpus_name.as_deref(), Some("elsevier"));
        assert_eq!(data.doi, vec!["10.1/x"]);
        assert_eq!(data.pmid, vec!["123"]);
        assert!(data.ark.is_empty());
        assert!(!data.is_empty());
    }
}
