//! Alias and open-access enrichment
//!
//! Every successful resolution passes through here before the payload goes
//! out: identifiers known from the other lookup tables (ISTEX, PubMed, HAL)
//! and the open-access link are injected into the record, without ever
//! overwriting a field the record already carries.

use regex::Regex;
use serde_json::{Map, Value};
use spr_store::LookupStore;

use crate::error::ServiceError;

/// Inject aliases and the OA link known for `doi` into `payload`.
///
/// When `doi` is `None` the DOI is recovered from the payload itself; records
/// without any DOI pass through unchanged, as do payloads that are not JSON
/// objects. The returned string is the payload re-serialized only when at
/// least one field was added.
pub fn enrich_by_doi(
    store: &LookupStore,
    payload: &str,
    doi: Option<&str>,
) -> Result<String, ServiceError> {
    let doi = match doi.map(str::to_string).or_else(|| extract_doi(payload)) {
        Some(doi) => doi,
        None => return Ok(payload.to_string()),
    };

    let istex = store.istex.get_by_doi(&doi)?;
    let oa_link = store.oa.get_oa_link(&doi)?;
    let hal_id = store.hal.hal_id_for_doi(&doi)?;

    // The PubMed mapping fills whatever gaps the ISTEX bundle leaves.
    let mut pmid = istex.as_ref().and_then(|bundle| bundle.pmid.first().cloned());
    let mut pmcid = istex.as_ref().and_then(|bundle| bundle.pmc.first().cloned());
    if pmid.is_none() || pmcid.is_none() {
        if let Some(row) = store.pmid.get_by_doi(&doi)? {
            if pmid.is_none() {
                pmid = row.pmid;
            }
            if pmcid.is_none() {
                pmcid = row.pmcid;
            }
        }
    }

    let mut record: Map<String, Value> = match serde_json::from_str(payload) {
        Ok(Value::Object(record)) => record,
        Ok(_) | Err(_) => {
            tracing::warn!(doi = %doi, "stored payload is not a JSON object, skipping enrichment");
            return Ok(payload.to_string());
        },
    };

    let mut changed = false;
    if let Some(bundle) = &istex {
        changed |= insert_if_absent(&mut record, "istexId", bundle.istex_id.clone());
        changed |= insert_if_absent(&mut record, "ark", bundle.ark.first().cloned());
        changed |= insert_if_absent(&mut record, "mesh", bundle.mesh.first().cloned());
        changed |= insert_if_absent(&mut record, "pii", bundle.pii.first().cloned());
    }
    changed |= insert_if_absent(&mut record, "pmid", pmid);
    changed |= insert_if_absent(&mut record, "pmcid", pmcid);
    changed |= insert_if_absent(&mut record, "halId", hal_id);
    changed |= insert_if_absent(&mut record, "oaLink", oa_link);

    if !changed {
        return Ok(payload.to_string());
    }

    serde_json::to_string(&record)
        .map_err(|err| ServiceError::Internal(format!("payload re-serialization failed: {err}")))
}

/// Pull the first DOI out of a serialized Crossref record.
pub fn extract_doi(payload: &str) -> Option<String> {
    let pattern = Regex::new(r#""DOI"\s?:\s?"(10\.\d{4,5}/[^"\s]+[^;,.\s])""#).ok()?;
    pattern
        .captures(payload)?
        .get(1)
        .map(|capture| capture.as_str().to_string())
}

fn insert_if_absent(record: &mut Map<String, Value>, key: &str, value: Option<String>) -> bool {
    if let Some(value) = value {
        if !record.contains_key(key) {
            record.insert(key.to_string(), Value::String(value));
            return true;
        }
    }
    false
}
