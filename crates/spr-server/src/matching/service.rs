//! Search client and block assembly.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use spr_store::{LookupStore, StoreResult};

use super::query::{self, BiblioFilter};
use super::{ranking, MatchCandidate, MatchingError};
use crate::config::{MatchingConfig, SearchConfig};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Elasticsearch-compatible blocking index.
///
/// Issues `_search` requests, hydrates every hit with the full metadata
/// JSON from the embedded store and normalizes the block's search scores.
/// Cloning shares the underlying HTTP connection pool.
#[derive(Debug, Clone)]
pub struct MatchingService {
    http: reqwest::Client,
    search_url: String,
    block_size: usize,
}

impl MatchingService {
    pub fn new(search: &SearchConfig, matching: &MatchingConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        let host = search.host.trim_end_matches('/');
        Ok(Self {
            http,
            search_url: format!("{host}/{}/_search", search.index),
            block_size: matching.block_size,
        })
    }

    /// Blocking query over article title and first author.
    pub async fn match_by_article(
        &self,
        store: &LookupStore,
        atitle: &str,
        first_author: &str,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        self.execute(store, query::article(atitle, first_author))
            .await
    }

    /// Blocking query over journal name, volume and first page.
    pub async fn match_by_journal(
        &self,
        store: &LookupStore,
        jtitle: &str,
        volume: &str,
        first_page: &str,
        first_author: Option<&str>,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        self.execute(store, query::journal(jtitle, volume, first_page, first_author))
            .await
    }

    /// Blocking query over a raw bibliographical string.
    pub async fn match_by_biblio(
        &self,
        store: &LookupStore,
        raw: &str,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        self.match_by_biblio_filtered(store, raw, &BiblioFilter::None)
            .await
    }

    /// Raw-string query with an extra constraint on the block.
    pub async fn match_by_biblio_filtered(
        &self,
        store: &LookupStore,
        raw: &str,
        filter: &BiblioFilter,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        self.execute(store, query::biblio(raw, filter)).await
    }

    async fn execute(
        &self,
        store: &LookupStore,
        query: Value,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        let body = query::search_body(query, self.block_size);
        let response = self
            .http
            .post(&self.search_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| MatchingError::Upstream(format!("search request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MatchingError::Upstream(format!(
                "search backend answered {status}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|err| MatchingError::Upstream(format!("unreadable search response: {err}")))?;

        let mut candidates = self.collect_candidates(store, parsed)?;
        if candidates.is_empty() {
            return Err(MatchingError::NoMatch(
                "Cannot find records for the input query.".to_string(),
            ));
        }

        ranking::normalize_blocking_scores(&mut candidates);
        ranking::demote_preprints(&mut candidates);

        tracing::debug!(
            hits = candidates.len(),
            top_doi = candidates[0].doi.as_deref().unwrap_or("-"),
            "matching block assembled"
        );
        Ok(candidates)
    }

    fn collect_candidates(
        &self,
        store: &LookupStore,
        response: SearchResponse,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        let mut candidates = Vec::new();
        for hit in response.hits.hits {
            if candidates.len() >= self.block_size {
                break;
            }

            let source = hit.source;
            let doi = source.doi.filter(|v| !v.trim().is_empty());
            let hal_id = source.hal_id.filter(|v| !v.trim().is_empty());

            let payload = match hydrate(store, doi.as_deref(), hal_id.as_deref())? {
                Some(json) => json,
                None => {
                    tracing::warn!(
                        doi = doi.as_deref().unwrap_or("-"),
                        hal_id = hal_id.as_deref().unwrap_or("-"),
                        "indexed record has no metadata entry in the store, skipping hit"
                    );
                    continue;
                }
            };

            let first_author = first_author_family(&payload).or(source.first_author);

            candidates.push(MatchCandidate {
                record_id: source.id,
                doi,
                hal_id,
                title: source.title.into_iter().next(),
                first_author,
                journal: source.journal.into_iter().next(),
                abbreviated_journal: source.abbreviated_journal.into_iter().next(),
                year: year_to_string(source.year),
                blocking_score: hit.score,
                matching_score: 0.0,
                payload,
            });
        }
        Ok(candidates)
    }
}

/// Full metadata JSON for a hit: Crossref entry by DOI first, HAL entry by
/// HAL id as the fallback.
fn hydrate(
    store: &LookupStore,
    doi: Option<&str>,
    hal_id: Option<&str>,
) -> StoreResult<Option<String>> {
    if let Some(doi) = doi {
        if let Some(json) = store.crossref.get(doi)? {
            return Ok(Some(json));
        }
    }
    if let Some(hal_id) = hal_id {
        if let Some(json) = store.hal.get_by_hal_id(hal_id)? {
            return Ok(Some(json));
        }
    }
    Ok(None)
}

/// Family name of the first author carrying one, straight from the stored
/// metadata JSON. The indexed `first_author` field is only the fallback.
fn first_author_family(payload: &str) -> Option<String> {
    let record: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "stored metadata entry is not valid JSON");
            return None;
        }
    };
    let authors = record.get("author")?.as_array()?;
    for author in authors {
        if let Some(family) = author.get("family").and_then(Value::as_str) {
            return Some(family.to_string());
        }
    }
    None
}

fn year_to_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(year)) => Some(year),
        Some(Value::Number(year)) => Some(year.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: SearchHits,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_score", default)]
    score: f64,
    #[serde(rename = "_source", default)]
    source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
struct HitSource {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
    #[serde(rename = "halId", default)]
    hal_id: Option<String>,
    #[serde(default)]
    first_author: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    journal: Vec<String>,
    #[serde(default)]
    abbreviated_journal: Vec<String>,
    #[serde(default)]
    year: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spr_store::StoreConfig;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_against(mock: &MockServer) -> (MatchingService, LookupStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LookupStore::open(&StoreConfig {
            path: dir.path().to_path_buf(),
            map_size_gb: 1,
            max_readers: 16,
            batch_size: 100,
        })
        .unwrap();
        let search = SearchConfig {
            host: mock.uri(),
            index: "crossref".to_string(),
            indexing_batch_size: 500,
        };
        let matching = MatchingConfig {
            block_size: 4,
            validation_threshold: 0.7,
        };
        let service = MatchingService::new(&search, &matching).unwrap();
        (service, store, dir)
    }

    fn hits_body(hits: Vec<Value>) -> Value {
        json!({ "hits": { "hits": hits } })
    }

    #[tokio::test]
    async fn test_block_hydrated_from_store() {
        let mock = MockServer::start().await;
        let (service, store, _dir) = service_against(&mock).await;

        store
            .crossref
            .put(
                "10.1/known",
                r#"{"DOI":"10.1/known","author":[{"given":"J."},{"family":"Kermit"}]}"#,
            )
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/crossref/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(vec![
                json!({
                    "_score": 12.0,
                    "_source": {
                        "id": "r1",
                        "DOI": "10.1/known",
                        "first_author": "Indexed",
                        "title": ["Deep learning"],
                        "journal": ["Nature"],
                        "year": "2015"
                    }
                }),
                json!({
                    "_score": 4.5,
                    "_source": { "id": "r2", "DOI": "10.9/gone", "title": ["Lost"] }
                }),
            ])))
            .mount(&mock)
            .await;

        let block = service
            .match_by_article(&store, "Deep learning", "Kermit")
            .await
            .unwrap();

        // the un-hydratable hit is dropped, the survivor normalizes to 1.0
        assert_eq!(block.len(), 1);
        assert_eq!(block[0].doi.as_deref(), Some("10.1/known"));
        assert_eq!(block[0].first_author.as_deref(), Some("Kermit"));
        assert_eq!(block[0].year.as_deref(), Some("2015"));
        assert_eq!(block[0].blocking_score, 1.0);
        assert!(block[0].payload.contains("10.1/known"));
    }

    #[tokio::test]
    async fn test_hal_fallback_hydration() {
        let mock = MockServer::start().await;
        let (service, store, _dir) = service_against(&mock).await;

        store
            .hal
            .put("hal-01234567", None, r#"{"halId":"hal-01234567"}"#)
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/crossref/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(vec![json!({
                "_score": 2.0,
                "_source": { "id": "r1", "halId": "hal-01234567", "title": ["Archive only"] }
            })])))
            .mount(&mock)
            .await;

        let block = service
            .match_by_biblio(&store, "Archive only. 2020.")
            .await
            .unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(block[0].hal_id.as_deref(), Some("hal-01234567"));
        assert!(block[0].payload.contains("hal-01234567"));
    }

    #[tokio::test]
    async fn test_empty_block_is_no_match() {
        let mock = MockServer::start().await;
        let (service, store, _dir) = service_against(&mock).await;

        Mock::given(method("POST"))
            .and(path("/crossref/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(vec![])))
            .mount(&mock)
            .await;

        let err = service
            .match_by_article(&store, "Unknown", "Nobody")
            .await
            .unwrap_err();
        match err {
            MatchingError::NoMatch(message) => {
                assert_eq!(message, "Cannot find records for the input query.")
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backend_error_is_upstream() {
        let mock = MockServer::start().await;
        let (service, store, _dir) = service_against(&mock).await;

        Mock::given(method("POST"))
            .and(path("/crossref/_search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock)
            .await;

        let err = service
            .match_by_biblio(&store, "Doe J. Some paper.")
            .await
            .unwrap_err();
        assert!(matches!(err, MatchingError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_close_preprint_top_hit_demoted() {
        let mock = MockServer::start().await;
        let (service, store, _dir) = service_against(&mock).await;

        store
            .crossref
            .put("10.1101/2020.03.01.971242", r#"{"DOI":"10.1101/2020.03.01.971242"}"#)
            .unwrap();
        store
            .crossref
            .put("10.1038/s41586-020-2012-7", r#"{"DOI":"10.1038/s41586-020-2012-7"}"#)
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/crossref/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(vec![
                json!({
                    "_score": 10.0,
                    "_source": { "id": "r1", "DOI": "10.1101/2020.03.01.971242" }
                }),
                json!({
                    "_score": 9.95,
                    "_source": { "id": "r2", "DOI": "10.1038/s41586-020-2012-7" }
                }),
            ])))
            .mount(&mock)
            .await;

        let block = service
            .match_by_biblio(&store, "A close call")
            .await
            .unwrap();
        assert_eq!(block[0].doi.as_deref(), Some("10.1038/s41586-020-2012-7"));
    }

    #[tokio::test]
    async fn test_journal_request_body_shape() {
        let mock = MockServer::start().await;
        let (service, store, _dir) = service_against(&mock).await;

        let expected = json!({
            "query": {
                "bool": {
                    "should": [
                        { "match": { "journal": "Nature" } },
                        { "match": { "abbreviated_journal": "Nature" } },
                    ],
                    "must": [
                        { "term": { "volume": "577" } },
                        { "term": { "first_page": "706" } },
                    ]
                }
            },
            "from": 0,
            "size": 4,
            "_source": { "includes": query::SOURCE_FIELDS },
        });

        Mock::given(method("POST"))
            .and(path("/crossref/_search"))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(vec![])))
            .expect(1)
            .mount(&mock)
            .await;

        let err = service
            .match_by_journal(&store, "Nature", "577", "706", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MatchingError::NoMatch(_)));
    }
}
