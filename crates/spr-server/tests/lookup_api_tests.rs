//! Integration tests for the lookup API
//!
//! These tests verify:
//! - Strong-identifier resolution (DOI, PMID, PMC, ISTEX) end to end
//! - ID enrichment of resolved records
//! - Post-validation acceptance and rejection
//! - Metadata fallback through the matching service
//! - Error status codes and wire-level message bodies

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use spr_store::records::{IstexData, PmidData};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A search host no test is expected to reach.
const UNREACHABLE_SEARCH: &str = "http://127.0.0.1:9";

/// Issue a GET against the router and decode the JSON body.
async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn article(doi: &str, title: &str, family: &str) -> Value {
    json!({
        "DOI": doi,
        "title": [title],
        "author": [{ "family": family, "sequence": "first" }],
        "container-title": ["Journal of Integration Testing"],
        "type": "journal-article"
    })
}

#[tokio::test]
async fn test_doi_query_resolves_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let record = article("10.1038/nature12373", "A nanophotonic comb", "Brok");
    store
        .crossref
        .put("10.1038/nature12373", &record.to_string())
        .unwrap();

    let app = common::build_app(store, UNREACHABLE_SEARCH);
    let (status, body) = get(app, "/api/v1/lookup?doi=10.1038/NATURE12373").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["DOI"], "10.1038/nature12373");
    assert_eq!(body["title"][0], "A nanophotonic comb");
}

#[tokio::test]
async fn test_pmid_path_enriches_with_linked_identifiers() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let doi = "10.1016/s0370-2693(98)00466-3";
    store
        .crossref
        .put(doi, &article(doi, "Neutrino oscillations revisited", "Kajita").to_string())
        .unwrap();
    store
        .pmid
        .load(
            vec![PmidData {
                pmid: Some("9605854".to_string()),
                pmcid: Some("PMC27594".to_string()),
                doi: Some(doi.to_string()),
                license: None,
                subpath: None,
            }],
            100,
        )
        .unwrap();

    let app = common::build_app(store, UNREACHABLE_SEARCH);
    let (status, body) = get(app, "/api/v1/lookup/pmid/9605854").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["DOI"], doi);
    // The PubMed identifiers ride along on the resolved record.
    assert_eq!(body["pmid"], "9605854");
    assert_eq!(body["pmcid"], "PMC27594");
}

#[tokio::test]
async fn test_bare_pmc_number_is_normalized() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let doi = "10.1016/s0370-2693(98)00466-3";
    store
        .crossref
        .put(doi, &article(doi, "Neutrino oscillations revisited", "Kajita").to_string())
        .unwrap();
    store
        .pmid
        .load(
            vec![PmidData {
                pmid: Some("9605854".to_string()),
                pmcid: Some("PMC27594".to_string()),
                doi: Some(doi.to_string()),
                license: None,
                subpath: None,
            }],
            100,
        )
        .unwrap();

    let app = common::build_app(store, UNREACHABLE_SEARCH);
    // No PMC prefix in the path segment.
    let (status, body) = get(app, "/api/v1/lookup/pmc/27594").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["DOI"], doi);
}

#[tokio::test]
async fn test_istexid_path_and_doi_query_converge() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let doi = "10.1051/jphys:01975003601004500";
    let istex_id = "87699D0C20258C18259DED2A5E63B9A50F3B3363";
    store
        .crossref
        .put(doi, &article(doi, "Ordering in spin glasses", "Toulouse").to_string())
        .unwrap();
    store
        .istex
        .load(
            vec![IstexData {
                corpus_name: Some("edp-sciences".to_string()),
                istex_id: Some(istex_id.to_string()),
                ark: vec!["ark:/67375/HXZ-L8TJ5QMD-D".to_string()],
                doi: vec![doi.to_string()],
                pmid: vec![],
                pmc: vec![],
                pii: vec!["S0370269398004663".to_string()],
                mesh: vec![],
            }],
            100,
        )
        .unwrap();

    let app = common::build_app(store, UNREACHABLE_SEARCH);
    let (status_by_doi, by_doi) =
        get(app.clone(), &format!("/api/v1/lookup?doi={doi}")).await;
    let (status_by_istex, by_istex) =
        get(app, &format!("/api/v1/lookup/istexid/{istex_id}")).await;

    assert_eq!(status_by_doi, StatusCode::OK);
    assert_eq!(status_by_istex, StatusCode::OK);
    assert_eq!(by_doi["istexId"], istex_id);
    assert_eq!(by_doi["ark"], "ark:/67375/HXZ-L8TJ5QMD-D");
    assert_eq!(by_doi["pii"], "S0370269398004663");
    // Both entry points surface the same enriched record.
    assert_eq!(by_doi, by_istex);
}

#[tokio::test]
async fn test_unknown_doi_returns_not_found() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let app = common::build_app(store, UNREACHABLE_SEARCH);

    let (status, body) = get(app, "/api/v1/lookup?doi=10.1234/absent").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("No bibliographical record found"),
        "unexpected message: {}",
        body["message"]
    );
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let app = common::build_app(store, UNREACHABLE_SEARCH);

    let (status, body) = get(app, "/api/v1/lookup").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(
        body["message"],
        "The supplied parameters were not sufficient to select the query"
    );
}

#[tokio::test]
async fn test_post_validation_rejects_title_mismatch() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let doi = "10.5555/attention.1";
    store
        .crossref
        .put(doi, &article(doi, "Attention Is All You Need", "Vaswani").to_string())
        .unwrap();

    let app = common::build_app(store, UNREACHABLE_SEARCH);
    let (status, body) = get(
        app,
        "/api/v1/lookup?doi=10.5555/attention.1&atitle=Completely%20Unrelated%20Topic",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("did not passed the post-validation"),
        "unexpected message: {}",
        body["message"]
    );
}

#[tokio::test]
async fn test_post_validation_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let doi = "10.5555/attention.1";
    store
        .crossref
        .put(doi, &article(doi, "Attention Is All You Need", "Vaswani").to_string())
        .unwrap();

    let app = common::build_app(store, UNREACHABLE_SEARCH);
    let (status, body) = get(
        app,
        "/api/v1/lookup?doi=10.5555/attention.1&atitle=Completely%20Unrelated%20Topic&postValidate=false",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["DOI"], doi);
}

#[tokio::test]
async fn test_metadata_fallback_goes_through_search() {
    let search = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let doi = "10.5555/fallback.1";
    store
        .crossref
        .put(
            doi,
            &article(doi, "Deep Residual Learning for Image Recognition", "He").to_string(),
        )
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/crossref/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": { "hits": [{
                "_score": 42.0,
                "_source": {
                    "id": "10.5555/fallback.1",
                    "DOI": "10.5555/fallback.1",
                    "title": ["Deep Residual Learning for Image Recognition"],
                    "first_author": "He"
                }
            }] }
        })))
        .expect(1)
        .mount(&search)
        .await;

    let app = common::build_app(store, &search.uri());
    let (status, body) = get(
        app,
        "/api/v1/lookup?atitle=Deep%20Residual%20Learning%20for%20Image%20Recognition&firstAuthor=He",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["DOI"], doi);
    assert_eq!(body["author"][0]["family"], "He");
}

#[tokio::test]
async fn test_search_failure_maps_to_bad_gateway() {
    let search = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/crossref/_search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&search)
        .await;

    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let app = common::build_app(store, &search.uri());

    let (status, body) = get(
        app,
        "/api/v1/lookup?atitle=Anything%20At%20All&firstAuthor=Nobody",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 502);
}
