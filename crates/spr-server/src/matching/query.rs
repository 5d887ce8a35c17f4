//! Search query bodies.
//!
//! Builders for the `_search` requests issued by the matching service. The
//! shapes mirror what the indexer writes: analyzed `title`, `first_author`,
//! `journal`, `abbreviated_journal` and `bibliographic` fields, exact
//! `volume` and `first_page` keywords.

use serde_json::{json, Value};

/// Stored fields fetched with every hit. Everything else stays in the
/// embedded store and is hydrated by DOI or HAL id.
pub const SOURCE_FIELDS: [&str; 8] = [
    "id",
    "DOI",
    "halId",
    "first_author",
    "title",
    "journal",
    "abbreviated_journal",
    "year",
];

/// Extra constraint applied to a raw-biblio query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BiblioFilter {
    /// Plain match on the `bibliographic` field.
    #[default]
    None,
    /// Only consider records that carry a DOI.
    RequireDoi,
    /// Drop one known record from the block.
    ExcludeId(String),
}

/// Disjunctive article query: title and first author each pull candidates in.
pub fn article(atitle: &str, first_author: &str) -> Value {
    json!({
        "bool": {
            "should": [
                { "match": { "title": atitle } },
                { "match": { "first_author": first_author } },
            ]
        }
    })
}

/// Journal query: exact volume and first page, title matched against both
/// the full and the abbreviated journal name, the author as a soft signal.
pub fn journal(jtitle: &str, volume: &str, first_page: &str, first_author: Option<&str>) -> Value {
    let mut should = vec![
        json!({ "match": { "journal": jtitle } }),
        json!({ "match": { "abbreviated_journal": jtitle } }),
    ];
    if let Some(author) = first_author.filter(|author| !author.trim().is_empty()) {
        should.push(json!({ "match": { "first_author": author } }));
    }
    json!({
        "bool": {
            "should": should,
            "must": [
                { "term": { "volume": volume } },
                { "term": { "first_page": first_page } },
            ]
        }
    })
}

/// Raw bibliographical string query, optionally constrained.
pub fn biblio(raw: &str, filter: &BiblioFilter) -> Value {
    match filter {
        BiblioFilter::None => json!({ "match": { "bibliographic": raw } }),
        BiblioFilter::RequireDoi => json!({
            "bool": {
                "must": [ { "exists": { "field": "DOI" } } ],
                "should": [ { "match": { "bibliographic": raw } } ]
            }
        }),
        BiblioFilter::ExcludeId(id) => json!({
            "bool": {
                "should": [ { "match": { "bibliographic": raw } } ],
                "must_not": [ { "term": { "_id": id } } ]
            }
        }),
    }
}

/// Wrap a query into the full request body: first block only, source
/// filtered down to [`SOURCE_FIELDS`].
pub fn search_body(query: Value, block_size: usize) -> Value {
    json!({
        "query": query,
        "from": 0,
        "size": block_size,
        "_source": { "includes": SOURCE_FIELDS },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_query_shape() {
        let query = article("Attention is all you need", "Vaswani");
        assert_eq!(
            query,
            json!({
                "bool": {
                    "should": [
                        { "match": { "title": "Attention is all you need" } },
                        { "match": { "first_author": "Vaswani" } },
                    ]
                }
            })
        );
    }

    #[test]
    fn test_journal_query_with_author() {
        let query = journal("Nature", "577", "706", Some("Senior"));
        assert_eq!(
            query,
            json!({
                "bool": {
                    "should": [
                        { "match": { "journal": "Nature" } },
                        { "match": { "abbreviated_journal": "Nature" } },
                        { "match": { "first_author": "Senior" } },
                    ],
                    "must": [
                        { "term": { "volume": "577" } },
                        { "term": { "first_page": "706" } },
                    ]
                }
            })
        );
    }

    #[test]
    fn test_journal_query_blank_author_dropped() {
        let query = journal("Nature", "577", "706", Some("  "));
        let should = query["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 2);
    }

    #[test]
    fn test_biblio_query_variants() {
        assert_eq!(
            biblio("Doe J. Some paper. 2019.", &BiblioFilter::None),
            json!({ "match": { "bibliographic": "Doe J. Some paper. 2019." } })
        );
        assert_eq!(
            biblio("Doe J. Some paper. 2019.", &BiblioFilter::RequireDoi),
            json!({
                "bool": {
                    "must": [ { "exists": { "field": "DOI" } } ],
                    "should": [ { "match": { "bibliographic": "Doe J. Some paper. 2019." } } ]
                }
            })
        );
        assert_eq!(
            biblio(
                "Doe J. Some paper. 2019.",
                &BiblioFilter::ExcludeId("abc123".to_string())
            ),
            json!({
                "bool": {
                    "should": [ { "match": { "bibliographic": "Doe J. Some paper. 2019." } } ],
                    "must_not": [ { "term": { "_id": "abc123" } } ]
                }
            })
        );
    }

    #[test]
    fn test_search_body_wraps_query() {
        let body = search_body(json!({ "match_all": {} }), 4);
        assert_eq!(body["from"], 0);
        assert_eq!(body["size"], 4);
        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(
            body["_source"]["includes"].as_array().unwrap().len(),
            SOURCE_FIELDS.len()
        );
    }
}
