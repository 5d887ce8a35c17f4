//! Client for the external citation parser.
//!
//! A raw bibliographical string carries no field structure; before matching
//! it against the index, a GROBID-style service can segment it into title,
//! authors, container and date. The contract is the GROBID REST API:
//! `GET /isalive` for liveness, `POST /processCitation` returning a TEI
//! `biblStruct`. Parser failures are never fatal to a lookup, callers fall
//! back to whatever fields they already have.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const PARSE_TIMEOUT: Duration = Duration::from_secs(30);
const NO_CONSOLIDATION: &str = "0";

/// Fields recovered from one parsed citation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCitation {
    pub title: Option<String>,
    pub first_author: Option<String>,
    pub monograph_author: Option<String>,
    pub journal_title: Option<String>,
    pub year: Option<String>,
}

impl ParsedCitation {
    /// Analytic first author, falling back to the monograph-level one.
    pub fn best_author(&self) -> Option<&str> {
        self.first_author
            .as_deref()
            .or(self.monograph_author.as_deref())
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("citation parser unreachable: {0}")]
    Transport(String),
    #[error("citation parser answered {0}")]
    BadStatus(u16),
    #[error("unparseable TEI response: {0}")]
    InvalidTei(String),
}

/// HTTP client for one configured GROBID host.
///
/// The host is expected to include the API prefix, e.g.
/// `http://localhost:8070/api`.
#[derive(Debug, Clone)]
pub struct GrobidClient {
    http: reqwest::Client,
    base_url: String,
}

impl GrobidClient {
    pub fn new(host: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(PARSE_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: host.trim_end_matches('/').to_string(),
        })
    }

    /// Liveness probe, called before each parse round-trip.
    pub async fn ping(&self) -> Result<(), ParserError> {
        let response = self
            .http
            .get(format!("{}/isalive", self.base_url))
            .send()
            .await
            .map_err(|err| ParserError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ParserError::BadStatus(response.status().as_u16()));
        }
        Ok(())
    }

    /// Segment one raw citation string. Consolidation stays off, the local
    /// store is the only metadata source.
    pub async fn parse_citation(&self, raw: &str) -> Result<ParsedCitation, ParserError> {
        let response = self
            .http
            .post(format!("{}/processCitation", self.base_url))
            .form(&[("citations", raw), ("consolidateCitation", NO_CONSOLIDATION)])
            .send()
            .await
            .map_err(|err| ParserError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ParserError::BadStatus(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|err| ParserError::Transport(err.to_string()))?;
        parse_tei(&body)
    }
}

/// Extract the ranking fields from a TEI `biblStruct`.
pub fn parse_tei(tei: &str) -> Result<ParsedCitation, ParserError> {
    let bibl: TeiBiblStruct =
        quick_xml::de::from_str(tei).map_err(|err| ParserError::InvalidTei(err.to_string()))?;

    let mut parsed = ParsedCitation::default();

    if let Some(analytic) = &bibl.analytic {
        parsed.title = analytic
            .titles
            .iter()
            .find(|title| title.is_main_article_title())
            .and_then(|title| title.trimmed_text());
        parsed.first_author = surname_of_first_author(&analytic.authors);
    }

    if let Some(monogr) = &bibl.monogr {
        parsed.monograph_author = surname_of_first_author(&monogr.authors);
        parsed.journal_title = monogr
            .titles
            .iter()
            .find(|title| title.level.as_deref() == Some("j"))
            .and_then(|title| title.trimmed_text());
        parsed.year = monogr.imprint.as_ref().and_then(TeiImprint::published_year);
    }

    Ok(parsed)
}

/// Surname of the first author that carries a leading forename marker.
fn surname_of_first_author(authors: &[TeiAuthor]) -> Option<String> {
    authors.iter().find_map(|author| {
        let pers_name = author.pers_name.as_ref()?;
        let has_first_forename = pers_name
            .forenames
            .iter()
            .any(|forename| forename.forename_type.as_deref() == Some("first"));
        if !has_first_forename {
            return None;
        }
        pers_name
            .surname
            .as_deref()
            .map(str::trim)
            .filter(|surname| !surname.is_empty())
            .map(str::to_string)
    })
}

#[derive(Debug, Deserialize)]
struct TeiBiblStruct {
    analytic: Option<TeiAnalytic>,
    monogr: Option<TeiMonogr>,
}

#[derive(Debug, Default, Deserialize)]
struct TeiAnalytic {
    #[serde(rename = "title", default)]
    titles: Vec<TeiTitle>,
    #[serde(rename = "author", default)]
    authors: Vec<TeiAuthor>,
}

#[derive(Debug, Default, Deserialize)]
struct TeiMonogr {
    #[serde(rename = "title", default)]
    titles: Vec<TeiTitle>,
    #[serde(rename = "author", default)]
    authors: Vec<TeiAuthor>,
    imprint: Option<TeiImprint>,
}

#[derive(Debug, Deserialize)]
struct TeiTitle {
    #[serde(rename = "@level")]
    level: Option<String>,
    #[serde(rename = "@type")]
    title_type: Option<String>,
    #[serde(rename = "$text")]
    text: Option<String>,
}

impl TeiTitle {
    fn is_main_article_title(&self) -> bool {
        self.level.as_deref() == Some("a") && self.title_type.as_deref() == Some("main")
    }

    fn trimmed_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct TeiAuthor {
    #[serde(rename = "persName")]
    pers_name: Option<TeiPersName>,
}

#[derive(Debug, Deserialize)]
struct TeiPersName {
    #[serde(rename = "forename", default)]
    forenames: Vec<TeiForename>,
    surname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeiForename {
    #[serde(rename = "@type")]
    forename_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeiImprint {
    #[serde(rename = "date", default)]
    dates: Vec<TeiDate>,
}

impl TeiImprint {
    /// Year component of the published date, `when` being a full or partial
    /// ISO date.
    fn published_year(&self) -> Option<String> {
        self.dates
            .iter()
            .find(|date| date.date_type.as_deref() == Some("published"))
            .and_then(|date| date.when.as_deref())
            .and_then(|when| when.split('-').next())
            .filter(|year| !year.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct TeiDate {
    #[serde(rename = "@type")]
    date_type: Option<String>,
    #[serde(rename = "@when")]
    when: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE_TEI: &str = r#"<biblStruct>
    <analytic>
        <title level="a" type="main">Attention is all you need</title>
        <author>
            <persName><forename type="first">A</forename><surname>Vaswani</surname></persName>
        </author>
        <author>
            <persName><forename type="first">N</forename><surname>Shazeer</surname></persName>
        </author>
    </analytic>
    <monogr>
        <title level="j">Advances in Neural Information Processing Systems</title>
        <imprint>
            <biblScope unit="volume">30</biblScope>
            <date type="published" when="2017-06-12" />
        </imprint>
    </monogr>
</biblStruct>"#;

    #[test]
    fn test_parse_article_tei() {
        let parsed = parse_tei(ARTICLE_TEI).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Attention is all you need"));
        assert_eq!(parsed.first_author.as_deref(), Some("Vaswani"));
        assert_eq!(
            parsed.journal_title.as_deref(),
            Some("Advances in Neural Information Processing Systems")
        );
        assert_eq!(parsed.year.as_deref(), Some("2017"));
        assert_eq!(parsed.best_author(), Some("Vaswani"));
    }

    #[test]
    fn test_monograph_author_fallback() {
        let tei = r#"<biblStruct>
            <monogr>
                <title level="m">Pattern Recognition and Machine Learning</title>
                <author>
                    <persName><forename type="first">C</forename><surname>Bishop</surname></persName>
                </author>
                <imprint><date type="published" when="2006" /></imprint>
            </monogr>
        </biblStruct>"#;
        let parsed = parse_tei(tei).unwrap();
        assert_eq!(parsed.first_author, None);
        assert_eq!(parsed.monograph_author.as_deref(), Some("Bishop"));
        assert_eq!(parsed.best_author(), Some("Bishop"));
        // a monograph title is not a journal title
        assert_eq!(parsed.journal_title, None);
        assert_eq!(parsed.year.as_deref(), Some("2006"));
    }

    #[test]
    fn test_author_without_forename_marker_skipped() {
        let tei = r#"<biblStruct>
            <analytic>
                <author><persName><surname>Anonymous</surname></persName></author>
                <author>
                    <persName><forename type="first">J</forename><surname>Doe</surname></persName>
                </author>
            </analytic>
        </biblStruct>"#;
        let parsed = parse_tei(tei).unwrap();
        assert_eq!(parsed.first_author.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_invalid_tei_is_an_error() {
        assert!(matches!(
            parse_tei("not xml at all <"),
            Err(ParserError::InvalidTei(_))
        ));
    }

    #[tokio::test]
    async fn test_ping() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/isalive"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock)
            .await;

        let client = GrobidClient::new(&mock.uri()).unwrap();
        assert!(client.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_reports_bad_status() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/isalive"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock)
            .await;

        let client = GrobidClient::new(&mock.uri()).unwrap();
        assert!(matches!(
            client.ping().await,
            Err(ParserError::BadStatus(503))
        ));
    }

    #[tokio::test]
    async fn test_parse_citation_round_trip() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/processCitation"))
            .and(body_string_contains("citations="))
            .and(body_string_contains("consolidateCitation=0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_TEI))
            .expect(1)
            .mount(&mock)
            .await;

        let client = GrobidClient::new(&mock.uri()).unwrap();
        let parsed = client
            .parse_citation("Vaswani A, et al. Attention is all you need. NIPS 2017.")
            .await
            .unwrap();
        assert_eq!(parsed.first_author.as_deref(), Some("Vaswani"));
        assert_eq!(parsed.year.as_deref(), Some("2017"));
    }
}
