//! Resolution cascade
//!
//! A request is turned into an ordered plan of strategies: strong
//! identifiers first (DOI, HAL, PMID, PMC, PII, ISTEX), then the fuzzy
//! branches backed by the blocking index (raw citation string, article
//! metadata, journal metadata). The driver walks the plan and answers with
//! the first branch that produces a validated record; a miss or a
//! post-validation mismatch falls over to the next branch, and only
//! upstream or storage failures abort the walk.

use serde_json::Value;
use spr_store::records::normalize_pmc;

use crate::error::ServiceError;
use crate::features::shared::LookupContext;
use crate::matching::{ranking, MatchingError, ReferenceRecord};
use crate::parser::{GrobidClient, ParsedCitation, ParserError};

use super::enrich;
use super::queries::resolve_record::ResolveRecordQuery;

/// Answer when no strategy can even be planned from the parameters.
pub const INSUFFICIENT_PARAMETERS: &str =
    "The supplied parameters were not sufficient to select the query";

const RECORD_NOT_FOUND: &str = "No bibliographical record found";
const POST_VALIDATION_FAILED: &str =
    "Best bibliographical record did not passed the post-validation";
const NO_VALIDATION_METADATA: &str = "No metadata available for post-validation";

/// One branch of the resolution cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    ByDoi,
    ByHalId,
    ByPmid,
    ByPmc,
    ByPii,
    ByIstexId,
    ByBiblioString,
    ByArticleMetadata,
    ByJournalMetadata,
}

/// Why a branch produced no record.
#[derive(Debug)]
pub enum BranchFailure {
    /// Fall over to the next branch; the reason joins the 404 diagnostics.
    Miss(String),
    /// Abort the cascade with this error.
    Fatal(ServiceError),
}

impl From<spr_store::StoreError> for BranchFailure {
    fn from(err: spr_store::StoreError) -> Self {
        BranchFailure::Fatal(err.into())
    }
}

/// Build the ordered strategy plan for `query`.
///
/// A strong-identifier branch enters only when its identifier was supplied
/// non-blank; a metadata branch only when its parameter set is complete.
pub fn plan(query: &ResolveRecordQuery) -> Vec<StrategyKind> {
    let mut plan = Vec::new();

    if query.doi().is_some() {
        plan.push(StrategyKind::ByDoi);
    }
    if query.halid().is_some() {
        plan.push(StrategyKind::ByHalId);
    }
    if query.pmid().is_some() {
        plan.push(StrategyKind::ByPmid);
    }
    if query.pmc().is_some() {
        plan.push(StrategyKind::ByPmc);
    }
    if query.pii().is_some() {
        plan.push(StrategyKind::ByPii);
    }
    if query.istexid().is_some() {
        plan.push(StrategyKind::ByIstexId);
    }
    if query.biblio().is_some() {
        plan.push(StrategyKind::ByBiblioString);
    }
    if query.atitle().is_some() && query.first_author().is_some() {
        plan.push(StrategyKind::ByArticleMetadata);
    }
    if query.jtitle().is_some() && query.volume().is_some() && query.first_page().is_some() {
        plan.push(StrategyKind::ByJournalMetadata);
    }

    plan
}

/// Walk the strategy plan and return the first validated record.
pub async fn resolve(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
) -> Result<String, ServiceError> {
    let plan = plan(query);
    if plan.is_empty() {
        return Err(ServiceError::BadRequest(INSUFFICIENT_PARAMETERS.to_string()));
    }

    let mut diagnostics = Vec::with_capacity(plan.len());
    for kind in plan {
        match attempt(ctx, query, kind).await {
            Ok(payload) => {
                tracing::debug!(strategy = ?kind, "record resolved");
                return Ok(payload);
            },
            Err(BranchFailure::Miss(reason)) => {
                tracing::debug!(strategy = ?kind, %reason, "strategy missed, falling over");
                diagnostics.push(reason);
            },
            Err(BranchFailure::Fatal(error)) => return Err(error),
        }
    }

    Err(ServiceError::NotFound(diagnostics.join("; ")))
}

async fn attempt(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    kind: StrategyKind,
) -> Result<String, BranchFailure> {
    match kind {
        StrategyKind::ByDoi => by_doi(ctx, query, query.doi().unwrap_or_default()),
        StrategyKind::ByHalId => by_hal_id(ctx, query, query.halid().unwrap_or_default()),
        StrategyKind::ByPmid => by_pmid(ctx, query, query.pmid().unwrap_or_default()),
        StrategyKind::ByPmc => by_pmc(ctx, query, query.pmc().unwrap_or_default()),
        StrategyKind::ByPii => by_pii(ctx, query, query.pii().unwrap_or_default()),
        StrategyKind::ByIstexId => by_istex_id(ctx, query, query.istexid().unwrap_or_default()),
        StrategyKind::ByBiblioString => by_biblio(ctx, query).await,
        StrategyKind::ByArticleMetadata => by_article_metadata(ctx, query).await,
        StrategyKind::ByJournalMetadata => by_journal_metadata(ctx, query).await,
    }
}

// ---------------------------------------------------------------------------
// Strong-identifier branches
// ---------------------------------------------------------------------------

fn by_doi(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    doi: &str,
) -> Result<String, BranchFailure> {
    let payload = ctx.store.crossref.get(doi)?;
    conclude(ctx, query, payload, Some(doi))
}

fn by_hal_id(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    halid: &str,
) -> Result<String, BranchFailure> {
    let payload = ctx.store.hal.get_by_hal_id(halid)?;
    conclude(ctx, query, payload, None)
}

fn by_pmid(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    pmid: &str,
) -> Result<String, BranchFailure> {
    let row = ctx.store.pmid.get_by_pmid(pmid)?;
    let doi = row.and_then(|row| row.doi).ok_or_else(|| {
        BranchFailure::Miss(format!("Cannot find bibliographical record with PMID {pmid}"))
    })?;
    by_doi(ctx, query, &doi)
}

fn by_pmc(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    pmc: &str,
) -> Result<String, BranchFailure> {
    let pmc = normalize_pmc(pmc);
    let row = ctx.store.pmid.get_by_pmc(&pmc)?;
    let doi = row.and_then(|row| row.doi).ok_or_else(|| {
        BranchFailure::Miss(format!("Cannot find bibliographical record with PMC ID {pmc}"))
    })?;
    by_doi(ctx, query, &doi)
}

fn by_pii(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    pii: &str,
) -> Result<String, BranchFailure> {
    let bundle = ctx.store.istex.get_by_pii(pii)?;
    let doi = bundle
        .and_then(|bundle| bundle.doi.into_iter().next())
        .ok_or_else(|| {
            BranchFailure::Miss(format!("Cannot find bibliographical record by PII {pii}"))
        })?;
    by_doi(ctx, query, &doi)
}

fn by_istex_id(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    istexid: &str,
) -> Result<String, BranchFailure> {
    let bundle = ctx.store.istex.get_by_istex_id(istexid)?;
    let doi = bundle
        .and_then(|bundle| bundle.doi.into_iter().next())
        .ok_or_else(|| {
            BranchFailure::Miss(format!(
                "Cannot find bibliographical record with ISTEX ID {istexid}"
            ))
        })?;
    by_doi(ctx, query, &doi)
}

/// Shared tail of the strong-identifier branches: reject blank payloads,
/// post-validate against whatever title/author the caller supplied, then
/// enrich with aliases and the OA link.
fn conclude(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    payload: Option<String>,
    doi: Option<&str>,
) -> Result<String, BranchFailure> {
    let payload = match payload {
        Some(payload) if !payload.trim().is_empty() => payload,
        _ => return Err(BranchFailure::Miss(RECORD_NOT_FOUND.to_string())),
    };

    if let Some(reason) = post_validation_mismatch(ctx, query, &payload) {
        return Err(BranchFailure::Miss(reason));
    }

    enrich::enrich_by_doi(&ctx.store, &payload, doi).map_err(BranchFailure::Fatal)
}

/// Compare the resolved record against caller-supplied title and author.
///
/// Each check runs only for the criterion actually supplied; a record
/// lacking the field scores zero and fails that check.
fn post_validation_mismatch(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    payload: &str,
) -> Option<String> {
    if !query.post_validate() {
        return None;
    }
    let supplied_title = query.atitle();
    let supplied_author = query.first_author();
    if supplied_title.is_none() && supplied_author.is_none() {
        return None;
    }

    let (record_title, record_author) = title_and_first_author(payload);
    let threshold = ctx.matching.validation_threshold;

    if let Some(title) = supplied_title {
        let ratio = ranking::similarity(title, record_title.as_deref().unwrap_or_default());
        if ratio < threshold {
            tracing::debug!(ratio, "title failed post-validation");
            return Some(POST_VALIDATION_FAILED.to_string());
        }
    }
    if let Some(author) = supplied_author {
        let ratio = ranking::similarity(author, record_author.as_deref().unwrap_or_default());
        if ratio < threshold {
            tracing::debug!(ratio, "first author failed post-validation");
            return Some(POST_VALIDATION_FAILED.to_string());
        }
    }

    None
}

/// Pull the leading title and the first author's family name out of a
/// serialized record, preferring the author marked `"sequence": "first"`.
fn title_and_first_author(payload: &str) -> (Option<String>, Option<String>) {
    let record: Value = match serde_json::from_str(payload) {
        Ok(record) => record,
        Err(_) => return (None, None),
    };

    let title = record
        .get("title")
        .and_then(|titles| titles.get(0))
        .and_then(Value::as_str)
        .map(str::to_string);

    let authors = record.get("author").and_then(Value::as_array);
    let first_author = authors
        .and_then(|authors| {
            authors
                .iter()
                .find_map(|author| {
                    let is_first =
                        author.get("sequence").and_then(Value::as_str) == Some("first");
                    is_first
                        .then(|| author.get("family").and_then(Value::as_str))
                        .flatten()
                })
                .or_else(|| {
                    authors
                        .iter()
                        .find_map(|author| author.get("family").and_then(Value::as_str))
                })
        })
        .map(str::to_string);

    (title, first_author)
}

// ---------------------------------------------------------------------------
// Metadata branches
// ---------------------------------------------------------------------------

async fn by_article_metadata(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
) -> Result<String, BranchFailure> {
    let atitle = query.atitle().unwrap_or_default();
    let first_author = query.first_author().unwrap_or_default();

    let block = ctx
        .matcher
        .match_by_article(&ctx.store, atitle, first_author)
        .await
        .map_err(matching_failure)?;

    let reference = ReferenceRecord {
        title: Some(atitle.to_string()),
        first_author: Some(first_author.to_string()),
        journal_title: None,
        year: None,
    };

    accept_best(ctx, query, block, &reference)
}

async fn by_journal_metadata(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
) -> Result<String, BranchFailure> {
    let jtitle = query.jtitle().unwrap_or_default();
    let volume = query.volume().unwrap_or_default();
    let first_page = query.first_page().unwrap_or_default();

    let block = ctx
        .matcher
        .match_by_journal(&ctx.store, jtitle, volume, first_page, query.first_author())
        .await
        .map_err(matching_failure)?;

    let reference = ReferenceRecord {
        title: query.atitle().map(str::to_string),
        first_author: query.first_author().map(str::to_string),
        journal_title: Some(jtitle.to_string()),
        year: None,
    };

    accept_best(ctx, query, block, &reference)
}

async fn by_biblio(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
) -> Result<String, BranchFailure> {
    let biblio = query.biblio().unwrap_or_default();

    let block = ctx
        .matcher
        .match_by_biblio(&ctx.store, biblio)
        .await
        .map_err(matching_failure)?;

    // Caller-supplied fields win; the citation parser only fills the gaps.
    let mut reference = ReferenceRecord {
        title: query.atitle().map(str::to_string),
        first_author: query.first_author().map(str::to_string),
        journal_title: query.jtitle().map(str::to_string),
        year: query.year().map(str::to_string),
    };

    if query.parse_reference() {
        if let Some(parser) = &ctx.parser {
            match parse_citation_fields(parser, biblio).await {
                Ok(parsed) => merge_parsed(&mut reference, parsed),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "citation parser not available, ranking on caller-supplied fields only"
                    );
                },
            }
        }
    }

    let ranked = ranking::rank(block, &reference);
    let top = match ranked.into_iter().next() {
        Some(top) => top,
        None => return Err(BranchFailure::Miss(RECORD_NOT_FOUND.to_string())),
    };

    if query.post_validate() {
        if reference.first_author.is_none() {
            return Err(BranchFailure::Miss(NO_VALIDATION_METADATA.to_string()));
        }
        if top.matching_score < ctx.matching.validation_threshold {
            return Err(BranchFailure::Miss(POST_VALIDATION_FAILED.to_string()));
        }
    }

    enrich::enrich_by_doi(&ctx.store, &top.payload, top.doi.as_deref())
        .map_err(BranchFailure::Fatal)
}

/// Rank a candidate block and keep the winner if it clears the threshold.
fn accept_best(
    ctx: &LookupContext,
    query: &ResolveRecordQuery,
    block: Vec<crate::matching::MatchCandidate>,
    reference: &ReferenceRecord,
) -> Result<String, BranchFailure> {
    let ranked = ranking::rank(block, reference);
    let top = match ranked.into_iter().next() {
        Some(top) => top,
        None => return Err(BranchFailure::Miss(RECORD_NOT_FOUND.to_string())),
    };

    if query.post_validate() && top.matching_score < ctx.matching.validation_threshold {
        tracing::debug!(score = top.matching_score, "best candidate under threshold");
        return Err(BranchFailure::Miss(POST_VALIDATION_FAILED.to_string()));
    }

    enrich::enrich_by_doi(&ctx.store, &top.payload, top.doi.as_deref())
        .map_err(BranchFailure::Fatal)
}

async fn parse_citation_fields(
    parser: &GrobidClient,
    biblio: &str,
) -> Result<ParsedCitation, ParserError> {
    parser.ping().await?;
    parser.parse_citation(biblio).await
}

fn merge_parsed(reference: &mut ReferenceRecord, parsed: ParsedCitation) {
    if reference.first_author.is_none() {
        reference.first_author = parsed.best_author().map(str::to_string);
    }
    if reference.title.is_none() {
        reference.title = parsed.title;
    }
    if reference.year.is_none() {
        reference.year = parsed.year;
    }
    if reference.journal_title.is_none() {
        reference.journal_title = parsed.journal_title;
    }
}

fn matching_failure(err: MatchingError) -> BranchFailure {
    match err {
        MatchingError::NoMatch(message) => BranchFailure::Miss(message),
        MatchingError::Upstream(message) => {
            BranchFailure::Fatal(ServiceError::Upstream(message))
        },
        MatchingError::Storage(err) => BranchFailure::Fatal(err.into()),
    }
}
