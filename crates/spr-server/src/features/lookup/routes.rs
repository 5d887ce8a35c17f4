use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::ServiceError;
use crate::features::shared::LookupContext;

use super::queries::resolve_record::{self, ResolveRecordQuery};

pub fn lookup_routes() -> Router<LookupContext> {
    Router::new()
        .route("/", get(resolve))
        .route("/doi/:doi", get(by_doi))
        .route("/pmid/:pmid", get(by_pmid))
        .route("/pmc/:pmc", get(by_pmc))
        .route("/pii/:pii", get(by_pii))
        .route("/istexid/:istexid", get(by_istexid))
        .route("/halid/:halid", get(by_halid))
}

#[tracing::instrument(
    skip(ctx, query),
    fields(doi = ?query.doi, pmid = ?query.pmid, has_biblio = query.biblio.is_some())
)]
async fn resolve(
    State(ctx): State<LookupContext>,
    Query(query): Query<ResolveRecordQuery>,
) -> Response {
    run_resolution(ctx, query).await
}

async fn by_doi(State(ctx): State<LookupContext>, Path(doi): Path<String>) -> Response {
    run_resolution(
        ctx,
        ResolveRecordQuery {
            doi: Some(doi),
            ..ResolveRecordQuery::default()
        },
    )
    .await
}

async fn by_pmid(State(ctx): State<LookupContext>, Path(pmid): Path<String>) -> Response {
    run_resolution(
        ctx,
        ResolveRecordQuery {
            pmid: Some(pmid),
            ..ResolveRecordQuery::default()
        },
    )
    .await
}

async fn by_pmc(State(ctx): State<LookupContext>, Path(pmc): Path<String>) -> Response {
    run_resolution(
        ctx,
        ResolveRecordQuery {
            pmc: Some(pmc),
            ..ResolveRecordQuery::default()
        },
    )
    .await
}

async fn by_pii(State(ctx): State<LookupContext>, Path(pii): Path<String>) -> Response {
    run_resolution(
        ctx,
        ResolveRecordQuery {
            pii: Some(pii),
            ..ResolveRecordQuery::default()
        },
    )
    .await
}

async fn by_istexid(State(ctx): State<LookupContext>, Path(istexid): Path<String>) -> Response {
    run_resolution(
        ctx,
        ResolveRecordQuery {
            istexid: Some(istexid),
            ..ResolveRecordQuery::default()
        },
    )
    .await
}

async fn by_halid(State(ctx): State<LookupContext>, Path(halid): Path<String>) -> Response {
    run_resolution(
        ctx,
        ResolveRecordQuery {
            halid: Some(halid),
            ..ResolveRecordQuery::default()
        },
    )
    .await
}

/// Run one resolution under the configured wall-clock bound.
///
/// A hit answers with the raw canonical JSON payload; misses and failures
/// answer with the `{"message", "code"}` error shape.
async fn run_resolution(ctx: LookupContext, query: ResolveRecordQuery) -> Response {
    let deadline = ctx.request_timeout;
    match tokio::time::timeout(deadline, resolve_record::handle(ctx, query)).await {
        Ok(Ok(payload)) => json_payload(payload),
        Ok(Err(error)) => error.into_response(),
        Err(_) => ServiceError::Timeout.into_response(),
    }
}

fn json_payload(payload: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    )
        .into_response()
}
