use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::error::ServiceError;
use crate::features::shared::LookupContext;

use super::queries::table_samples::{self, SampleTarget, TableSamplesQuery};
use super::queries::table_sizes::{self, TableSizesQuery};

pub fn data_routes() -> Router<LookupContext> {
    Router::new()
        .route("/", get(sizes))
        .route("/crossref", get(crossref_samples))
        .route("/pmid/id", get(pmid_samples_by_pmid))
        .route("/pmid/doi", get(pmid_samples_by_doi))
        .route("/pmid/pmc", get(pmid_samples_by_pmc))
        .route("/istex/doi", get(istex_samples_by_doi))
        .route("/istex/id", get(istex_samples_by_istex_id))
        .route("/istex/pii", get(istex_samples_by_pii))
        .route("/hal/id", get(hal_samples_by_hal_id))
        .route("/hal/doi", get(hal_samples_by_doi))
        .route("/oa", get(oa_samples))
}

#[derive(Debug, Deserialize)]
struct SampleParams {
    total: Option<usize>,
}

#[tracing::instrument(skip(ctx))]
async fn sizes(State(ctx): State<LookupContext>) -> Result<Response, DataApiError> {
    let sizes = table_sizes::handle(ctx.store.clone(), TableSizesQuery).await?;
    Ok((StatusCode::OK, Json(sizes)).into_response())
}

async fn crossref_samples(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::CrossrefByDoi, params).await
}

async fn pmid_samples_by_pmid(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::PmidByPmid, params).await
}

async fn pmid_samples_by_doi(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::PmidByDoi, params).await
}

async fn pmid_samples_by_pmc(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::PmidByPmc, params).await
}

async fn istex_samples_by_doi(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::IstexByDoi, params).await
}

async fn istex_samples_by_istex_id(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::IstexByIstexId, params).await
}

async fn istex_samples_by_pii(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::IstexByPii, params).await
}

async fn hal_samples_by_hal_id(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::HalByHalId, params).await
}

async fn hal_samples_by_doi(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::HalByDoi, params).await
}

async fn oa_samples(
    State(ctx): State<LookupContext>,
    Query(params): Query<SampleParams>,
) -> Result<Response, DataApiError> {
    sample_response(ctx, SampleTarget::OaByDoi, params).await
}

async fn sample_response(
    ctx: LookupContext,
    target: SampleTarget,
    params: SampleParams,
) -> Result<Response, DataApiError> {
    let query = TableSamplesQuery {
        target,
        total: params.total,
    };
    let samples = table_samples::handle(ctx.store.clone(), query).await?;
    Ok(ApiResponse::success(samples).into_response())
}

#[derive(Debug)]
enum DataApiError {
    Service(ServiceError),
}

impl From<ServiceError> for DataApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for DataApiError {
    fn into_response(self) -> Response {
        let DataApiError::Service(err) = self;
        match err {
            ServiceError::Overloaded(message) => {
                let error = ErrorResponse::new("SERVICE_OVERLOADED", message);
                (StatusCode::SERVICE_UNAVAILABLE, Json(error)).into_response()
            },
            other => {
                tracing::error!("Data endpoint failure: {}", other);
                let error = ErrorResponse::new("STORAGE_ERROR", "A storage error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for DataApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service(e) => write!(f, "{}", e),
        }
    }
}
