use mediator::Request;
use spr_store::{LookupStore, SampleEntry};

use crate::error::ServiceError;

/// Default number of entries returned per sample request.
pub const DEFAULT_SAMPLE_TOTAL: usize = 100;

/// Hard cap on entries per sample request.
pub const MAX_SAMPLE_TOTAL: usize = 1000;

/// One keyed view of a table family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTarget {
    CrossrefByDoi,
    PmidByPmid,
    PmidByDoi,
    PmidByPmc,
    IstexByDoi,
    IstexByIstexId,
    IstexByPii,
    HalByHalId,
    HalByDoi,
    OaByDoi,
}

/// Dump up to `total` key/value pairs from one database.
#[derive(Debug, Clone)]
pub struct TableSamplesQuery {
    pub target: SampleTarget,
    pub total: Option<usize>,
}

impl Request<Result<Vec<SampleEntry>, ServiceError>> for TableSamplesQuery {}

impl crate::cqrs::middleware::Query for TableSamplesQuery {}

impl TableSamplesQuery {
    /// Effective sample count, defaulted and capped.
    pub fn total(&self) -> usize {
        self.total.unwrap_or(DEFAULT_SAMPLE_TOTAL).min(MAX_SAMPLE_TOTAL)
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: LookupStore,
    query: TableSamplesQuery,
) -> Result<Vec<SampleEntry>, ServiceError> {
    let limit = query.total();
    let samples = match query.target {
        SampleTarget::CrossrefByDoi => store.crossref.samples(limit)?,
        SampleTarget::PmidByPmid => store.pmid.samples_by_pmid(limit)?,
        SampleTarget::PmidByDoi => store.pmid.samples_by_doi(limit)?,
        SampleTarget::PmidByPmc => store.pmid.samples_by_pmc(limit)?,
        SampleTarget::IstexByDoi => store.istex.samples_by_doi(limit)?,
        SampleTarget::IstexByIstexId => store.istex.samples_by_istex_id(limit)?,
        SampleTarget::IstexByPii => store.istex.samples_by_pii(limit)?,
        SampleTarget::HalByHalId => store.hal.samples_by_hal_id(limit)?,
        SampleTarget::HalByDoi => store.hal.samples_by_doi(limit)?,
        SampleTarget::OaByDoi => store.oa.samples(limit)?,
    };
    Ok(samples)
}
