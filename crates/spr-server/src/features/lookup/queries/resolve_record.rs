use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::features::shared::LookupContext;

use super::super::strategy;

/// Parameters of one record-resolution request.
///
/// Everything is optional; which strategies run is decided by what was
/// actually supplied. Deserialization names follow the public query-string
/// contract (`firstAuthor`, `postValidate`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolveRecordQuery {
    pub doi: Option<String>,
    pub halid: Option<String>,
    pub pmid: Option<String>,
    pub pmc: Option<String>,
    pub pii: Option<String>,
    pub istexid: Option<String>,
    pub first_author: Option<String>,
    pub atitle: Option<String>,
    pub jtitle: Option<String>,
    pub volume: Option<String>,
    pub first_page: Option<String>,
    pub year: Option<String>,
    pub biblio: Option<String>,
    pub post_validate: Option<bool>,
    pub parse_reference: Option<bool>,
}

impl Request<Result<String, ServiceError>> for ResolveRecordQuery {}

impl crate::cqrs::middleware::Query for ResolveRecordQuery {}

impl ResolveRecordQuery {
    /// Reject requests no strategy can be planned from.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if strategy::plan(self).is_empty() {
            return Err(ServiceError::BadRequest(
                strategy::INSUFFICIENT_PARAMETERS.to_string(),
            ));
        }
        Ok(())
    }

    /// Post-validation of the winning record, on unless disabled.
    pub fn post_validate(&self) -> bool {
        self.post_validate.unwrap_or(true)
    }

    /// Citation pre-parsing of raw strings, on unless disabled.
    pub fn parse_reference(&self) -> bool {
        self.parse_reference.unwrap_or(true)
    }

    pub(crate) fn doi(&self) -> Option<&str> {
        non_blank(&self.doi)
    }

    pub(crate) fn halid(&self) -> Option<&str> {
        non_blank(&self.halid)
    }

    pub(crate) fn pmid(&self) -> Option<&str> {
        non_blank(&self.pmid)
    }

    pub(crate) fn pmc(&self) -> Option<&str> {
        non_blank(&self.pmc)
    }

    pub(crate) fn pii(&self) -> Option<&str> {
        non_blank(&self.pii)
    }

    pub(crate) fn istexid(&self) -> Option<&str> {
        non_blank(&self.istexid)
    }

    pub(crate) fn first_author(&self) -> Option<&str> {
        non_blank(&self.first_author)
    }

    pub(crate) fn atitle(&self) -> Option<&str> {
        non_blank(&self.atitle)
    }

    pub(crate) fn jtitle(&self) -> Option<&str> {
        non_blank(&self.jtitle)
    }

    pub(crate) fn volume(&self) -> Option<&str> {
        non_blank(&self.volume)
    }

    pub(crate) fn first_page(&self) -> Option<&str> {
        non_blank(&self.first_page)
    }

    pub(crate) fn year(&self) -> Option<&str> {
        non_blank(&self.year)
    }

    pub(crate) fn biblio(&self) -> Option<&str> {
        non_blank(&self.biblio)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[tracing::instrument(
    skip(ctx, query),
    fields(doi = ?query.doi, pmid = ?query.pmid, has_biblio = query.biblio.is_some())
)]
pub async fn handle(ctx: LookupContext, query: ResolveRecordQuery) -> Result<String, ServiceError> {
    query.validate()?;
    strategy::resolve(&ctx, &query).await
}
