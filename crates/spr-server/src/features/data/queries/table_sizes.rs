use std::collections::BTreeMap;

use mediator::Request;
use serde::{Deserialize, Serialize};
use spr_store::LookupStore;

use crate::error::ServiceError;

/// Entry counts for every named database.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TableSizesQuery;

impl Request<Result<BTreeMap<String, u64>, ServiceError>> for TableSizesQuery {}

impl crate::cqrs::middleware::Query for TableSizesQuery {}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: LookupStore,
    _query: TableSizesQuery,
) -> Result<BTreeMap<String, u64>, ServiceError> {
    Ok(store.sizes()?)
}
