use async_trait::async_trait;
use std::sync::Arc;

use super::criteria::Criteria;
use crate::error::StoreError;

/// Storage capability consumed by the query engine.
///
/// `fetch` returns the records in the criteria's sort order and page window;
/// `count` returns how many records match the filters, ignoring the window.
/// The two calls may observe different snapshots under concurrent writes.
#[async_trait]
pub trait Store: Send + Sync {
    type Record: Send;

    async fn fetch(&self, criteria: &Criteria) -> Result<Vec<Self::Record>, StoreError>;

    async fn count(&self, criteria: &Criteria) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    type Record = S::Record;

    async fn fetch(&self, criteria: &Criteria) -> Result<Vec<Self::Record>, StoreError> {
        (**self).fetch(criteria).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64, StoreError> {
        (**self).count(criteria).await
    }
}
