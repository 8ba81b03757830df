use serde::Serialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::criteria::Criteria;
use super::pagination::{LinkTemplate, Links, PageMeta};
use super::params::RawParams;
use super::store::Store;
use crate::error::SearchError;

/// One page of search results with its navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope<R> {
    pub data: Vec<R>,
    pub meta: PageMeta,
    pub links: Links,
}

/// Runs compiled criteria against a [`Store`].
///
/// Fetch and count are issued together and joined; the first failure wins
/// and drops the sibling operation. An optional deadline and the caller's
/// cancellation token bound how long a search may hold the store.
pub struct QueryEngine<S> {
    store: S,
    deadline: Option<Duration>,
}

impl<S: Store> QueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline.filter(|d| !d.is_zero());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Search and assemble the paginated envelope for `criteria`.
    pub async fn search(
        &self,
        criteria: &Criteria,
        params: &RawParams,
        template: &LinkTemplate,
        cancel: &CancellationToken,
    ) -> Result<ResultEnvelope<S::Record>, SearchError> {
        let (data, total) = self.fetch_and_count(criteria, cancel).await?;

        let meta = PageMeta::new(total, criteria.page(), criteria.limit());
        let links = template.build_links(criteria, params, meta.total_pages);

        Ok(ResultEnvelope { data, meta, links })
    }

    /// Fetch the page and count all matches concurrently.
    pub async fn fetch_and_count(
        &self,
        criteria: &Criteria,
        cancel: &CancellationToken,
    ) -> Result<(Vec<S::Record>, u64), SearchError> {
        let started = Instant::now();

        let joined = async {
            tokio::try_join!(
                async { self.store.fetch(criteria).await.map_err(SearchError::from) },
                async { self.store.count(criteria).await.map_err(SearchError::from) },
            )
        };

        let bounded = async {
            match self.deadline {
                Some(limit) => tokio::time::timeout(limit, joined)
                    .await
                    .unwrap_or_else(|_| Err(SearchError::DeadlineExceeded(limit))),
                None => joined.await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SearchError::Cancelled),
            result = bounded => result,
        };

        match result {
            Ok((mut items, total)) => {
                items.truncate(criteria.limit() as usize);
                debug!(
                    target: "catalog::query",
                    total,
                    returned = items.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Search completed"
                );
                Ok((items, total))
            }
            Err(e) if e.is_cancellation() => {
                warn!(
                    target: "catalog::query",
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Search abandoned"
                );
                Err(e)
            }
            Err(e) => {
                error!(target: "catalog::query", error = %e, "Search failed");
                Err(e)
            }
        }
    }
}
