//! Per-collection search definitions.
//!
//! A domain only decides how raw request parameters become filters, which
//! sort fields it accepts and where its listing lives. Fetching, counting,
//! pagination and links are shared through [`SearchService`].

pub mod event;
pub mod idol;
pub mod tag;

pub use event::EventSearch;
pub use idol::IdolSearch;
pub use tag::TagSearch;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{InputError, SearchError};
use crate::query::{
    Criteria, CriteriaBuilder, LinkTemplate, QueryEngine, RawParams, ResultEnvelope, SortOrder,
    Store,
};

/// Page size policy shared by all listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

pub trait SearchDomain: Send + Sync + 'static {
    const NAME: &'static str;
    const LINKS: LinkTemplate;
    const SORT_FIELDS: &'static [&'static str];
    const DEFAULT_SORT: &'static str;
    const DEFAULT_ORDER: SortOrder;

    /// Translate this domain's filter parameters into conditions.
    fn apply_filters(
        params: &RawParams,
        today: NaiveDate,
        builder: CriteriaBuilder,
    ) -> Result<CriteriaBuilder, InputError>;
}

/// Compile raw parameters for domain `D` into validated criteria.
///
/// Missing `page` becomes 1 and missing `limit` the configured default;
/// values below one are raised to one and `limit` is capped at the maximum.
/// Sort field and order are checked against what the domain allows.
pub fn compile_criteria<D: SearchDomain>(
    params: &RawParams,
    today: NaiveDate,
    limits: &SearchLimits,
) -> Result<Criteria, InputError> {
    let sort_field = match params.get("sort") {
        None => D::DEFAULT_SORT,
        Some(raw) => D::SORT_FIELDS
            .iter()
            .copied()
            .find(|allowed| *allowed == raw)
            .ok_or_else(|| InputError::UnsupportedSortField {
                field: raw.to_string(),
                allowed: D::SORT_FIELDS,
            })?,
    };

    let sort_order = match params.get("order") {
        None => D::DEFAULT_ORDER,
        Some(raw) => SortOrder::parse(raw)?,
    };

    let page = params.get_int("page")?.map_or(1, saturate_u32);
    let limit = params
        .get_int("limit")?
        .map_or(limits.default_limit, saturate_u32);

    let builder = Criteria::builder(sort_field, sort_order)
        .page(page)
        .limit(limit)
        .max_limit(limits.max_limit);

    D::apply_filters(params, today, builder)?.build()
}

fn saturate_u32(value: i64) -> u32 {
    value.clamp(1, u32::MAX as i64) as u32
}

/// Parse a `YYYY-MM-DD` parameter. Malformed dates are dropped, widening
/// the filter instead of failing the request.
pub(crate) fn date_param(params: &RawParams, name: &str) -> Option<NaiveDate> {
    let raw = params.get(name)?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            debug!(target: "catalog::query", param = name, value = raw, error = %e, "Ignoring malformed date");
            None
        }
    }
}

/// Trimmed, non-empty values of a repeatable parameter.
pub(crate) fn list_param(params: &RawParams, name: &str) -> Vec<String> {
    params
        .get_all(name)
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// A search endpoint for one domain over one store.
pub struct SearchService<D, S> {
    engine: QueryEngine<S>,
    limits: SearchLimits,
    _domain: PhantomData<fn() -> D>,
}

impl<D: SearchDomain, S: Store> SearchService<D, S> {
    pub fn new(engine: QueryEngine<S>, limits: SearchLimits) -> Self {
        Self {
            engine,
            limits,
            _domain: PhantomData,
        }
    }

    pub fn engine(&self) -> &QueryEngine<S> {
        &self.engine
    }

    pub fn compile(&self, params: &RawParams) -> Result<Criteria, InputError> {
        compile_criteria::<D>(params, Utc::now().date_naive(), &self.limits)
    }

    pub async fn search(
        &self,
        params: &RawParams,
        cancel: &CancellationToken,
    ) -> Result<ResultEnvelope<S::Record>, SearchError> {
        let criteria = self.compile(params)?;
        debug!(
            target: "catalog::query",
            domain = D::NAME,
            sort = criteria.sort_field(),
            order = %criteria.sort_order(),
            page = criteria.page(),
            limit = criteria.limit(),
            filters = criteria.filters().len(),
            "Compiled search criteria"
        );

        self.engine.search(&criteria, params, &D::LINKS, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let criteria =
            compile_criteria::<TagSearch>(&RawParams::new(), today(), &SearchLimits::default()).unwrap();
        assert_eq!(criteria.page(), 1);
        assert_eq!(criteria.limit(), 20);
        assert_eq!(criteria.offset(), 0);
        assert_eq!(criteria.sort_field(), TagSearch::DEFAULT_SORT);
        assert_eq!(criteria.sort_order(), TagSearch::DEFAULT_ORDER);
    }

    #[test]
    fn test_limit_corrections() {
        let limits = SearchLimits::default();
        let zero = RawParams::new().with("limit", "0");
        let negative = RawParams::new().with("limit", "-7");
        let huge = RawParams::new().with("limit", "5000");

        assert_eq!(compile_criteria::<TagSearch>(&zero, today(), &limits).unwrap().limit(), 1);
        assert_eq!(compile_criteria::<TagSearch>(&negative, today(), &limits).unwrap().limit(), 1);
        assert_eq!(compile_criteria::<TagSearch>(&huge, today(), &limits).unwrap().limit(), 100);
    }

    #[test]
    fn test_page_below_one_is_first_page() {
        let params = RawParams::new().with("page", "0");
        let criteria = compile_criteria::<TagSearch>(&params, today(), &SearchLimits::default()).unwrap();
        assert_eq!(criteria.page(), 1);
    }

    #[test]
    fn test_offset_tracks_page() {
        let params = RawParams::new().with("page", "4").with("limit", "15");
        let criteria = compile_criteria::<TagSearch>(&params, today(), &SearchLimits::default()).unwrap();
        assert_eq!(criteria.offset(), 45);
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        let params = RawParams::new().with("sort", "password");
        let err = compile_criteria::<IdolSearch>(&params, today(), &SearchLimits::default()).unwrap_err();
        assert!(matches!(err, InputError::UnsupportedSortField { ref field, .. } if field == "password"));
    }

    #[test]
    fn test_unknown_order_rejected() {
        let params = RawParams::new().with("order", "sideways");
        assert_eq!(
            compile_criteria::<EventSearch>(&params, today(), &SearchLimits::default()),
            Err(InputError::UnsupportedSortOrder("sideways".into()))
        );
    }

    #[test]
    fn test_non_numeric_page_rejected() {
        let params = RawParams::new().with("page", "two");
        assert!(matches!(
            compile_criteria::<EventSearch>(&params, today(), &SearchLimits::default()),
            Err(InputError::InvalidInteger { .. })
        ));
    }
}
