use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        match raw {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(InputError::UnsupportedSortOrder(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bound of an inclusive range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RangeValue {
    Integer(i64),
    Date(NaiveDate),
}

impl RangeValue {
    fn same_kind(&self, other: &RangeValue) -> bool {
        matches!(
            (self, other),
            (RangeValue::Integer(_), RangeValue::Integer(_)) | (RangeValue::Date(_), RangeValue::Date(_))
        )
    }

    fn le(&self, other: &RangeValue) -> bool {
        match (self, other) {
            (RangeValue::Integer(a), RangeValue::Integer(b)) => a <= b,
            (RangeValue::Date(a), RangeValue::Date(b)) => a <= b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Case-insensitive substring match.
    Contains { value: String },
    /// Exact match; on an array field, matches when any element is equal.
    Equals { value: String },
    /// Array field holds every listed value.
    ContainsAll { values: Vec<String> },
    /// Inclusive range; either bound may be absent.
    Range {
        lower: Option<RangeValue>,
        upper: Option<RangeValue>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub field: &'static str,
    #[serde(flatten)]
    pub condition: Condition,
}

/// A normalized, storage-agnostic search: filters, sort and page window.
///
/// Only produced by [`CriteriaBuilder::build`], which enforces
/// `1 <= limit <= max_limit`, a page of at least one, and ordered range
/// bounds. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Criteria {
    filters: Vec<Filter>,
    sort_field: &'static str,
    sort_order: SortOrder,
    page: u32,
    offset: u64,
    limit: u32,
}

impl Criteria {
    pub fn builder(sort_field: &'static str, sort_order: SortOrder) -> CriteriaBuilder {
        CriteriaBuilder::new(sort_field, sort_order)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filter(&self, field: &str) -> Option<&Condition> {
        self.filters
            .iter()
            .find(|f| f.field == field)
            .map(|f| &f.condition)
    }

    pub fn sort_field(&self) -> &'static str {
        self.sort_field
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// One-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[derive(Debug, Clone)]
pub struct CriteriaBuilder {
    filters: Vec<Filter>,
    sort_field: &'static str,
    sort_order: SortOrder,
    page: u32,
    limit: u32,
    max_limit: u32,
}

impl CriteriaBuilder {
    pub fn new(sort_field: &'static str, sort_order: SortOrder) -> Self {
        Self {
            filters: Vec::new(),
            sort_field,
            sort_order,
            page: 1,
            limit: 20,
            max_limit: 100,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn max_limit(mut self, max_limit: u32) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn contains(self, field: &'static str, value: impl Into<String>) -> Self {
        self.push(field, Condition::Contains { value: value.into() })
    }

    pub fn equals(self, field: &'static str, value: impl Into<String>) -> Self {
        self.push(field, Condition::Equals { value: value.into() })
    }

    pub fn contains_all(self, field: &'static str, values: Vec<String>) -> Self {
        if values.is_empty() {
            return self;
        }
        self.push(field, Condition::ContainsAll { values })
    }

    /// Add an inclusive range. Calling this again for the same field narrows
    /// the existing range to the intersection of both.
    pub fn range(
        mut self,
        field: &'static str,
        lower: Option<RangeValue>,
        upper: Option<RangeValue>,
    ) -> Self {
        if lower.is_none() && upper.is_none() {
            return self;
        }

        let position = self.filters.iter().position(|f| {
            f.field == field && matches!(f.condition, Condition::Range { .. })
        });

        match position {
            Some(index) => {
                if let Condition::Range { lower: l, upper: u } = &mut self.filters[index].condition {
                    *l = tighter(*l, lower, |a, b| b.le(a));
                    *u = tighter(*u, upper, |a, b| a.le(b));
                }
                self
            }
            None => self.push(field, Condition::Range { lower, upper }),
        }
    }

    pub fn build(self) -> Result<Criteria, InputError> {
        for filter in &self.filters {
            if let Condition::Range {
                lower: Some(lower),
                upper: Some(upper),
            } = &filter.condition
            {
                if !lower.same_kind(upper) {
                    return Err(InputError::MixedRange {
                        field: filter.field.to_string(),
                    });
                }
                if !lower.le(upper) {
                    return Err(InputError::InvertedRange {
                        field: filter.field.to_string(),
                    });
                }
            }
        }

        let max_limit = self.max_limit.max(1);
        let limit = self.limit.clamp(1, max_limit);
        let page = self.page.max(1);

        Ok(Criteria {
            filters: self.filters,
            sort_field: self.sort_field,
            sort_order: self.sort_order,
            page,
            offset: (page as u64 - 1) * limit as u64,
            limit,
        })
    }

    fn push(mut self, field: &'static str, condition: Condition) -> Self {
        self.filters.push(Filter { field, condition });
        self
    }
}

/// Keep whichever bound is tighter; `keep_first(a, b)` says `a` already is.
fn tighter(
    current: Option<RangeValue>,
    incoming: Option<RangeValue>,
    keep_first: impl Fn(&RangeValue, &RangeValue) -> bool,
) -> Option<RangeValue> {
    match (current, incoming) {
        (Some(a), Some(b)) if a.same_kind(&b) => Some(if keep_first(&a, &b) { a } else { b }),
        (Some(a), _) => Some(a),
        (None, b) => b,
    }
}
