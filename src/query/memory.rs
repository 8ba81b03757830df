//! In-process [`Store`] over JSON documents.
//!
//! Stands in for the document database: it evaluates every [`Condition`] the
//! criteria can carry, orders by the sort field with missing values last, and
//! applies the offset/limit window.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;
use tokio::sync::RwLock;

use super::criteria::{Condition, Criteria, RangeValue, SortOrder};
use super::store::Store;
use crate::error::{ConfigError, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Value>>,
}

impl MemoryStore {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    pub async fn insert(&self, document: Value) {
        self.documents.write().await.push(document);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Record = Value;

    async fn fetch(&self, criteria: &Criteria) -> Result<Vec<Value>, StoreError> {
        let matcher = Matcher::compile(criteria).map_err(StoreError::fetch)?;
        let documents = self.documents.read().await;

        let mut matched: Vec<&Value> = documents.iter().filter(|doc| matcher.matches(doc)).collect();
        matched.sort_by(|a, b| compare_field(a, b, criteria.sort_field(), criteria.sort_order()));

        Ok(matched
            .into_iter()
            .skip(usize::try_from(criteria.offset()).unwrap_or(usize::MAX))
            .take(criteria.limit() as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64, StoreError> {
        let matcher = Matcher::compile(criteria).map_err(StoreError::count)?;
        let documents = self.documents.read().await;

        Ok(documents.iter().filter(|doc| matcher.matches(doc)).count() as u64)
    }
}

/// Documents for every searchable collection, as stored in a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub idols: Vec<Value>,
    pub events: Vec<Value>,
    pub tags: Vec<Value>,
}

impl CatalogSeed {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let seed_error = |message: String| ConfigError::Seed {
            path: path.display().to_string(),
            message,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| seed_error(e.to_string()))
    }
}

enum Compiled<'a> {
    Contains(Regex),
    Equals(&'a str),
    ContainsAll(&'a [String]),
    Range(Option<RangeValue>, Option<RangeValue>),
}

struct Matcher<'a> {
    filters: Vec<(&'static str, Compiled<'a>)>,
}

impl<'a> Matcher<'a> {
    fn compile(criteria: &'a Criteria) -> Result<Self, String> {
        let mut filters = Vec::with_capacity(criteria.filters().len());

        for filter in criteria.filters() {
            let compiled = match &filter.condition {
                Condition::Contains { value } => {
                    let pattern = format!("(?i){}", regex::escape(value));
                    Compiled::Contains(Regex::new(&pattern).map_err(|e| e.to_string())?)
                }
                Condition::Equals { value } => Compiled::Equals(value),
                Condition::ContainsAll { values } => Compiled::ContainsAll(values),
                Condition::Range { lower, upper } => Compiled::Range(*lower, *upper),
            };
            filters.push((filter.field, compiled));
        }

        Ok(Self { filters })
    }

    fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|(field, compiled)| {
            let Some(value) = doc.get(field) else {
                return false;
            };

            match compiled {
                Compiled::Contains(re) => value.as_str().is_some_and(|s| re.is_match(s)),
                Compiled::Equals(expected) => match value {
                    Value::Array(items) => items.iter().any(|item| scalar_eq(item, expected)),
                    other => scalar_eq(other, expected),
                },
                Compiled::ContainsAll(expected) => match value {
                    Value::Array(items) => expected
                        .iter()
                        .all(|want| items.iter().any(|item| scalar_eq(item, want))),
                    _ => false,
                },
                Compiled::Range(lower, upper) => {
                    in_range(value, lower.as_ref(), Ordering::Less)
                        && in_range(value, upper.as_ref(), Ordering::Greater)
                }
            }
        })
    }
}

fn scalar_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => expected == if *b { "true" } else { "false" },
        _ => false,
    }
}

/// False when `value` sits on the `outside` side of `bound`.
fn in_range(value: &Value, bound: Option<&RangeValue>, outside: Ordering) -> bool {
    let Some(bound) = bound else {
        return true;
    };

    let ordering = match bound {
        RangeValue::Integer(b) => value.as_i64().map(|v| v.cmp(b)),
        RangeValue::Date(b) => value.as_str().and_then(leading_date).map(|v| v.cmp(b)),
    };

    ordering.is_some_and(|o| o != outside)
}

/// Date part of `YYYY-MM-DD` or an RFC 3339 timestamp.
fn leading_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn compare_field(a: &Value, b: &Value, field: &str, order: SortOrder) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(x), Some(y)) => {
            let ordering = compare_values(x, y);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(x: &Value, y: &Value) -> Ordering {
    match (x, y) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            json!({"name": "Mika Sato", "birthdate": "2001-04-03", "tags": ["live", "tokyo"], "created_at": "2024-01-02T00:00:00Z"}),
            json!({"name": "Aoi Kanda", "birthdate": "1998-11-20", "tags": ["live"], "created_at": "2024-01-03T00:00:00Z"}),
            json!({"name": "Rin", "tags": [], "created_at": "2024-01-01T00:00:00Z"}),
        ])
    }

    fn names(docs: &[Value]) -> Vec<&str> {
        docs.iter().map(|d| d["name"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_contains_is_case_insensitive_and_literal() {
        let criteria = Criteria::builder("name", SortOrder::Asc)
            .contains("name", "SATO")
            .build()
            .unwrap();
        assert_eq!(names(&store().fetch(&criteria).await.unwrap()), ["Mika Sato"]);

        let literal = Criteria::builder("name", SortOrder::Asc)
            .contains("name", ".*")
            .build()
            .unwrap();
        assert_eq!(store().count(&literal).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_contains_all_requires_every_tag() {
        let criteria = Criteria::builder("name", SortOrder::Asc)
            .contains_all("tags", vec!["live".into(), "tokyo".into()])
            .build()
            .unwrap();
        assert_eq!(store().count(&criteria).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_date_range_excludes_missing_field() {
        let criteria = Criteria::builder("name", SortOrder::Asc)
            .range(
                "birthdate",
                Some(RangeValue::Date(NaiveDate::from_ymd_opt(1998, 11, 20).unwrap())),
                None,
            )
            .build()
            .unwrap();
        assert_eq!(store().count(&criteria).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sort_missing_last_and_window() {
        let criteria = Criteria::builder("birthdate", SortOrder::Desc)
            .limit(2)
            .build()
            .unwrap();
        let store = store();
        assert_eq!(names(&store.fetch(&criteria).await.unwrap()), ["Mika Sato", "Aoi Kanda"]);

        let second = Criteria::builder("birthdate", SortOrder::Desc)
            .limit(2)
            .page(2)
            .build()
            .unwrap();
        assert_eq!(names(&store.fetch(&second).await.unwrap()), ["Rin"]);
        assert_eq!(store.count(&second).await.unwrap(), 3);
    }
}
