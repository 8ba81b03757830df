//! Criteria compilation targets and the fetch/count query engine.

pub mod criteria;
pub mod engine;
pub mod memory;
pub mod pagination;
pub mod params;
pub mod store;

pub use criteria::{Condition, Criteria, CriteriaBuilder, Filter, RangeValue, SortOrder};
pub use engine::{QueryEngine, ResultEnvelope};
pub use memory::{CatalogSeed, MemoryStore};
pub use pagination::{LinkTemplate, Links, PageMeta};
pub use params::RawParams;
pub use store::Store;
