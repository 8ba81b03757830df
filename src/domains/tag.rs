use chrono::NaiveDate;

use super::SearchDomain;
use crate::error::InputError;
use crate::query::{CriteriaBuilder, LinkTemplate, RawParams, SortOrder};

pub const TAG_CATEGORIES: &[&str] = &["genre", "region", "style", "other"];

pub struct TagSearch;

impl SearchDomain for TagSearch {
    const NAME: &'static str = "tags";
    const LINKS: LinkTemplate = LinkTemplate {
        base_path: "/api/v1/tags",
        echo_params: &["name", "category"],
    };
    const SORT_FIELDS: &'static [&'static str] = &["created_at", "name"];
    const DEFAULT_SORT: &'static str = "created_at";
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn apply_filters(
        params: &RawParams,
        _today: NaiveDate,
        mut builder: CriteriaBuilder,
    ) -> Result<CriteriaBuilder, InputError> {
        if let Some(name) = params.get("name") {
            builder = builder.contains("name", name);
        }

        if let Some(category) = params.get("category") {
            if !TAG_CATEGORIES.contains(&category) {
                return Err(InputError::UnknownValue {
                    param: "category".to_string(),
                    value: category.to_string(),
                });
            }
            builder = builder.equals("category", category);
        }

        Ok(builder)
    }
}
