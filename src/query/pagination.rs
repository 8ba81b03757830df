use serde::Serialize;
use url::form_urlencoded;

use super::criteria::Criteria;
use super::params::RawParams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    /// `total_pages` is never below one, so an empty result still has a
    /// first (and last) page.
    pub fn new(total: u64, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total
            .div_ceil(per_page as u64)
            .clamp(1, u32::MAX as u64) as u32;

        Self {
            total,
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Links {
    pub first: String,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub last: String,
}

/// Where a listing lives and which of its request parameters must survive
/// into navigation links.
#[derive(Debug, Clone, Copy)]
pub struct LinkTemplate {
    pub base_path: &'static str,
    pub echo_params: &'static [&'static str],
}

impl LinkTemplate {
    /// Links for the first, last and (when they exist) neighbouring pages.
    ///
    /// Each link carries `page`, the effective `limit`, every echoed
    /// parameter exactly as the caller sent it, then the effective `sort`
    /// and `order`. Only `page` differs between links.
    pub fn build_links(&self, criteria: &Criteria, params: &RawParams, total_pages: u32) -> Links {
        let total_pages = total_pages.max(1);
        let page = criteria.page();

        Links {
            first: self.url_for(criteria, params, 1),
            prev: (page > 1).then(|| self.url_for(criteria, params, page - 1)),
            next: (page < total_pages).then(|| self.url_for(criteria, params, page + 1)),
            last: self.url_for(criteria, params, total_pages),
        }
    }

    fn url_for(&self, criteria: &Criteria, params: &RawParams, page: u32) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("page", &page.to_string());
        query.append_pair("limit", &criteria.limit().to_string());

        for name in self.echo_params {
            for value in params.get_all(name) {
                query.append_pair(name, value);
            }
        }

        query.append_pair("sort", criteria.sort_field());
        query.append_pair("order", criteria.sort_order().as_str());

        format!("{}?{}", self.base_path, query.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::criteria::SortOrder;

    const TEMPLATE: LinkTemplate = LinkTemplate {
        base_path: "/api/v1/things",
        echo_params: &["name", "tags"],
    };

    fn criteria(page: u32, limit: u32) -> Criteria {
        Criteria::builder("created_at", SortOrder::Desc)
            .page(page)
            .limit(limit)
            .build()
            .unwrap()
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let meta = PageMeta::new(45, 1, 20);
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_prev);
        assert!(meta.has_next);

        let last = PageMeta::new(45, 3, 20);
        assert!(last.has_prev);
        assert!(!last.has_next);
    }

    #[test]
    fn test_exact_multiple_has_no_extra_page() {
        assert_eq!(PageMeta::new(40, 1, 20).total_pages, 2);
        assert_eq!(PageMeta::new(41, 1, 20).total_pages, 3);
    }

    #[test]
    fn test_empty_result_has_one_page() {
        let meta = PageMeta::new(0, 1, 20);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_page_past_the_end() {
        let meta = PageMeta::new(5, 4, 20);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn test_first_page_has_no_prev_link() {
        let links = TEMPLATE.build_links(&criteria(1, 20), &RawParams::new(), 3);
        assert_eq!(links.first, "/api/v1/things?page=1&limit=20&sort=created_at&order=desc");
        assert_eq!(links.prev, None);
        assert_eq!(
            links.next.as_deref(),
            Some("/api/v1/things?page=2&limit=20&sort=created_at&order=desc")
        );
        assert_eq!(links.last, "/api/v1/things?page=3&limit=20&sort=created_at&order=desc");
    }

    #[test]
    fn test_single_page_links_point_to_page_one() {
        let links = TEMPLATE.build_links(&criteria(1, 20), &RawParams::new(), 1);
        assert_eq!(links.first, links.last);
        assert!(links.prev.is_none());
        assert!(links.next.is_none());
    }

    #[test]
    fn test_repeated_and_reserved_values_are_encoded() {
        let params = RawParams::new()
            .with("tags", "live")
            .with("tags", "a&b")
            .with("name", "mika chan")
            .with("ignored", "x");
        let links = TEMPLATE.build_links(&criteria(2, 10), &params, 2);

        assert_eq!(
            links.prev.as_deref(),
            Some("/api/v1/things?page=1&limit=10&name=mika+chan&tags=live&tags=a%26b&sort=created_at&order=desc")
        );
        assert!(!links.last.contains("ignored"));
    }
}
