use chrono::{Days, Months, NaiveDate};

use super::{date_param, list_param, SearchDomain};
use crate::error::InputError;
use crate::query::{CriteriaBuilder, LinkTemplate, RangeValue, RawParams, SortOrder};

pub struct IdolSearch;

impl SearchDomain for IdolSearch {
    const NAME: &'static str = "idols";
    const LINKS: LinkTemplate = LinkTemplate {
        base_path: "/api/v1/idols",
        echo_params: &[
            "name",
            "nationality",
            "group_id",
            "agency_id",
            "include",
            "age_min",
            "age_max",
            "birthdate_from",
            "birthdate_to",
            "tags",
        ],
    };
    const SORT_FIELDS: &'static [&'static str] = &["name", "birthdate", "created_at"];
    const DEFAULT_SORT: &'static str = "created_at";
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn apply_filters(
        params: &RawParams,
        today: NaiveDate,
        mut builder: CriteriaBuilder,
    ) -> Result<CriteriaBuilder, InputError> {
        if let Some(name) = params.get("name") {
            builder = builder.contains("name", name);
        }
        if let Some(nationality) = params.get("nationality") {
            builder = builder.equals("nationality", nationality);
        }
        if let Some(group_id) = params.get("group_id") {
            builder = builder.equals("group_id", group_id);
        }
        if let Some(agency_id) = params.get("agency_id") {
            builder = builder.equals("agency_id", agency_id);
        }
        builder = builder.contains_all("tags", list_param(params, "tags"));

        let age_min = params.get_non_negative("age_min")?;
        let age_max = params.get_non_negative("age_max")?;
        if let (Some(min), Some(max)) = (age_min, age_max) {
            if min > max {
                return Err(InputError::InvertedRange {
                    field: "age".to_string(),
                });
            }
        }

        let (earliest, latest) = birthdate_window(today, age_min, age_max);
        builder = builder.range(
            "birthdate",
            earliest.map(RangeValue::Date),
            latest.map(RangeValue::Date),
        );

        builder = builder.range(
            "birthdate",
            date_param(params, "birthdate_from").map(RangeValue::Date),
            date_param(params, "birthdate_to").map(RangeValue::Date),
        );

        Ok(builder)
    }
}

/// Birth dates of people aged between `age_min` and `age_max` on `today`.
///
/// A maximum age bounds the earliest birth date: someone is at most `A`
/// years old when born after `today - (A + 1) years`. A minimum age bounds
/// the latest: at least `M` years old means born on or before
/// `today - M years`.
pub fn birthdate_window(
    today: NaiveDate,
    age_min: Option<u32>,
    age_max: Option<u32>,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let earliest = age_max.and_then(|max| {
        years_before(today, max.checked_add(1)?).and_then(|d| d.checked_add_days(Days::new(1)))
    });

    // Past the calendar's range nobody qualifies, so pin to the earliest date.
    let latest = age_min.map(|min| years_before(today, min).unwrap_or(NaiveDate::MIN));

    (earliest, latest)
}

fn years_before(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(years.checked_mul(12)?))
}
