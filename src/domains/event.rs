use chrono::NaiveDate;
use tracing::debug;

use super::{date_param, list_param, SearchDomain};
use crate::error::InputError;
use crate::query::{CriteriaBuilder, LinkTemplate, RangeValue, RawParams, SortOrder};

pub const EVENT_TYPES: &[&str] = &["live", "handshake", "release", "fan_meeting", "online"];

pub struct EventSearch;

impl SearchDomain for EventSearch {
    const NAME: &'static str = "events";
    const LINKS: LinkTemplate = LinkTemplate {
        base_path: "/api/v1/events",
        echo_params: &[
            "event_type",
            "start_date_from",
            "start_date_to",
            "venue_id",
            "performer_id",
            "tags",
        ],
    };
    const SORT_FIELDS: &'static [&'static str] = &["start_date_time", "created_at"];
    const DEFAULT_SORT: &'static str = "start_date_time";
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

    fn apply_filters(
        params: &RawParams,
        _today: NaiveDate,
        mut builder: CriteriaBuilder,
    ) -> Result<CriteriaBuilder, InputError> {
        if let Some(event_type) = params.get("event_type") {
            if EVENT_TYPES.contains(&event_type) {
                builder = builder.equals("event_type", event_type);
            } else {
                debug!(target: "catalog::query", value = event_type, "Ignoring unknown event type");
            }
        }

        // Day granularity: the upper bound covers the whole of its day.
        builder = builder.range(
            "start_date_time",
            date_param(params, "start_date_from").map(RangeValue::Date),
            date_param(params, "start_date_to").map(RangeValue::Date),
        );

        if let Some(venue_id) = params.get("venue_id") {
            builder = builder.equals("venue_id", venue_id);
        }
        if let Some(performer_id) = params.get("performer_id") {
            builder = builder.equals("performer_ids", performer_id);
        }

        Ok(builder.contains_all("tags", list_param(params, "tags")))
    }
}
