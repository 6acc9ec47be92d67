//! v1 breakdown queries and the response shapes of the v1 stats endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dimension::Dimension;
use crate::error::QueryError;
use crate::filter::{Filter, encode_v1};
use crate::metric::Metric;
use crate::range::NormalizedRange;

/// One row of a breakdown result, passed through opaquely.
pub type Record = Map<String, Value>;

/// Provider ceiling on rows per page.
pub const MAX_LIMIT: u32 = 1000;
/// Rows per page when the caller does not say otherwise.
pub const DEFAULT_LIMIT: u32 = 100;

/// A single breakdown request against the v1 stats API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownQuery {
    site_id: String,
    property: Dimension,
    range: NormalizedRange,
    metrics: Vec<Metric>,
    limit: u32,
    page: u32,
    filters: Vec<Filter>,
}

impl BreakdownQuery {
    pub fn new(
        site_id: impl Into<String>,
        property: impl Into<Dimension>,
        range: &NormalizedRange,
    ) -> Result<Self, QueryError> {
        let site_id = site_id.into();
        if site_id.trim().is_empty() {
            return Err(QueryError::EmptySiteId);
        }
        Ok(Self {
            site_id,
            property: property.into(),
            range: range.clone(),
            metrics: vec![Metric::Visitors],
            limit: DEFAULT_LIMIT,
            page: 1,
            filters: Vec::new(),
        })
    }

    /// Rows per page, clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Page number; pages start at 1.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Replace the metric list. An empty list keeps the current metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        if !metrics.is_empty() {
            self.metrics = metrics;
        }
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn property(&self) -> &Dimension {
        &self.property
    }

    pub fn range(&self) -> &NormalizedRange {
        &self.range
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Query-string parameters for `GET /v1/stats/breakdown`.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("site_id", self.site_id.clone()),
            ("property", self.property.identifier().into_owned()),
        ];
        params.extend(self.range.v1_params());
        params.push((
            "metrics",
            self.metrics
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ));
        params.push(("limit", self.limit.to_string()));
        params.push(("page", self.page.to_string()));
        if let Some(filters) = encode_v1(&self.filters) {
            params.push(("filters", filters));
        }
        params
    }
}

/// Paging metadata some deployments attach to breakdown responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
}

/// Body of a v1 breakdown response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakdownResult {
    #[serde(default)]
    pub results: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// A site registered with the analytics provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub domain: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: String,
    #[serde(default)]
    pub visitors: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimeseriesResult {
    #[serde(default)]
    pub results: Vec<TimeseriesPoint>,
}

/// Body of `GET /v1/stats/aggregate`: `{"results": {"visitors": {"value": 1}}}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AggregateResult {
    #[serde(default)]
    pub results: Map<String, Value>,
}

impl AggregateResult {
    /// Flatten `{metric: {value: v}}` into `{metric: v}`.
    pub fn into_record(self) -> Record {
        self.results
            .into_iter()
            .map(|(metric, entry)| {
                let value = match entry {
                    Value::Object(mut inner) => inner.remove("value").unwrap_or(Value::Null),
                    other => other,
                };
                (metric, value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Property;
    use crate::range::{NamedRange, normalize, parse_date};
    use serde_json::json;

    fn week() -> NormalizedRange {
        normalize(&NamedRange::Last7Days.into(), parse_date("2024-05-15").unwrap()).unwrap()
    }

    #[test]
    fn empty_site_is_rejected() {
        assert_eq!(
            BreakdownQuery::new("  ", Property::Country, &week()),
            Err(QueryError::EmptySiteId)
        );
    }

    #[test]
    fn limit_and_page_are_clamped() {
        let q = BreakdownQuery::new("example.com", Property::Country, &week())
            .unwrap()
            .with_limit(5000)
            .with_page(0);
        assert_eq!(q.limit(), MAX_LIMIT);
        assert_eq!(q.page(), 1);

        let q = q.with_limit(0);
        assert_eq!(q.limit(), 1);
    }

    #[test]
    fn params_cover_every_field() {
        let q = BreakdownQuery::new("example.com", Property::EventPage, &week())
            .unwrap()
            .with_metrics(vec![Metric::Visitors, Metric::Pageviews])
            .with_limit(50)
            .with_page(3)
            .with_filter(Filter::is(Property::Country, "US"));
        assert_eq!(
            q.to_params(),
            vec![
                ("site_id", "example.com".to_string()),
                ("property", "event:page".to_string()),
                ("period", "7d".to_string()),
                ("metrics", "visitors,pageviews".to_string()),
                ("limit", "50".to_string()),
                ("page", "3".to_string()),
                ("filters", "visit:country==US".to_string()),
            ]
        );
    }

    #[test]
    fn empty_metric_list_keeps_default() {
        let q = BreakdownQuery::new("example.com", Property::Source, &week())
            .unwrap()
            .with_metrics(Vec::new());
        assert_eq!(q.metrics(), &[Metric::Visitors]);
    }

    #[test]
    fn pagination_is_optional() {
        let bare: BreakdownResult =
            serde_json::from_value(json!({"results": [{"page": "/", "visitors": 3}]})).unwrap();
        assert!(bare.pagination.is_none());
        assert_eq!(bare.results.len(), 1);

        let paged: BreakdownResult = serde_json::from_value(json!({
            "results": [],
            "pagination": {"page": 1, "total_pages": 4}
        }))
        .unwrap();
        assert_eq!(
            paged.pagination,
            Some(Pagination {
                page: 1,
                total_pages: 4
            })
        );
    }

    #[test]
    fn aggregate_flattens_values() {
        let agg: AggregateResult = serde_json::from_value(json!({
            "results": {"visitors": {"value": 12}, "bounce_rate": {"value": 40.5}}
        }))
        .unwrap();
        let record = agg.into_record();
        assert_eq!(record["visitors"], json!(12));
        assert_eq!(record["bounce_rate"], json!(40.5));
    }
}
