//! Request and response bodies for the v2 query endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::breakdown::MAX_LIMIT;
use crate::dimension::{Dimension, Property};
use crate::filter::Filter;
use crate::metric::Metric;
use crate::range::NormalizedRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPagination {
    pub limit: u32,
    pub offset: u32,
}

/// Body of `POST /v2/query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub site_id: String,
    pub metrics: Vec<Metric>,
    pub date_range: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<QueryPagination>,
}

impl QueryRequest {
    pub fn new(site_id: impl Into<String>, range: &NormalizedRange) -> Self {
        Self {
            site_id: site_id.into(),
            metrics: vec![Metric::Visitors],
            date_range: range.v2_date_range(),
            dimensions: Vec::new(),
            filters: Vec::new(),
            pagination: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        if !metrics.is_empty() {
            self.metrics = metrics;
        }
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        self.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: impl Into<Dimension>) -> Self {
        self.dimensions.push(dimension.into());
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    /// Translate a 1-based page into the endpoint's limit/offset pair.
    ///
    /// `limit` is clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn with_page(mut self, limit: u32, page: u32) -> Self {
        let limit = limit.clamp(1, MAX_LIMIT);
        let page = page.max(1);
        self.pagination = Some(QueryPagination {
            limit,
            offset: (page - 1).saturating_mul(limit),
        });
        self
    }

    /// Default shape used by tools that only name a site: daily visitors.
    pub fn daily_visitors(site_id: impl Into<String>, range: &NormalizedRange) -> Self {
        Self::new(site_id, range).with_dimension(Property::TimeDay)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    #[serde(default)]
    pub metrics: Vec<Value>,
    #[serde(default)]
    pub dimensions: Vec<Value>,
}

/// Body returned by `POST /v2/query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<QueryRow>,
    #[serde(default)]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub query: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{NamedRange, normalize, parse_date};
    use serde_json::json;

    #[test]
    fn serializes_request_body() {
        let range =
            normalize(&NamedRange::Last7Days.into(), parse_date("2024-05-15").unwrap()).unwrap();
        let request = QueryRequest::daily_visitors("example.com", &range)
            .with_filters(vec![Filter::is(Property::EventPage, "/")])
            .with_page(50, 3);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "site_id": "example.com",
                "metrics": ["visitors"],
                "date_range": "7d",
                "dimensions": ["time:day"],
                "filters": [["is", "event:page", ["/"]]],
                "pagination": {"limit": 50, "offset": 100}
            })
        );
    }

    #[test]
    fn page_limit_is_clamped() {
        let range = normalize(&NamedRange::Today.into(), parse_date("2024-05-15").unwrap()).unwrap();
        let request = QueryRequest::new("a.com", &range).with_page(50_000, 2);
        let pagination = request.pagination.unwrap();
        assert_eq!(pagination.limit, MAX_LIMIT);
        assert_eq!(pagination.offset, MAX_LIMIT);

        let request = QueryRequest::new("a.com", &range).with_page(0, 0);
        let pagination = request.pagination.unwrap();
        assert_eq!((pagination.limit, pagination.offset), (1, 0));
    }

    #[test]
    fn omits_empty_dimensions() {
        let range = normalize(&NamedRange::Today.into(), parse_date("2024-05-15").unwrap()).unwrap();
        let body = serde_json::to_value(QueryRequest::new("a.com", &range)).unwrap();
        assert!(body.get("dimensions").is_none());
        assert!(body.get("pagination").is_none());
        assert_eq!(body["filters"], json!([]));
    }

    #[test]
    fn parses_response_rows() {
        let response: QueryResponse = serde_json::from_value(json!({
            "results": [{"metrics": [10], "dimensions": ["2024-05-14"]}],
            "meta": {},
            "query": {"site_id": "a.com"}
        }))
        .unwrap();
        assert_eq!(response.results[0].metrics, vec![json!(10)]);
        assert_eq!(response.query["site_id"], json!("a.com"));
    }
}
