//! MCP tool definitions.
//!
//! Parameters are accepted loosely and validated here, so a malformed call
//! comes back as an error result the agent can read instead of a protocol
//! failure.

use chrono::NaiveDate;
use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sitepulse_core::{
    DEFAULT_LIMIT, Dimension, Filter, METRIC_ALIASES, Metric, NamedRange, Property,
    QueryRequest, TimeRangeSpec, map_metrics, normalize,
};
use sitepulse_ops::stats::{DEFAULT_STATS_LIMIT, PageRequest};

use crate::server::SitepulseMcpServer;

// ---------------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct GetBreakdownParams {
    /// Site domain as registered in Plausible (e.g. "example.com").
    #[serde(default)]
    pub site_id: Option<Value>,
    /// Metric names or aliases, as a list or comma-separated string
    /// (default ["visitors"]).
    #[serde(default)]
    pub metrics: Option<Value>,
    /// Dimensions such as "visit:source" or "time:day" (default ["time:day"]).
    #[serde(default)]
    pub dimensions: Option<Value>,
    /// "today", "7d", "30d", "month", "last_month", "year", "14d",
    /// {"from": "2024-01-01", "to": "2024-01-31"}, or {"last": 2, "unit": "weeks"}.
    /// Defaults to "7d".
    #[serde(default, rename = "timeRange", alias = "time_range")]
    pub time_range: Option<Value>,
    /// Filters as [operator, dimension, [values]], e.g. ["is", "visit:country", ["DE"]].
    #[serde(default)]
    pub filters: Option<Value>,
    /// Rows per page, at most 1000.
    #[serde(default)]
    pub limit: Option<Value>,
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<Value>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct AnalyzePageParams {
    /// Site domain. Defaults to the first accessible site.
    #[serde(default)]
    pub site_id: Option<Value>,
    /// Page path, e.g. "/pricing".
    #[serde(default)]
    pub page: Option<Value>,
    /// Same forms as in get_breakdown. Defaults to "30d".
    #[serde(default, rename = "timeRange", alias = "time_range")]
    pub time_range: Option<Value>,
    /// Metric names or aliases (default visitors, pageviews, visit_duration).
    #[serde(default)]
    pub include: Option<Value>,
    /// Rows in the referrer and country lists (default 10).
    #[serde(default)]
    pub limit: Option<Value>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Turn loose tool arguments into a v2 query.
pub fn build_query(params: &GetBreakdownParams, today: NaiveDate) -> Result<QueryRequest, String> {
    let site_id = string_arg(params.site_id.as_ref(), "site_id")?;
    let site_id = required(site_id.as_deref(), "site_id")?;

    let metrics = match params.metrics.as_ref() {
        Some(value) => map_metrics(string_list(value, "metrics")?).map_err(|e| e.to_string())?,
        None => vec![Metric::Visitors],
    };

    let dimensions = match params.dimensions.as_ref() {
        Some(value) => string_list(value, "dimensions")?
            .iter()
            .map(|d| d.parse::<Dimension>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?,
        None => vec![Dimension::from(Property::TimeDay)],
    };

    let range = parse_range(params.time_range.as_ref(), NamedRange::Last7Days)?;
    let range = normalize(&range, today).map_err(|e| e.to_string())?;

    let filters = match params.filters.as_ref() {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(Filter::from_v2)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?,
        Some(_) => return Err("filters must be a list of [operator, dimension, [values]]".into()),
    };
    let limit = count_arg(params.limit.as_ref(), "limit")?;
    let page = count_arg(params.page.as_ref(), "page")?;

    let mut request = QueryRequest::new(site_id, &range)
        .with_metrics(metrics)
        .with_dimensions(dimensions)
        .with_filters(filters);
    if limit.is_some() || page.is_some() {
        request = request.with_page(limit.unwrap_or(DEFAULT_LIMIT), page.unwrap_or(1));
    }
    Ok(request)
}

/// Turn loose tool arguments into a page analysis request.
///
/// `default_site` is used when the call names no site.
pub fn build_page_request(
    params: &AnalyzePageParams,
    default_site: Option<&str>,
) -> Result<PageRequest, String> {
    let site_id = string_arg(params.site_id.as_ref(), "site_id")?;
    let site_id = site_id.as_deref().filter(|s| !s.trim().is_empty());
    let site_id = required(site_id.or(default_site), "site_id")?;
    let page = string_arg(params.page.as_ref(), "page")?;
    let page = required(page.as_deref(), "page")?;
    let include = match params.include.as_ref() {
        Some(value) => string_list(value, "include")?,
        None => Vec::new(),
    };
    // Reject bad aliases before anything is sent.
    map_metrics(&include).map_err(|e| e.to_string())?;

    Ok(PageRequest {
        site_id: site_id.to_string(),
        page: page.to_string(),
        range: parse_range(params.time_range.as_ref(), NamedRange::Last30Days)?,
        include,
        limit: count_arg(params.limit.as_ref(), "limit")?.unwrap_or(DEFAULT_STATS_LIMIT),
    })
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{name} is required"))
}

/// An optional string argument. Anything but a string or null is rejected.
fn string_arg(value: Option<&Value>, name: &str) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("{name} must be a string")),
    }
}

/// An optional positive integer, given as a number or a numeric string.
fn count_arg(value: Option<&Value>, name: &str) -> Result<Option<u32>, String> {
    let invalid = || format!("{name} must be a positive integer");
    let count = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        Some(_) => None,
    };
    match count {
        Some(0) | None => Err(invalid()),
        Some(n) => Ok(Some(n)),
    }
}

/// A list of strings given either as a JSON array or a comma-separated string.
fn string_list(value: &Value, name: &str) -> Result<Vec<String>, String> {
    let invalid = || format!("{name} must be a string or a list of strings");
    match value {
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(invalid()),
    }
}

fn parse_range(value: Option<&Value>, default: NamedRange) -> Result<TimeRangeSpec, String> {
    match value {
        None | Some(Value::Null) => Ok(default.into()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| format!("invalid timeRange: {e}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Tool implementations
// ---------------------------------------------------------------------------

fn mcp_err(msg: impl std::fmt::Display) -> McpError {
    McpError::internal_error(msg.to_string(), None)
}

fn json_result(value: &impl Serialize) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(mcp_err)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn error_result(message: impl std::fmt::Display) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(message.to_string())]))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[tool_router]
impl SitepulseMcpServer {
    /// Build the tool router. Exposed as `pub(crate)` so `server.rs` can call it.
    pub(crate) fn create_tool_router() -> rmcp::handler::server::router::tool::ToolRouter<Self> {
        Self::tool_router()
    }

    #[tool(description = "List the Plausible sites the configured API key can access.")]
    async fn list_sites(&self) -> Result<CallToolResult, McpError> {
        match self.ops.sites().await {
            Ok(sites) => json_result(&sites),
            Err(e) => error_result(e),
        }
    }

    /// Run a Plausible v2 query: metrics grouped by dimensions over a time range.
    #[tool(
        description = "Query Plausible analytics. Returns metrics grouped by dimensions (e.g. visitors per day, top sources, pages by country) over a time range, with optional filters."
    )]
    async fn get_breakdown(
        &self,
        Parameters(p): Parameters<GetBreakdownParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = match build_query(&p, today()) {
            Ok(request) => request,
            Err(e) => return error_result(e),
        };
        tracing::debug!(site = %request.site_id, "running breakdown query");
        match self.ops.query(&request).await {
            Ok(response) => json_result(&response),
            Err(e) => error_result(e),
        }
    }

    #[tool(
        description = "Analyze one page: key metrics plus its top traffic sources and countries over a time range."
    )]
    async fn analyze_page(
        &self,
        Parameters(p): Parameters<AnalyzePageParams>,
    ) -> Result<CallToolResult, McpError> {
        let default_site = match string_arg(p.site_id.as_ref(), "site_id") {
            Ok(Some(site)) if !site.trim().is_empty() => None,
            Ok(_) => match self.ops.default_site().await {
                Ok(site) => Some(site),
                Err(e) => return error_result(e),
            },
            Err(e) => return error_result(e),
        };
        let request = match build_page_request(&p, default_site.as_deref()) {
            Ok(request) => request,
            Err(e) => return error_result(e),
        };
        match self.ops.analyze_page(&request, today()).await {
            Ok(analysis) => json_result(&analysis),
            Err(e) => error_result(e),
        }
    }

    #[tool(
        description = "List available metrics, metric aliases, dimensions, and accepted time ranges."
    )]
    async fn list_metrics(&self) -> Result<CallToolResult, McpError> {
        json_result(&catalog())
    }
}

fn catalog() -> Value {
    json!({
        "metrics": Metric::ALL.iter().map(|m| json!({
            "name": m.as_str(),
            "description": m.description(),
        })).collect::<Vec<_>>(),
        "aliases": METRIC_ALIASES.iter().map(|(alias, metrics)| json!({
            "alias": alias,
            "metrics": metrics.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
        "dimensions": Property::ALL.iter().map(|p| json!({
            "id": p.id(),
            "label": p.label(),
        })).collect::<Vec<_>>(),
        "custom_dimensions": "event:props:<name>",
        "time_ranges": NamedRange::ALL.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "rolling_ranges": "{\"last\": N, \"unit\": \"days\" | \"weeks\" | \"months\"} or \"14d\", \"2w\", \"6mo\"",
        "custom_ranges": "{\"from\": \"YYYY-MM-DD\", \"to\": \"YYYY-MM-DD\"}",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_client::mock::MockServer;
    use sitepulse_ops::{OpsClient, OpsConfig};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn params(value: Value) -> GetBreakdownParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_are_daily_visitors_over_a_week() {
        let request = build_query(&params(json!({"site_id": "example.com"})), today()).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "site_id": "example.com",
                "metrics": ["visitors"],
                "date_range": "7d",
                "dimensions": ["time:day"],
                "filters": []
            })
        );
    }

    #[test]
    fn loose_inputs_are_normalized() {
        let request = build_query(
            &params(json!({
                "site_id": "example.com",
                "metrics": "traffic, total_views",
                "dimensions": ["visit:source"],
                "timeRange": {"from": "2024-01-01", "to": "2024-03-31"},
                "filters": [["is", "visit:country", ["DE", "AT"]]],
                "limit": 50,
                "page": 3
            })),
            today(),
        )
        .unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["metrics"], json!(["visitors", "visits", "pageviews"]));
        assert_eq!(body["date_range"], json!(["2024-01-01", "2024-03-31"]));
        assert_eq!(body["filters"], json!([["is", "visit:country", ["DE", "AT"]]]));
        assert_eq!(body["pagination"], json!({"limit": 50, "offset": 100}));
    }

    #[test]
    fn rolling_range_object_is_accepted() {
        let request = build_query(
            &params(json!({"site_id": "example.com", "time_range": {"last": 2, "unit": "weeks"}})),
            today(),
        )
        .unwrap();
        assert_eq!(request.date_range, json!(["2024-05-01", "2024-05-15"]));
    }

    #[test]
    fn invalid_inputs_are_reported() {
        let err = build_query(&params(json!({})), today()).unwrap_err();
        assert_eq!(err, "site_id is required");

        let err = build_query(
            &params(json!({"site_id": "a.com", "metrics": ["not_a_real_metric"]})),
            today(),
        )
        .unwrap_err();
        assert!(err.contains("not_a_real_metric"));

        let err = build_query(
            &params(json!({"site_id": "a.com", "timeRange": "fortnight"})),
            today(),
        )
        .unwrap_err();
        assert!(err.starts_with("invalid timeRange"));

        let err = build_query(&params(json!({"site_id": "a.com", "metrics": 5})), today())
            .unwrap_err();
        assert_eq!(err, "metrics must be a string or a list of strings");
    }

    #[test]
    fn numeric_arguments_accept_numbers_and_numeric_strings() {
        let request = build_query(
            &params(json!({"site_id": "a.com", "limit": "25", "page": 2})),
            today(),
        )
        .unwrap();
        let pagination = request.pagination.unwrap();
        assert_eq!((pagination.limit, pagination.offset), (25, 25));

        for bad in [json!("ten"), json!(-1), json!(0), json!(1.5), json!([10])] {
            let err = build_query(&params(json!({"site_id": "a.com", "limit": bad})), today())
                .unwrap_err();
            assert_eq!(err, "limit must be a positive integer");
        }
    }

    #[test]
    fn oversized_limit_is_clamped() {
        let request = build_query(
            &params(json!({"site_id": "a.com", "limit": 50_000})),
            today(),
        )
        .unwrap();
        assert_eq!(request.pagination.unwrap().limit, sitepulse_core::MAX_LIMIT);
    }

    #[test]
    fn wrong_typed_strings_and_filters_are_reported() {
        let err = build_query(&params(json!({"site_id": 5})), today()).unwrap_err();
        assert_eq!(err, "site_id must be a string");

        let err = build_query(
            &params(json!({"site_id": "a.com", "filters": "visit:country==DE"})),
            today(),
        )
        .unwrap_err();
        assert!(err.starts_with("filters must be a list"));

        let p: AnalyzePageParams =
            serde_json::from_value(json!({"site_id": "a.com", "page": 42})).unwrap();
        assert_eq!(build_page_request(&p, None).unwrap_err(), "page must be a string");
    }

    #[test]
    fn page_request_needs_a_page() {
        let p: AnalyzePageParams = serde_json::from_value(json!({"site_id": "a.com"})).unwrap();
        assert_eq!(build_page_request(&p, None).unwrap_err(), "page is required");

        let p: AnalyzePageParams =
            serde_json::from_value(json!({"page": "/pricing", "include": "engagement"})).unwrap();
        let request = build_page_request(&p, Some("a.com")).unwrap();
        assert_eq!(request.site_id, "a.com");

        let p: AnalyzePageParams =
            serde_json::from_value(json!({"site_id": " ", "page": "/"})).unwrap();
        assert_eq!(build_page_request(&p, Some("b.com")).unwrap().site_id, "b.com");
        assert_eq!(request.include, ["engagement"]);
        assert_eq!(request.range, TimeRangeSpec::Named(NamedRange::Last30Days));
    }

    fn server(plausible: &MockServer) -> SitepulseMcpServer {
        let config = OpsConfig::from_lookup(|_| None)
            .with_plausible_url(&plausible.base_url)
            .with_plausible_key("pk");
        SitepulseMcpServer::new(OpsClient::from_config(config).unwrap())
    }

    fn text(result: &CallToolResult) -> String {
        result.content[0].as_text().unwrap().text.clone()
    }

    #[tokio::test]
    async fn failures_become_error_results() {
        let plausible = MockServer::sequence(vec![(401, r#"{"error": "invalid api key"}"#)]).await;
        let server = server(&plausible);

        let result = server
            .get_breakdown(Parameters(params(json!({"site_id": "a.com"}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("401"));

        let result = server
            .get_breakdown(Parameters(params(json!({}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text(&result), "site_id is required");
        assert_eq!(plausible.request_count(), 1);
    }

    #[tokio::test]
    async fn wrong_typed_arguments_become_error_results() {
        let plausible = MockServer::sequence(vec![(500, "{}")]).await;
        let server = server(&plausible);

        for args in [
            json!({"site_id": "a.com", "limit": "lots"}),
            json!({"site_id": 5}),
            json!({"site_id": "a.com", "page": {"n": 2}}),
        ] {
            let p: GetBreakdownParams = serde_json::from_value(args).unwrap();
            let result = server.get_breakdown(Parameters(p)).await.unwrap();
            assert_eq!(result.is_error, Some(true));
        }

        let p: AnalyzePageParams =
            serde_json::from_value(json!({"site_id": "a.com", "page": "/", "limit": "ten"}))
                .unwrap();
        let result = server.analyze_page(Parameters(p)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text(&result), "limit must be a positive integer");
        assert_eq!(plausible.request_count(), 0);
    }

    #[tokio::test]
    async fn analyze_page_defaults_to_the_first_site() {
        let plausible = MockServer::start(|req| {
            let body = match req.path() {
                "/v1/sites" => json!([{"domain": "first.example"}]),
                "/v1/stats/aggregate" => json!({"results": {"visitors": {"value": 3}}}),
                _ => json!({"results": []}),
            };
            (200, body.to_string())
        })
        .await;

        let p: AnalyzePageParams = serde_json::from_value(json!({"page": "/pricing"})).unwrap();
        let result = server(&plausible).analyze_page(Parameters(p)).await.unwrap();
        assert_ne!(result.is_error, Some(true), "{}", text(&result));

        let requests = plausible.requests();
        assert_eq!(requests.len(), 4);
        assert!(
            requests
                .iter()
                .filter(|r| r.path() != "/v1/sites")
                .all(|r| r.query("site_id").as_deref() == Some("first.example"))
        );
    }

    #[tokio::test]
    async fn list_sites_returns_json() {
        let plausible =
            MockServer::sequence(vec![(200, r#"{"sites": [{"domain": "a.com", "timezone": "UTC"}]}"#)])
                .await;
        let result = server(&plausible).list_sites().await.unwrap();
        assert_ne!(result.is_error, Some(true));
        let sites: Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(sites[0]["domain"], "a.com");
    }

    #[test]
    fn catalog_lists_aliases() {
        let catalog = catalog();
        assert_eq!(catalog["metrics"].as_array().unwrap().len(), Metric::ALL.len());
        assert!(
            catalog["aliases"]
                .as_array()
                .unwrap()
                .iter()
                .any(|a| a["alias"] == "traffic")
        );
    }
}
