//! Plausible analytics API client.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use sitepulse_core::{
    AggregateResult, BreakdownQuery, BreakdownResult, Dimension, Filter, Metric, NormalizedRange,
    QueryRequest, QueryResponse, Record, Site, TimeseriesPoint, TimeseriesResult, encode_v1,
};

use crate::Error;
use crate::debug_log::ApiLogger;
use crate::transport::{DEFAULT_TIMEOUT, Transport, decode, decode_list};

/// Public Plausible API root.
pub const DEFAULT_BASE_URL: &str = "https://plausible.io/api";

/// Most pages a single paginated fetch will follow.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// HTTP client for the Plausible stats and query APIs.
#[derive(Debug, Clone)]
pub struct PlausibleClient {
    transport: Transport,
    max_pages: u32,
}

/// Builder for configuring a [`PlausibleClient`].
#[derive(Debug)]
pub struct PlausibleClientBuilder {
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
    client: Option<Client>,
    max_pages: u32,
    logger: Option<ApiLogger>,
}

impl PlausibleClientBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            client: None,
            max_pages: DEFAULT_MAX_PAGES,
            logger: None,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API key sent as a bearer token.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Use a custom reqwest Client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Cap on pages followed by [`PlausibleClient::breakdown_all`].
    #[must_use]
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Record every exchange with the given debug logger.
    #[must_use]
    pub fn logger(mut self, logger: ApiLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<PlausibleClient, Error> {
        let logger = self
            .logger
            .unwrap_or_else(|| ApiLogger::disabled("plausible"));
        Ok(PlausibleClient {
            transport: Transport::new(
                self.base_url,
                self.api_key,
                self.timeout,
                self.client,
                logger,
            )?,
            max_pages: self.max_pages,
        })
    }
}

/// How many pages each branch of a [`PlausibleClient::breakdowns`] fan-out reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScope {
    /// Every page, as [`PlausibleClient::breakdown_all`].
    All,
    /// The first page only, at most `limit` rows, as [`PlausibleClient::breakdown_top`].
    First,
}

/// Result of one branch of a [`PlausibleClient::breakdowns`] fan-out.
#[derive(Debug)]
pub struct BranchOutcome {
    /// The dimension this branch broke down by.
    pub property: Dimension,
    pub result: Result<Vec<Record>, Error>,
}

impl PlausibleClient {
    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> PlausibleClientBuilder {
        PlausibleClientBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn is_authenticated(&self) -> bool {
        self.transport.has_token()
    }

    /// List the sites the API key can access.
    pub async fn sites(&self) -> Result<Vec<Site>, Error> {
        let body = self.transport.get("/v1/sites", &[]).await?;
        decode_list(body, "sites")
    }

    /// Fetch exactly one page of a breakdown.
    pub async fn breakdown(&self, query: &BreakdownQuery) -> Result<BreakdownResult, Error> {
        let body = self
            .transport
            .get("/v1/stats/breakdown", &query.to_params())
            .await?;
        decode(body)
    }

    /// The top `limit` rows of a breakdown: page 1 only.
    pub async fn breakdown_top(&self, query: &BreakdownQuery) -> Result<Vec<Record>, Error> {
        let mut records = self.breakdown(&query.clone().with_page(1)).await?.results;
        records.truncate(usize::try_from(query.limit()).unwrap_or(usize::MAX));
        Ok(records)
    }

    /// Fetch every page of a breakdown, starting at page 1.
    ///
    /// All-or-nothing: any failing page discards what was collected so far.
    pub async fn breakdown_all(&self, query: &BreakdownQuery) -> Result<Vec<Record>, Error> {
        let mut records = Vec::new();
        let mut page = 1;
        let mut fetched = 0_u32;

        loop {
            let result = self.breakdown(&query.clone().with_page(page)).await?;
            fetched += 1;
            records.extend(result.results);

            let Some(pagination) = result.pagination else {
                break;
            };
            if pagination.total_pages > self.max_pages {
                return Err(Error::PageLimitExceeded {
                    total_pages: pagination.total_pages,
                    max_pages: self.max_pages,
                });
            }
            page += 1;
            if page > pagination.total_pages {
                break;
            }
        }

        tracing::debug!(
            site = query.site_id(),
            property = %query.property(),
            pages = fetched,
            records = records.len(),
            "fetched breakdown"
        );
        Ok(records)
    }

    /// Run several breakdowns concurrently.
    ///
    /// Every branch runs to completion; one failing does not cancel the
    /// others. Outcomes come back in the order of `queries`.
    pub async fn breakdowns(
        &self,
        queries: Vec<BreakdownQuery>,
        scope: PageScope,
    ) -> Vec<BranchOutcome> {
        join_all(queries.into_iter().map(|query| async move {
            let result = match scope {
                PageScope::All => self.breakdown_all(&query).await,
                PageScope::First => self.breakdown_top(&query).await,
            };
            BranchOutcome {
                property: query.property().clone(),
                result,
            }
        }))
        .await
    }

    /// Totals for `metrics` over `range`, flattened to `{metric: value}`.
    pub async fn aggregate(
        &self,
        site_id: &str,
        range: &NormalizedRange,
        metrics: &[Metric],
        filters: &[Filter],
    ) -> Result<Record, Error> {
        let mut params = vec![("site_id", site_id.to_string())];
        params.extend(range.v1_params());
        params.push(("metrics", join_metrics(metrics)));
        if let Some(filters) = encode_v1(filters) {
            params.push(("filters", filters));
        }

        let body = self.transport.get("/v1/stats/aggregate", &params).await?;
        decode::<AggregateResult>(body).map(AggregateResult::into_record)
    }

    /// Daily visitor counts over `range`.
    pub async fn timeseries(
        &self,
        site_id: &str,
        range: &NormalizedRange,
    ) -> Result<Vec<TimeseriesPoint>, Error> {
        let mut params = vec![("site_id", site_id.to_string())];
        params.extend(range.v1_params());

        let body = self.transport.get("/v1/stats/timeseries", &params).await?;
        decode::<TimeseriesResult>(body).map(|r| r.results)
    }

    /// Run a v2 query. One request, no pagination loop.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, Error> {
        let body = self.transport.post("/v2/query", request).await?;
        decode(body)
    }
}

fn join_metrics(metrics: &[Metric]) -> String {
    if metrics.is_empty() {
        return Metric::Visitors.as_str().to_string();
    }
    metrics
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;
    use serde_json::json;
    use sitepulse_core::{NamedRange, Property, normalize, parse_date};

    fn client(server: &MockServer) -> PlausibleClient {
        PlausibleClient::builder(&server.base_url)
            .api_key("test-key")
            .build()
            .unwrap()
    }

    fn week() -> NormalizedRange {
        normalize(&NamedRange::Last7Days.into(), parse_date("2024-05-15").unwrap()).unwrap()
    }

    fn pages_query() -> BreakdownQuery {
        BreakdownQuery::new("example.com", Property::EventPage, &week()).unwrap()
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let client = PlausibleClient::builder("https://plausible.io/api/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://plausible.io/api");
        assert!(!client.is_authenticated());
        assert_eq!(client.max_pages(), DEFAULT_MAX_PAGES);
    }

    #[tokio::test]
    async fn two_pages_are_concatenated_in_order() {
        let server = MockServer::start(|req| {
            let body = match req.query("page").as_deref() {
                Some("1") => json!({
                    "results": [{"page": "/a", "visitors": 3}, {"page": "/b", "visitors": 2}],
                    "pagination": {"page": 1, "total_pages": 2}
                }),
                _ => json!({
                    "results": [{"page": "/c", "visitors": 1}],
                    "pagination": {"page": 2, "total_pages": 2}
                }),
            };
            (200, body.to_string())
        })
        .await;

        let records = client(&server).breakdown_all(&pages_query()).await.unwrap();
        let pages: Vec<_> = records.iter().map(|r| r["page"].clone()).collect();
        assert_eq!(pages, vec![json!("/a"), json!("/b"), json!("/c")]);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query("page").as_deref(), Some("1"));
        assert_eq!(requests[1].query("page").as_deref(), Some("2"));
        assert_eq!(requests[0].path(), "/v1/stats/breakdown");
        assert_eq!(requests[0].query("property").as_deref(), Some("event:page"));
        assert_eq!(requests[0].query("period").as_deref(), Some("7d"));
    }

    #[tokio::test]
    async fn missing_pagination_means_single_page() {
        let server = MockServer::sequence(vec![(
            200,
            r#"{"results": [{"country": "US", "visitors": 7}]}"#,
        )])
        .await;

        let records = client(&server).breakdown_all(&pages_query()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn failure_on_second_page_discards_everything() {
        let server = MockServer::sequence(vec![
            (
                200,
                r#"{"results": [{"page": "/a"}], "pagination": {"page": 1, "total_pages": 2}}"#,
            ),
            (500, "upstream exploded"),
        ])
        .await;

        let err = client(&server)
            .breakdown_all(&pages_query())
            .await
            .unwrap_err();
        match err {
            Error::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected API error, got {other:?}"),
        }
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn page_cap_is_enforced() {
        let server = MockServer::sequence(vec![(
            200,
            r#"{"results": [], "pagination": {"page": 1, "total_pages": 500}}"#,
        )])
        .await;

        let client = PlausibleClient::builder(&server.base_url)
            .max_pages(10)
            .build()
            .unwrap();
        let err = client.breakdown_all(&pages_query()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::PageLimitExceeded {
                total_pages: 500,
                max_pages: 10
            }
        ));
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::sequence(vec![(200, "<html>oops</html>")]).await;
        let err = client(&server).breakdown(&pages_query()).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = PlausibleClient::builder("http://127.0.0.1:1")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let err = client.sites().await.unwrap_err();
        assert!(err.is_transport_error(), "got {err:?}");
    }

    #[tokio::test]
    async fn sends_bearer_token_and_accepts_wrapped_sites() {
        let server = MockServer::sequence(vec![(
            200,
            r#"{"sites": [{"domain": "example.com", "timezone": "Europe/Berlin"}], "meta": {}}"#,
        )])
        .await;

        let sites = client(&server).sites().await.unwrap();
        assert_eq!(sites[0].domain, "example.com");

        let request = &server.requests()[0];
        assert_eq!(request.path(), "/v1/sites");
        assert_eq!(request.header("authorization"), Some("Bearer test-key"));
    }

    #[tokio::test]
    async fn fan_out_reports_each_branch() {
        let server = MockServer::start(|req| match req.query("property").as_deref() {
            Some("visit:country") => (503, "busy".to_string()),
            _ => (200, r#"{"results": [{"source": "Google", "visitors": 4}]}"#.to_string()),
        })
        .await;

        let queries = vec![
            BreakdownQuery::new("example.com", Property::Source, &week()).unwrap(),
            BreakdownQuery::new("example.com", Property::Country, &week()).unwrap(),
        ];
        let outcomes = client(&server).breakdowns(queries, PageScope::All).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].property, Dimension::from(Property::Source));
        assert_eq!(outcomes[0].result.as_ref().unwrap().len(), 1);
        assert_eq!(outcomes[1].property, Dimension::from(Property::Country));
        assert_eq!(outcomes[1].result.as_ref().unwrap_err().status(), Some(503));
    }

    #[tokio::test]
    async fn top_rows_read_only_the_first_page() {
        let server = MockServer::start(|_| {
            let body = json!({
                "results": [
                    {"page": "/a", "visitors": 9},
                    {"page": "/b", "visitors": 8},
                    {"page": "/c", "visitors": 7}
                ],
                "pagination": {"page": 1, "total_pages": 150}
            });
            (200, body.to_string())
        })
        .await;

        let query = pages_query().with_limit(2);
        let records = client(&server).breakdown_top(&query).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["page"], "/a");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query("page").as_deref(), Some("1"));
        assert_eq!(requests[0].query("limit").as_deref(), Some("2"));

        let outcomes = client(&server)
            .breakdowns(vec![query], PageScope::First)
            .await;
        assert_eq!(outcomes[0].result.as_ref().unwrap().len(), 2);
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn aggregate_flattens_metric_values() {
        let server = MockServer::sequence(vec![(
            200,
            r#"{"results": {"visitors": {"value": 42}, "pageviews": {"value": 99}}}"#,
        )])
        .await;

        let record = client(&server)
            .aggregate(
                "example.com",
                &week(),
                &[Metric::Visitors, Metric::Pageviews],
                &[Filter::is(Property::EventPage, "/pricing")],
            )
            .await
            .unwrap();
        assert_eq!(record["visitors"], json!(42));

        let request = &server.requests()[0];
        assert_eq!(request.path(), "/v1/stats/aggregate");
        assert_eq!(request.query("metrics").as_deref(), Some("visitors,pageviews"));
        assert_eq!(
            request.query("filters").as_deref(),
            Some("event:page==/pricing")
        );
    }

    #[tokio::test]
    async fn v2_query_posts_json_body() {
        let server = MockServer::sequence(vec![(
            200,
            r#"{"results": [{"metrics": [5], "dimensions": ["2024-05-14"]}], "meta": {}, "query": {}}"#,
        )])
        .await;

        let request = QueryRequest::daily_visitors("example.com", &week());
        let response = client(&server).query(&request).await.unwrap();
        assert_eq!(response.results.len(), 1);

        let recorded = &server.requests()[0];
        assert_eq!(recorded.method, "POST");
        assert_eq!(recorded.path(), "/v2/query");
        assert_eq!(recorded.json()["date_range"], json!("7d"));
        assert_eq!(recorded.json()["dimensions"], json!(["time:day"]));
    }

    #[tokio::test]
    async fn debug_logger_records_exchanges() {
        let tmp = tempfile::tempdir().unwrap();
        let server = MockServer::sequence(vec![(200, r#"[{"domain": "a.com"}]"#)]).await;
        let client = PlausibleClient::builder(&server.base_url)
            .logger(ApiLogger::new("plausible", tmp.path(), true))
            .build()
            .unwrap();

        client.sites().await.unwrap();

        let written = std::fs::read_dir(tmp.path().join("plausible")).unwrap().count();
        assert_eq!(written, 1);
    }
}
