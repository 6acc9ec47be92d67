//! Analytics operations: multi-dimension stats and single-page analysis.

use chrono::NaiveDate;
use serde::Serialize;
use sitepulse_client::PageScope;
use sitepulse_core::{
    BreakdownQuery, Dimension, Filter, NormalizedRange, Property, QueryRequest, QueryResponse,
    Record, Site, TimeRangeSpec, TimeseriesPoint, map_metrics, normalize,
};

use crate::{OpsClient, OpsError};

/// Dimensions reported when a stats request names none.
pub const DEFAULT_DIMENSIONS: [Property; 3] =
    [Property::EventPage, Property::Referrer, Property::Country];

/// Metric aliases reported when a page analysis names none.
pub const DEFAULT_PAGE_METRICS: [&str; 3] = ["visitors", "pageviews", "visit_duration"];

/// Rows shown per dimension by default.
pub const DEFAULT_STATS_LIMIT: u32 = 10;

/// Parameters of [`OpsClient::stats`].
#[derive(Debug, Clone)]
pub struct StatsRequest {
    /// Site to report on; the first accessible site when `None`.
    pub site_id: Option<String>,
    pub range: TimeRangeSpec,
    pub dimensions: Vec<Dimension>,
    /// Most rows reported per dimension. Only the first page is read.
    pub limit: u32,
    pub filters: Vec<Filter>,
}

impl StatsRequest {
    pub fn new(range: TimeRangeSpec) -> Self {
        Self {
            site_id: None,
            range,
            dimensions: DEFAULT_DIMENSIONS.into_iter().map(Dimension::from).collect(),
            limit: DEFAULT_STATS_LIMIT,
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    /// Replace the dimensions; an empty list keeps the defaults.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        if !dimensions.is_empty() {
            self.dimensions = dimensions;
        }
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }
}

/// One dimension of a stats report.
///
/// Exactly one of `records` (possibly empty) or `error` is meaningful.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSection {
    pub dimension: Dimension,
    pub records: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatsSection {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub site_id: String,
    pub range_label: String,
    pub period: NormalizedRange,
    pub sections: Vec<StatsSection>,
}

/// Parameters of [`OpsClient::analyze_page`].
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub site_id: String,
    /// Path of the page, e.g. `/pricing`.
    pub page: String,
    pub range: TimeRangeSpec,
    /// Metric aliases; [`DEFAULT_PAGE_METRICS`] when empty.
    pub include: Vec<String>,
    /// Most rows in the referrer and country lists.
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl From<&NormalizedRange> for Period {
    fn from(range: &NormalizedRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageAnalysis {
    pub page: String,
    pub period: Period,
    pub metrics: Record,
    pub referrers: Vec<Record>,
    pub countries: Vec<Record>,
}

impl OpsClient {
    /// Sites the configured API key can access.
    pub async fn sites(&self) -> Result<Vec<Site>, OpsError> {
        Ok(self.analytics().await?.sites().await?)
    }

    /// Domain of the first accessible site.
    pub async fn default_site(&self) -> Result<String, OpsError> {
        self.sites()
            .await?
            .into_iter()
            .next()
            .map(|site| site.domain)
            .ok_or_else(|| OpsError::NotFound("no sites available for this API key".into()))
    }

    /// Breakdowns for several dimensions at once.
    ///
    /// The dimension fetches run concurrently, each reading the top
    /// `limit` rows. A failing dimension is reported in its section and
    /// does not affect the others.
    pub async fn stats(
        &self,
        request: &StatsRequest,
        today: NaiveDate,
    ) -> Result<StatsReport, OpsError> {
        let period = normalize(&request.range, today)?;
        let site_id = match &request.site_id {
            Some(site) => site.clone(),
            None => self.default_site().await?,
        };

        let queries = request
            .dimensions
            .iter()
            .map(|dimension| {
                BreakdownQuery::new(&site_id, dimension.clone(), &period).map(|q| {
                    q.with_limit(request.limit)
                        .with_filters(request.filters.iter().cloned())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let outcomes = self
            .analytics()
            .await?
            .breakdowns(queries, PageScope::First)
            .await;
        let sections = outcomes
            .into_iter()
            .map(|outcome| match outcome.result {
                Ok(records) => StatsSection {
                    dimension: outcome.property,
                    records,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(dimension = %outcome.property, error = %e, "breakdown failed");
                    StatsSection {
                        dimension: outcome.property,
                        records: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        Ok(StatsReport {
            site_id,
            range_label: request.range.label(),
            period,
            sections,
        })
    }

    /// Daily visitors over `range`, for charts.
    pub async fn timeseries(
        &self,
        site_id: &str,
        range: &TimeRangeSpec,
        today: NaiveDate,
    ) -> Result<Vec<TimeseriesPoint>, OpsError> {
        let period = normalize(range, today)?;
        Ok(self.analytics().await?.timeseries(site_id, &period).await?)
    }

    /// Metrics, top referrers, and top countries for one page.
    ///
    /// The three requests run concurrently; any failure fails the analysis.
    pub async fn analyze_page(
        &self,
        request: &PageRequest,
        today: NaiveDate,
    ) -> Result<PageAnalysis, OpsError> {
        let metrics = if request.include.is_empty() {
            map_metrics(DEFAULT_PAGE_METRICS)?
        } else {
            map_metrics(&request.include)?
        };
        let period = normalize(&request.range, today)?;
        let page_filter = Filter::is(Property::EventPage, &request.page);

        let breakdown = |property: Property| {
            BreakdownQuery::new(&request.site_id, property, &period).map(|q| {
                q.with_limit(request.limit)
                    .with_filter(page_filter.clone())
            })
        };
        let sources = breakdown(Property::Source)?;
        let countries = breakdown(Property::Country)?;

        let client = self.analytics().await?;
        let filters = [page_filter.clone()];
        let (metrics, referrers, countries) = tokio::try_join!(
            client.aggregate(&request.site_id, &period, &metrics, &filters),
            client.breakdown_top(&sources),
            client.breakdown_top(&countries),
        )?;

        Ok(PageAnalysis {
            page: request.page.clone(),
            period: Period::from(&period),
            metrics,
            referrers,
            countries,
        })
    }

    /// Run a v2 query as-is.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, OpsError> {
        Ok(self.analytics().await?.query(request).await?)
    }
}
