use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// A metric the analytics provider can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Visitors,
    Visits,
    Pageviews,
    ViewsPerVisit,
    BounceRate,
    VisitDuration,
    Events,
    ExitRate,
    TimeOnPage,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Self::Visitors,
        Self::Visits,
        Self::Pageviews,
        Self::ViewsPerVisit,
        Self::BounceRate,
        Self::VisitDuration,
        Self::Events,
        Self::ExitRate,
        Self::TimeOnPage,
    ];

    /// Provider identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visitors => "visitors",
            Self::Visits => "visits",
            Self::Pageviews => "pageviews",
            Self::ViewsPerVisit => "views_per_visit",
            Self::BounceRate => "bounce_rate",
            Self::VisitDuration => "visit_duration",
            Self::Events => "events",
            Self::ExitRate => "exit_rate",
            Self::TimeOnPage => "time_on_page",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Visitors => "Number of unique visitors",
            Self::Visits => "Number of sessions",
            Self::Pageviews => "Number of page views",
            Self::ViewsPerVisit => "Average pages viewed per session",
            Self::BounceRate => "Percentage of single-page sessions",
            Self::VisitDuration => "Average session length in seconds",
            Self::Events => "Number of events, including pageviews",
            Self::ExitRate => "Percentage of sessions ending on a page",
            Self::TimeOnPage => "Average seconds spent on a page",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| QueryError::UnknownMetric(s.to_string()))
    }
}

/// Friendly names accepted in place of provider metric identifiers.
///
/// Group aliases expand to several metrics. Exact provider names are always
/// accepted in addition to these.
pub const METRIC_ALIASES: &[(&str, &[Metric])] = &[
    ("unique_visitors", &[Metric::Visitors]),
    ("sessions", &[Metric::Visits]),
    ("total_views", &[Metric::Pageviews]),
    ("views", &[Metric::Pageviews]),
    ("avg_time", &[Metric::VisitDuration]),
    ("time_on_site", &[Metric::VisitDuration]),
    (
        "traffic",
        &[Metric::Visitors, Metric::Visits, Metric::Pageviews],
    ),
    (
        "engagement",
        &[Metric::BounceRate, Metric::VisitDuration, Metric::ViewsPerVisit],
    ),
];

static KNOWN_METRICS: [Metric; 9] = Metric::ALL;

/// Resolve a single alias or provider name.
pub fn resolve_alias(alias: &str) -> Result<&'static [Metric], QueryError> {
    let key = alias.trim().to_ascii_lowercase();
    if let Some((_, metrics)) = METRIC_ALIASES.iter().find(|(name, _)| *name == key) {
        return Ok(*metrics);
    }
    KNOWN_METRICS
        .iter()
        .find(|metric| metric.as_str() == key)
        .map(std::slice::from_ref)
        .ok_or_else(|| QueryError::UnknownMetric(alias.trim().to_string()))
}

/// Map friendly metric names to provider metrics.
///
/// Order follows first occurrence and duplicates are dropped, so
/// `["total_views", "pageviews"]` yields a single `pageviews`.
pub fn map_metrics<I, S>(aliases: I) -> Result<Vec<Metric>, QueryError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut mapped = Vec::new();
    for alias in aliases {
        for metric in resolve_alias(alias.as_ref())? {
            if !mapped.contains(metric) {
                mapped.push(*metric);
            }
        }
    }
    Ok(mapped)
}
