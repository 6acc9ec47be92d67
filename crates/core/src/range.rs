//! Time-range normalization.
//!
//! Users describe a window in one of three shapes: a named relative range
//! (`last_7_days`), a custom pair of calendar dates, or a rolling window
//! (`the last 2 weeks`). [`normalize`] turns any of them into explicit
//! start/end dates plus the token the analytics provider expects.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::QueryError;

/// Period tokens understood by the v1 stats endpoints.
pub const V1_PERIODS: &[&str] = &["day", "7d", "30d", "month", "6mo", "12mo"];

/// Period tokens understood by the v2 query endpoint.
pub const V2_PERIODS: &[&str] = &[
    "day", "7d", "28d", "30d", "91d", "month", "6mo", "12mo", "year", "all",
];

/// A fixed, human-readable relative window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedRange {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    ThisMonth,
    LastMonth,
    ThisYear,
}

impl NamedRange {
    /// Every named range, in display order.
    pub const ALL: [NamedRange; 7] = [
        Self::Today,
        Self::Yesterday,
        Self::Last7Days,
        Self::Last30Days,
        Self::ThisMonth,
        Self::LastMonth,
        Self::ThisYear,
    ];

    /// Canonical snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "last_7_days",
            Self::Last30Days => "last_30_days",
            Self::ThisMonth => "this_month",
            Self::LastMonth => "last_month",
            Self::ThisYear => "this_year",
        }
    }

    /// Human-readable label used in report headers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Last7Days => "Last 7 days",
            Self::Last30Days => "Last 30 days",
            Self::ThisMonth => "This month",
            Self::LastMonth => "Last month",
            Self::ThisYear => "This year",
        }
    }
}

impl fmt::Display for NamedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamedRange {
    type Err = QueryError;

    /// Accepts the canonical names plus the provider shorthands
    /// `day`, `7d`, `30d`, `month`, and `year`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "last_7_days" | "7d" => Ok(Self::Last7Days),
            "last_30_days" | "30d" => Ok(Self::Last30Days),
            "this_month" | "month" => Ok(Self::ThisMonth),
            "last_month" => Ok(Self::LastMonth),
            "this_year" | "year" => Ok(Self::ThisYear),
            other => Err(QueryError::UnsupportedRange(other.to_string())),
        }
    }
}

/// Unit of a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingUnit {
    Days,
    Weeks,
    Months,
}

impl RollingUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }
}

impl fmt::Display for RollingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RollingUnit {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => Ok(Self::Days),
            "weeks" | "week" | "w" => Ok(Self::Weeks),
            "months" | "month" | "mo" => Ok(Self::Months),
            other => Err(QueryError::UnsupportedUnit(other.to_string())),
        }
    }
}

/// A time range as the user wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub enum TimeRangeSpec {
    /// One of the fixed relative windows.
    Named(NamedRange),
    /// An explicit pair of calendar dates, both inclusive.
    Custom { from: NaiveDate, to: NaiveDate },
    /// The `count * unit` window ending on the reference date.
    Rolling { count: u32, unit: RollingUnit },
}

impl TimeRangeSpec {
    /// Label for report headers, e.g. `Last 7 days` or `2024-01-01 to 2024-03-31`.
    pub fn label(&self) -> String {
        match self {
            Self::Named(named) => named.label().to_string(),
            Self::Custom { from, to } => format!("{from} to {to}"),
            Self::Rolling { count, unit } => format!("Last {count} {unit}"),
        }
    }
}

impl From<NamedRange> for TimeRangeSpec {
    fn from(named: NamedRange) -> Self {
        Self::Named(named)
    }
}

impl fmt::Display for TimeRangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(named) => write!(f, "{named}"),
            Self::Custom { from, to } => write!(f, "{from}..{to}"),
            Self::Rolling { count, unit } => write!(f, "last_{count}_{unit}"),
        }
    }
}

impl FromStr for TimeRangeSpec {
    type Err = QueryError;

    /// Parses named ranges and their shorthands, `FROM..TO` / `FROM,TO`
    /// custom spans, compact rolling windows (`14d`, `2w`, `6mo`), and the
    /// long rolling form `last_2_weeks`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(named) = s.parse::<NamedRange>() {
            return Ok(Self::Named(named));
        }

        if let Some((from, to)) = s.split_once("..").or_else(|| s.split_once(',')) {
            return Ok(Self::Custom {
                from: parse_date(from)?,
                to: parse_date(to)?,
            });
        }

        let lowered = s.to_ascii_lowercase();
        if let Some(rest) = lowered.strip_prefix("last_") {
            if let Some((count, unit)) = rest.split_once('_') {
                let count = count
                    .parse::<u32>()
                    .map_err(|_| QueryError::UnsupportedRange(s.to_string()))?;
                return rolling(count, unit.parse()?);
            }
        }

        let digits = lowered.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 {
            let (count, unit) = lowered.split_at(digits);
            let count = count
                .parse::<u32>()
                .map_err(|_| QueryError::UnsupportedRange(s.to_string()))?;
            return rolling(count, unit.parse()?);
        }

        Err(QueryError::UnsupportedRange(s.to_string()))
    }
}

fn rolling(count: u32, unit: RollingUnit) -> Result<TimeRangeSpec, QueryError> {
    if count == 0 {
        return Err(QueryError::InvalidCount);
    }
    Ok(TimeRangeSpec::Rolling { count, unit })
}

/// Parse an ISO-8601 calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, QueryError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| QueryError::InvalidDate(s.to_string()))
}

/// The wire shapes a tool call may use for a time range.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeRange {
    Text(String),
    Custom { from: String, to: String },
    Rolling { last: u32, unit: String },
}

impl TryFrom<RawTimeRange> for TimeRangeSpec {
    type Error = QueryError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        match raw {
            RawTimeRange::Text(text) => text.parse(),
            RawTimeRange::Custom { from, to } => Ok(Self::Custom {
                from: parse_date(&from)?,
                to: parse_date(&to)?,
            }),
            RawTimeRange::Rolling { last, unit } => rolling(last, unit.parse()?),
        }
    }
}

/// The exact range expression the provider expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProviderToken {
    /// A relative period such as `7d`, `month`, or `6mo`.
    Period(String),
    /// An explicit inclusive date pair.
    Dates(NaiveDate, NaiveDate),
}

impl ProviderToken {
    /// The period string, if this is a relative token.
    pub fn period(&self) -> Option<&str> {
        match self {
            Self::Period(period) => Some(period),
            Self::Dates(..) => None,
        }
    }
}

impl fmt::Display for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Period(period) => f.write_str(period),
            Self::Dates(from, to) => write!(f, "{from},{to}"),
        }
    }
}

/// Output of [`normalize`]: explicit bounds plus the provider token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRange {
    /// First day of the window (inclusive).
    pub start: NaiveDate,
    /// Last day of the window (inclusive).
    pub end: NaiveDate,
    /// Range expression for the provider.
    #[serde(rename = "provider_token")]
    pub token: ProviderToken,
    /// True when the window does not end on the reference date, so a
    /// relative token alone would be read against the provider's "today".
    #[serde(skip)]
    pub anchored: bool,
}

impl NormalizedRange {
    /// Query-string parameters for the v1 stats endpoints.
    ///
    /// Tokens outside the v1 vocabulary fall back to an explicit custom
    /// period so the provider never sees a period it would reject.
    pub fn v1_params(&self) -> Vec<(&'static str, String)> {
        match &self.token {
            ProviderToken::Period(period) if V1_PERIODS.contains(&period.as_str()) => {
                let mut params = vec![("period", period.clone())];
                if period == "day" || period == "month" {
                    params.push(("date", self.start.to_string()));
                }
                params
            }
            _ => vec![
                ("period", "custom".to_string()),
                ("date", format!("{},{}", self.start, self.end)),
            ],
        }
    }

    /// The `date_range` value for the v2 query endpoint.
    pub fn v2_date_range(&self) -> Value {
        match &self.token {
            ProviderToken::Period(period)
                if !self.anchored && V2_PERIODS.contains(&period.as_str()) =>
            {
                json!(period)
            }
            _ => json!([self.start.to_string(), self.end.to_string()]),
        }
    }
}

/// Translate a [`TimeRangeSpec`] into explicit dates and a provider token,
/// relative to `reference` (the caller's local calendar date).
pub fn normalize(spec: &TimeRangeSpec, reference: NaiveDate) -> Result<NormalizedRange, QueryError> {
    match *spec {
        TimeRangeSpec::Named(named) => normalize_named(named, reference),
        TimeRangeSpec::Custom { from, to } => {
            if from > to {
                return Err(QueryError::InvalidRange { from, to });
            }
            Ok(NormalizedRange {
                start: from,
                end: to,
                token: ProviderToken::Dates(from, to),
                anchored: true,
            })
        }
        TimeRangeSpec::Rolling { count, unit } => normalize_rolling(count, unit, reference),
    }
}

fn normalize_named(named: NamedRange, reference: NaiveDate) -> Result<NormalizedRange, QueryError> {
    let period = |start: NaiveDate, end: NaiveDate, token: &str| NormalizedRange {
        start,
        end,
        token: ProviderToken::Period(token.to_string()),
        anchored: end != reference,
    };

    let range = match named {
        NamedRange::Today => period(reference, reference, "day"),
        NamedRange::Yesterday => {
            let day = days_before(reference, 1)?;
            period(day, day, "day")
        }
        NamedRange::Last7Days => period(days_before(reference, 7)?, reference, "7d"),
        NamedRange::Last30Days => period(days_before(reference, 30)?, reference, "30d"),
        NamedRange::ThisMonth => period(first_of_month(reference)?, reference, "month"),
        NamedRange::LastMonth => {
            let end = days_before(first_of_month(reference)?, 1)?;
            period(first_of_month(end)?, end, "month")
        }
        NamedRange::ThisYear => {
            let start = NaiveDate::from_ymd_opt(reference.year(), 1, 1)
                .ok_or(QueryError::DateOutOfRange)?;
            period(start, reference, "year")
        }
    };
    Ok(range)
}

fn normalize_rolling(
    count: u32,
    unit: RollingUnit,
    reference: NaiveDate,
) -> Result<NormalizedRange, QueryError> {
    if count == 0 {
        return Err(QueryError::InvalidCount);
    }

    let (start, token) = match unit {
        RollingUnit::Days => (days_before(reference, u64::from(count))?, format!("{count}d")),
        RollingUnit::Weeks => {
            let days = u64::from(count) * 7;
            (days_before(reference, days)?, format!("{days}d"))
        }
        RollingUnit::Months => (
            reference
                .checked_sub_months(Months::new(count))
                .ok_or(QueryError::DateOutOfRange)?,
            format!("{count}mo"),
        ),
    };

    Ok(NormalizedRange {
        start,
        end: reference,
        token: ProviderToken::Period(token),
        anchored: false,
    })
}

fn days_before(date: NaiveDate, days: u64) -> Result<NaiveDate, QueryError> {
    date.checked_sub_days(Days::new(days))
        .ok_or(QueryError::DateOutOfRange)
}

fn first_of_month(date: NaiveDate) -> Result<NaiveDate, QueryError> {
    date.with_day(1).ok_or(QueryError::DateOutOfRange)
}
