//! Validation errors raised while building analytics queries.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced when a user-facing query shape cannot be translated into
/// the provider's query schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The named or shorthand time range is not one we know how to express.
    #[error("unsupported time range: {0}")]
    UnsupportedRange(String),

    /// The rolling-window unit is not days, weeks, or months.
    #[error("unsupported time unit: {0} (expected days, weeks, or months)")]
    UnsupportedUnit(String),

    /// A custom range whose start falls after its end.
    #[error("invalid date range: {from} is after {to}")]
    InvalidRange {
        /// Requested start date.
        from: NaiveDate,
        /// Requested end date.
        to: NaiveDate,
    },

    /// Rolling windows must cover at least one unit.
    #[error("rolling window count must be a positive integer")]
    InvalidCount,

    /// A date that is not a valid ISO-8601 calendar date.
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Date arithmetic left the representable calendar.
    #[error("date out of range")]
    DateOutOfRange,

    /// A metric alias missing from the alias table.
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// A dimension identifier the provider does not support.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    /// A filter operator outside the supported set.
    #[error("unknown filter operator: {0}")]
    UnknownOperator(String),

    /// Queries must target a site.
    #[error("site_id must not be empty")]
    EmptySiteId,

    /// A filter that cannot be expressed (missing values, malformed triple).
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}
