pub mod breakdown;
pub mod deployment;
pub mod dimension;
pub mod error;
pub mod filter;
pub mod log_entry;
pub mod metric;
pub mod query;
pub mod range;

pub use breakdown::{
    AggregateResult, BreakdownQuery, BreakdownResult, DEFAULT_LIMIT, MAX_LIMIT, Pagination,
    Record, Site, TimeseriesPoint, TimeseriesResult,
};
pub use deployment::{Deployment, DeploymentEvent, Project, SUCCESS_STATES};
pub use dimension::{Dimension, Property};
pub use error::QueryError;
pub use filter::{Filter, FilterOperator, encode_v1};
pub use log_entry::ApiLogEntry;
pub use metric::{METRIC_ALIASES, Metric, map_metrics, resolve_alias};
pub use query::{QueryPagination, QueryRequest, QueryResponse, QueryRow};
pub use range::{
    NamedRange, NormalizedRange, ProviderToken, RollingUnit, TimeRangeSpec, normalize, parse_date,
};
