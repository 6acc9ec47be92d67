use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use crate::dimension::Dimension;
use crate::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Is,
    IsNot,
    Contains,
    ContainsNot,
    Matches,
    MatchesNot,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is_not",
            Self::Contains => "contains",
            Self::ContainsNot => "contains_not",
            Self::Matches => "matches",
            Self::MatchesNot => "matches_not",
        }
    }

    /// Operator symbol in the v1 `filters` query string. The v1 API has no
    /// regex operators; wildcards in the value carry the pattern instead.
    pub fn v1_symbol(self) -> &'static str {
        match self {
            Self::Is | Self::Matches => "==",
            Self::IsNot | Self::MatchesNot => "!=",
            Self::Contains => "~",
            Self::ContainsNot => "!~",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "is" => Ok(Self::Is),
            "is_not" => Ok(Self::IsNot),
            "contains" => Ok(Self::Contains),
            "contains_not" => Ok(Self::ContainsNot),
            "matches" => Ok(Self::Matches),
            "matches_not" => Ok(Self::MatchesNot),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }
}

/// A single filter clause: `dimension <operator> any-of(values)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub operator: FilterOperator,
    pub dimension: Dimension,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(
        operator: FilterOperator,
        dimension: Dimension,
        values: Vec<String>,
    ) -> Result<Self, QueryError> {
        if values.is_empty() {
            return Err(QueryError::InvalidFilter(format!(
                "{dimension} filter has no values"
            )));
        }
        Ok(Self {
            operator,
            dimension,
            values,
        })
    }

    /// Shorthand for an `is` filter on one value.
    pub fn is(dimension: impl Into<Dimension>, value: impl Into<String>) -> Self {
        Self {
            operator: FilterOperator::Is,
            dimension: dimension.into(),
            values: vec![value.into()],
        }
    }

    /// `[operator, dimension, [values...]]` as the v2 endpoint expects.
    pub fn to_v2(&self) -> Value {
        json!([self.operator.as_str(), self.dimension.identifier(), self.values])
    }

    /// Parse a v2 filter triple. A bare string is accepted for the values.
    pub fn from_v2(value: &Value) -> Result<Self, QueryError> {
        let invalid = || QueryError::InvalidFilter(value.to_string());
        let parts = value.as_array().ok_or_else(invalid)?;
        let [operator, dimension, values] = parts.as_slice() else {
            return Err(invalid());
        };

        let operator = operator.as_str().ok_or_else(invalid)?.parse()?;
        let dimension = dimension.as_str().ok_or_else(invalid)?.parse()?;
        let values = match values {
            Value::String(single) => vec![single.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        Self::new(operator, dimension, values)
    }

    /// `dimension<symbol>value1|value2` for the v1 query string.
    pub fn to_v1(&self) -> String {
        format!(
            "{}{}{}",
            self.dimension.identifier(),
            self.operator.v1_symbol(),
            self.values.join("|")
        )
    }
}

/// Join filters into the v1 `filters` parameter, or `None` when empty.
pub fn encode_v1(filters: &[Filter]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }
    Some(
        filters
            .iter()
            .map(Filter::to_v1)
            .collect::<Vec<_>>()
            .join(";"),
    )
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_v2().serialize(serializer)
    }
}

impl FromStr for Filter {
    type Err = QueryError;

    /// Command-line syntax: `dimension==a|b`, `dimension!=a`,
    /// `dimension~part`, `dimension!~part`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const TOKENS: [(&str, FilterOperator); 4] = [
            ("!~", FilterOperator::ContainsNot),
            ("!=", FilterOperator::IsNot),
            ("==", FilterOperator::Is),
            ("~", FilterOperator::Contains),
        ];

        for (token, operator) in TOKENS {
            if let Some((dimension, values)) = s.split_once(token) {
                let values = values
                    .split('|')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                return Self::new(operator, dimension.parse()?, values);
            }
        }
        Err(QueryError::InvalidFilter(s.to_string()))
    }
}
