//! Breakdown dimensions ("properties") supported by the analytics provider.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::QueryError;

/// A built-in provider property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    EventName,
    EventPage,
    EventHostname,
    EventGoal,
    EntryPage,
    ExitPage,
    Source,
    Referrer,
    UtmMedium,
    UtmSource,
    UtmCampaign,
    UtmContent,
    UtmTerm,
    Device,
    Browser,
    BrowserVersion,
    Os,
    OsVersion,
    Country,
    Region,
    City,
    Time,
    TimeHour,
    TimeDay,
    TimeWeek,
    TimeMonth,
}

impl Property {
    pub const ALL: [Property; 26] = [
        Self::EventName,
        Self::EventPage,
        Self::EventHostname,
        Self::EventGoal,
        Self::EntryPage,
        Self::ExitPage,
        Self::Source,
        Self::Referrer,
        Self::UtmMedium,
        Self::UtmSource,
        Self::UtmCampaign,
        Self::UtmContent,
        Self::UtmTerm,
        Self::Device,
        Self::Browser,
        Self::BrowserVersion,
        Self::Os,
        Self::OsVersion,
        Self::Country,
        Self::Region,
        Self::City,
        Self::Time,
        Self::TimeHour,
        Self::TimeDay,
        Self::TimeWeek,
        Self::TimeMonth,
    ];

    /// `(provider id, display label, key of the value in breakdown results)`.
    fn spec(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::EventName => ("event:name", "Event", "name"),
            Self::EventPage => ("event:page", "Page", "page"),
            Self::EventHostname => ("event:hostname", "Hostname", "hostname"),
            Self::EventGoal => ("event:goal", "Goal", "goal"),
            Self::EntryPage => ("visit:entry_page", "Entry page", "entry_page"),
            Self::ExitPage => ("visit:exit_page", "Exit page", "exit_page"),
            Self::Source => ("visit:source", "Source", "source"),
            Self::Referrer => ("visit:referrer", "Referrer", "referrer"),
            Self::UtmMedium => ("visit:utm_medium", "UTM medium", "utm_medium"),
            Self::UtmSource => ("visit:utm_source", "UTM source", "utm_source"),
            Self::UtmCampaign => ("visit:utm_campaign", "UTM campaign", "utm_campaign"),
            Self::UtmContent => ("visit:utm_content", "UTM content", "utm_content"),
            Self::UtmTerm => ("visit:utm_term", "UTM term", "utm_term"),
            Self::Device => ("visit:device", "Device", "device"),
            Self::Browser => ("visit:browser", "Browser", "browser"),
            Self::BrowserVersion => ("visit:browser_version", "Browser version", "browser_version"),
            Self::Os => ("visit:os", "Operating system", "os"),
            Self::OsVersion => ("visit:os_version", "OS version", "os_version"),
            Self::Country => ("visit:country", "Country", "country"),
            Self::Region => ("visit:region", "Region", "region"),
            Self::City => ("visit:city", "City", "city"),
            Self::Time => ("time", "Time", "time"),
            Self::TimeHour => ("time:hour", "Hour", "time:hour"),
            Self::TimeDay => ("time:day", "Day", "time:day"),
            Self::TimeWeek => ("time:week", "Week", "time:week"),
            Self::TimeMonth => ("time:month", "Month", "time:month"),
        }
    }

    pub fn id(self) -> &'static str {
        self.spec().0
    }

    pub fn label(self) -> &'static str {
        self.spec().1
    }

    pub fn result_key(self) -> &'static str {
        self.spec().2
    }

    /// Time buckets are only valid for the v2 query endpoint.
    pub fn is_time(self) -> bool {
        matches!(
            self,
            Self::Time | Self::TimeHour | Self::TimeDay | Self::TimeWeek | Self::TimeMonth
        )
    }
}

/// A breakdown dimension: either a built-in property or a custom event prop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dimension {
    Standard(Property),
    /// `event:props:<name>`
    CustomProp(String),
}

const CUSTOM_PROP_PREFIX: &str = "event:props:";

impl Dimension {
    /// Provider identifier, e.g. `visit:country` or `event:props:plan`.
    pub fn identifier(&self) -> Cow<'static, str> {
        match self {
            Self::Standard(property) => Cow::Borrowed(property.id()),
            Self::CustomProp(name) => Cow::Owned(format!("{CUSTOM_PROP_PREFIX}{name}")),
        }
    }

    pub fn label(&self) -> Cow<'static, str> {
        match self {
            Self::Standard(property) => Cow::Borrowed(property.label()),
            Self::CustomProp(name) => Cow::Owned(name.clone()),
        }
    }

    /// Key holding the dimension value in v1 breakdown records.
    pub fn result_key(&self) -> &str {
        match self {
            Self::Standard(property) => property.result_key(),
            Self::CustomProp(name) => name,
        }
    }

    pub fn is_time(&self) -> bool {
        matches!(self, Self::Standard(property) if property.is_time())
    }
}

impl From<Property> for Dimension {
    fn from(property: Property) -> Self {
        Self::Standard(property)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl FromStr for Dimension {
    type Err = QueryError;

    /// Accepts provider ids (`visit:country`), result-key shorthands
    /// (`country`), the time aliases `date`, `day`, `hour`, `week`,
    /// `month`, and custom props (`event:props:plan`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix(CUSTOM_PROP_PREFIX) {
            if name.is_empty() {
                return Err(QueryError::UnknownDimension(s.to_string()));
            }
            return Ok(Self::CustomProp(name.to_string()));
        }

        let alias = match s {
            "date" | "day" => Some(Property::TimeDay),
            "hour" => Some(Property::TimeHour),
            "week" => Some(Property::TimeWeek),
            "month" => Some(Property::TimeMonth),
            _ => None,
        };
        if let Some(property) = alias {
            return Ok(property.into());
        }

        Property::ALL
            .into_iter()
            .find(|property| property.id() == s || property.result_key() == s)
            .map(Self::Standard)
            .ok_or_else(|| QueryError::UnknownDimension(s.to_string()))
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.identifier())
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_round_trip() {
        for property in Property::ALL {
            let parsed: Dimension = property.id().parse().unwrap();
            assert_eq!(parsed, Dimension::Standard(property));
        }
    }

    #[test]
    fn shorthands_and_aliases() {
        assert_eq!(
            "country".parse::<Dimension>().unwrap(),
            Dimension::from(Property::Country)
        );
        assert_eq!("page".parse::<Dimension>().unwrap(), Dimension::from(Property::EventPage));
        assert_eq!("date".parse::<Dimension>().unwrap(), Dimension::from(Property::TimeDay));
        assert_eq!("week".parse::<Dimension>().unwrap(), Dimension::from(Property::TimeWeek));
    }

    #[test]
    fn custom_props() {
        let dim: Dimension = "event:props:plan".parse().unwrap();
        assert_eq!(dim, Dimension::CustomProp("plan".into()));
        assert_eq!(dim.identifier(), "event:props:plan");
        assert_eq!(dim.result_key(), "plan");
        assert!("event:props:".parse::<Dimension>().is_err());
    }

    #[test]
    fn unknown_dimension() {
        assert_eq!(
            "visit:shoe_size".parse::<Dimension>(),
            Err(QueryError::UnknownDimension("visit:shoe_size".into()))
        );
    }

    #[test]
    fn serializes_as_identifier() {
        let dims = vec![Dimension::from(Property::Source), Dimension::CustomProp("plan".into())];
        let json = serde_json::to_value(&dims).unwrap();
        assert_eq!(json, serde_json::json!(["visit:source", "event:props:plan"]));
        let back: Vec<Dimension> = serde_json::from_value(json).unwrap();
        assert_eq!(back, dims);
    }
}
