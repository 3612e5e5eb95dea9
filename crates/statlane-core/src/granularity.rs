use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The time unit events are aggregated at. Ordered by duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn parse(raw: &str) -> EngineResult<Self> {
        match raw.trim() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(EngineError::BadRequest(format!(
                "granularity must be one of: minute, hour, day, month, year (got {other:?})"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// chrono format string for axis labels at this granularity.
    pub fn label_format(&self) -> &'static str {
        match self {
            Self::Minute | Self::Hour => "%Y-%m-%d %H:%M:%S",
            Self::Day => "%Y-%m-%d",
            Self::Month => "%Y-%m",
            Self::Year => "%Y",
        }
    }
}

/// Named relative reporting periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "1d")]
    LastDay,
    #[serde(rename = "7d")]
    LastSevenDays,
    #[serde(rename = "4w")]
    LastFourWeeks,
    #[serde(rename = "3M")]
    LastThreeMonths,
    #[serde(rename = "12M")]
    LastTwelveMonths,
    #[serde(rename = "24M")]
    LastTwentyFourMonths,
    #[serde(rename = "all")]
    All,
    #[serde(rename = "custom")]
    Custom,
}

impl Period {
    pub fn parse(raw: &str) -> EngineResult<Self> {
        match raw.trim() {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "1h" => Ok(Self::LastHour),
            "1d" => Ok(Self::LastDay),
            "7d" => Ok(Self::LastSevenDays),
            "4w" => Ok(Self::LastFourWeeks),
            "3M" => Ok(Self::LastThreeMonths),
            "12M" => Ok(Self::LastTwelveMonths),
            "24M" => Ok(Self::LastTwentyFourMonths),
            "all" => Ok(Self::All),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::BadRequest(format!(
                "unsupported period {other:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::LastHour => "1h",
            Self::LastDay => "1d",
            Self::LastSevenDays => "7d",
            Self::LastFourWeeks => "4w",
            Self::LastThreeMonths => "3M",
            Self::LastTwelveMonths => "12M",
            Self::LastTwentyFourMonths => "24M",
            Self::All => "all",
            Self::Custom => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_is_ordered_by_duration() {
        assert!(Granularity::Minute < Granularity::Hour);
        assert!(Granularity::Hour < Granularity::Day);
        assert!(Granularity::Day < Granularity::Month);
        assert!(Granularity::Month < Granularity::Year);
    }

    #[test]
    fn granularity_parse_round_trips() {
        for raw in ["minute", "hour", "day", "month", "year"] {
            let g = Granularity::parse(raw).ok();
            assert_eq!(g.map(|g| g.as_str()), Some(raw));
        }
        assert!(Granularity::parse("fortnight").is_err());
    }

    #[test]
    fn period_parse_round_trips() {
        for raw in [
            "today", "yesterday", "1h", "1d", "7d", "4w", "3M", "12M", "24M", "all", "custom",
        ] {
            let p = Period::parse(raw).ok();
            assert_eq!(p.map(|p| p.as_str()), Some(raw));
        }
        assert!(Period::parse("2w").is_err());
    }
}
