//! Date range for discovery windows and queries.

use chrono::{DateTime, NaiveDate, Utc};

/// Date range for filtering meetings.
/// None values mean unbounded in that direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        DateRange {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Parse `YYYY-MM-DD` bounds; a missing bound is unbounded.
    pub fn from_args(from: Option<&str>, to: Option<&str>) -> Result<Self, String> {
        Ok(DateRange {
            from: from.map(parse_date_start).transpose()?,
            to: to.map(parse_date_end).transpose()?,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }

    /// Get `from` as RFC3339 string, using the epoch if unbounded.
    pub fn from_rfc3339(&self) -> String {
        self.from.unwrap_or(DateTime::UNIX_EPOCH).to_rfc3339()
    }

    /// Get `to` as RFC3339 string, using a far future date if unbounded.
    pub fn to_rfc3339(&self) -> String {
        self.to
            .unwrap_or_else(|| far_future().unwrap_or_else(Utc::now))
            .to_rfc3339()
    }
}

fn far_future() -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(2100, 1, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Parse YYYY-MM-DD as start of day in UTC
pub fn parse_date_start(s: &str) -> Result<DateTime<Utc>, String> {
    let date = parse_date(s)?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("Invalid date '{}'", s))
}

/// Parse YYYY-MM-DD as end of day in UTC
pub fn parse_date_end(s: &str) -> Result<DateTime<Utc>, String> {
    let date = parse_date(s)?;
    date.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("Invalid date '{}'", s))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}
