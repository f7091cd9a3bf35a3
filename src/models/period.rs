//! Calendar buckets
//!
//! A [`PeriodBucket`] is a half-open UTC interval `[start, end)` for one of the
//! supported granularities. Bucketing is always done in UTC so results are
//! deterministic; converting to local time is a display concern.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FintraxError, FintraxResult};

/// Size of a calendar bucket
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    /// ISO week, Monday through Sunday
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = FintraxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            other => Err(FintraxError::InvalidPeriod(format!(
                "unknown granularity '{}'",
                other
            ))),
        }
    }
}

/// A validated half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// An empty range (`start == end`) is allowed; an inverted one is not.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> FintraxResult<Self> {
        if start > end {
            return Err(FintraxError::InvalidPeriod(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// One calendar bucket: granularity plus its `[start, end)` interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodBucket {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    granularity: Granularity,
}

fn ymd(year: i32, month: u32, day: u32) -> FintraxResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        FintraxError::InvalidPeriod(format!("{:04}-{:02}-{:02} is not a date", year, month, day))
    })
}

fn out_of_range(date: NaiveDate) -> FintraxError {
    FintraxError::InvalidPeriod(format!("bucket around {} is outside the supported calendar", date))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl PeriodBucket {
    /// The bucket of `granularity` that contains `ts`
    pub fn containing(ts: DateTime<Utc>, granularity: Granularity) -> FintraxResult<Self> {
        let date = ts.date_naive();
        let (start, end) = match granularity {
            Granularity::Daily => {
                let next = date.succ_opt().ok_or_else(|| out_of_range(date))?;
                (date, next)
            }
            Granularity::Weekly => {
                let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
                let monday = date.checked_sub_days(back).ok_or_else(|| out_of_range(date))?;
                let next = monday
                    .checked_add_days(Days::new(7))
                    .ok_or_else(|| out_of_range(date))?;
                (monday, next)
            }
            Granularity::Monthly => {
                let first = ymd(date.year(), date.month(), 1)?;
                let next = if date.month() == 12 {
                    ymd(date.year() + 1, 1, 1)?
                } else {
                    ymd(date.year(), date.month() + 1, 1)?
                };
                (first, next)
            }
            Granularity::Yearly => (ymd(date.year(), 1, 1)?, ymd(date.year() + 1, 1, 1)?),
        };

        Ok(Self {
            start: midnight(start),
            end: midnight(end),
            granularity,
        })
    }

    /// Parse a bucket key for a known granularity
    ///
    /// Formats: daily "2024-01-15", weekly "2024-W03", monthly "2024-01",
    /// yearly "2024".
    pub fn parse(granularity: Granularity, key: &str) -> FintraxResult<Self> {
        let key = key.trim();
        let invalid = || {
            FintraxError::InvalidPeriod(format!("'{}' is not a {} period key", key, granularity))
        };

        let date = match granularity {
            Granularity::Daily => {
                NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| invalid())?
            }
            Granularity::Weekly => {
                let (year, week) = key.split_once("-W").ok_or_else(invalid)?;
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let week: u32 = week.parse().map_err(|_| invalid())?;
                NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)?
            }
            Granularity::Monthly => {
                let (year, month) = key.split_once('-').ok_or_else(invalid)?;
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&month) {
                    return Err(FintraxError::InvalidPeriod(format!("invalid month: {}", month)));
                }
                ymd(year, month, 1)?
            }
            Granularity::Yearly => {
                let year: i32 = key.parse().map_err(|_| invalid())?;
                ymd(year, 1, 1)?
            }
        };

        Self::containing(midnight(date), granularity)
    }

    /// Parse a bucket key, inferring the granularity from its shape
    pub fn parse_key(key: &str) -> FintraxResult<Self> {
        let key = key.trim();
        let granularity = if key.contains("-W") {
            Granularity::Weekly
        } else {
            match key.matches('-').count() {
                0 => Granularity::Yearly,
                1 => Granularity::Monthly,
                2 => Granularity::Daily,
                _ => {
                    return Err(FintraxError::InvalidPeriod(format!(
                        "unrecognised period key '{}'",
                        key
                    )))
                }
            }
        };
        Self::parse(granularity, key)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Inclusive start instant
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Half-open membership: the start instant belongs here, the end does not
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Number of calendar days the bucket covers
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn next(&self) -> FintraxResult<Self> {
        Self::containing(self.end, self.granularity)
    }

    pub fn prev(&self) -> FintraxResult<Self> {
        let day_before = self
            .start
            .date_naive()
            .pred_opt()
            .ok_or_else(|| out_of_range(self.start.date_naive()))?;
        Self::containing(midnight(day_before), self.granularity)
    }

    /// Canonical key, e.g. "2024-01" for a monthly bucket
    pub fn key(&self) -> String {
        let date = self.start.date_naive();
        match self.granularity {
            Granularity::Daily => date.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => {
                let week = date.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Granularity::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
            Granularity::Yearly => format!("{:04}", date.year()),
        }
    }
}

impl fmt::Display for PeriodBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
