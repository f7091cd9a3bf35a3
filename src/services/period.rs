//! Period calendar
//!
//! Maps instants to calendar buckets and enumerates trailing windows. The
//! notion of "now" comes from an injected [`Clock`] so every consumer is
//! deterministic under test.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{FintraxError, FintraxResult};
use crate::models::{Granularity, PeriodBucket, TimeRange};

/// Clock abstracts access to the current timestamp so services remain deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Longest trailing window `previous_periods` will enumerate
pub const MAX_WINDOW_PERIODS: usize = 10_000;

/// Bucket arithmetic anchored on an injected clock
#[derive(Clone)]
pub struct PeriodCalendar {
    clock: Arc<dyn Clock>,
}

impl PeriodCalendar {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Calendar on the system clock
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn bucket(&self, ts: DateTime<Utc>, granularity: Granularity) -> FintraxResult<PeriodBucket> {
        PeriodBucket::containing(ts, granularity)
    }

    /// Bucket containing "now"
    pub fn current(&self, granularity: Granularity) -> FintraxResult<PeriodBucket> {
        self.bucket(self.now(), granularity)
    }

    /// The `n` most recent buckets ending at `anchor`'s bucket, oldest first
    ///
    /// `n` above [`MAX_WINDOW_PERIODS`] is an `InvalidPeriod`, as is a
    /// window reaching past the start of the supported calendar.
    pub fn previous_periods(
        &self,
        n: usize,
        granularity: Granularity,
        anchor: DateTime<Utc>,
    ) -> FintraxResult<Vec<PeriodBucket>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        if n > MAX_WINDOW_PERIODS {
            return Err(FintraxError::InvalidPeriod(format!(
                "window of {} periods exceeds the limit of {}",
                n, MAX_WINDOW_PERIODS
            )));
        }
        let mut buckets = Vec::with_capacity(n);
        let mut bucket = self.bucket(anchor, granularity)?;
        buckets.push(bucket);
        while buckets.len() < n {
            bucket = bucket.prev()?;
            buckets.push(bucket);
        }
        buckets.reverse();
        Ok(buckets)
    }

    /// Validated half-open range
    pub fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> FintraxResult<TimeRange> {
        TimeRange::new(start, end)
    }

    /// Parse a bucket key, or fall back to the current bucket
    pub fn parse_or_current(
        &self,
        granularity: Granularity,
        key: Option<&str>,
    ) -> FintraxResult<PeriodBucket> {
        match key {
            Some(key) => PeriodBucket::parse(granularity, key),
            None => self.current(granularity),
        }
    }

    /// Year-to-date span ending now, and the same span one calendar year earlier
    ///
    /// Feb 29 maps to Feb 28 when the previous year is not a leap year.
    pub fn year_to_date_spans(&self) -> FintraxResult<(TimeRange, TimeRange)> {
        let now = self.now();
        let year = self.bucket(now, Granularity::Yearly)?;
        let current = TimeRange::new(year.start(), now)?;

        let previous_year = year.prev()?;
        let shifted = shift_back_one_year(now)?;
        let previous = TimeRange::new(previous_year.start(), shifted)?;
        Ok((current, previous))
    }
}

fn shift_back_one_year(ts: DateTime<Utc>) -> FintraxResult<DateTime<Utc>> {
    use chrono::Datelike;

    let date = ts.date_naive();
    let target_year = date.year() - 1;
    let shifted = NaiveDate::from_ymd_opt(target_year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(target_year, date.month(), 28))
        .ok_or_else(|| FintraxError::InvalidPeriod(format!("cannot shift {} back a year", ts)))?;
    Ok(shifted.and_time(ts.time()).and_utc())
}
