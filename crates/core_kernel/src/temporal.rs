//! Temporal types for regulatory reporting periods
//!
//! Thai filings run on the Buddhist calendar (Gregorian year + 543) and
//! monthly reporting windows. The regulatory "day" is the Bangkok day, not
//! the UTC day, so rate lookup and month assignment convert through
//! Asia/Bangkok.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Asia::Bangkok;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Offset between the Gregorian and Buddhist-era year
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid year-month: {0}")]
    InvalidYearMonth(String),

    #[error("Invalid date components: {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Returns the Buddhist-era year for a Gregorian date
pub fn buddhist_year(date: NaiveDate) -> i32 {
    date.year() + BUDDHIST_ERA_OFFSET
}

/// Returns the last two digits of the Buddhist-era year, e.g. 68 for 2025
pub fn buddhist_year_2digit(date: NaiveDate) -> u32 {
    (buddhist_year(date).rem_euclid(100)) as u32
}

/// Returns today's date in the Bangkok timezone
pub fn bangkok_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Bangkok).date_naive()
}

/// A calendar month used to key sequences and monthly filings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Creates a year-month, validating the month range
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1..=12).contains(&month) {
            return Err(TemporalError::InvalidYearMonth(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// The month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month containing the given instant, in Bangkok time
    pub fn from_instant(at: DateTime<Utc>) -> Self {
        Self::from_date(bangkok_today(at))
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated month")
    }

    /// Last day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.succ().first_day().pred_opt().expect("month has a last day")
    }

    /// The following month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The preceding month
    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Buddhist-era year of this month
    pub fn buddhist_year(&self) -> i32 {
        self.year + BUDDHIST_ERA_OFFSET
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| TemporalError::InvalidYearMonth(s.to_string()))?;
        let year = y
            .parse()
            .map_err(|_| TemporalError::InvalidYearMonth(s.to_string()))?;
        let month = m
            .parse()
            .map_err(|_| TemporalError::InvalidYearMonth(s.to_string()))?;
        Self::new(year, month)
    }
}

/// Thai month names as printed on the BOT Provider sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThaiMonth(pub u32);

impl ThaiMonth {
    pub fn name(&self) -> &'static str {
        match self.0 {
            1 => "มกราคม",
            2 => "กุมภาพันธ์",
            3 => "มีนาคม",
            4 => "เมษายน",
            5 => "พฤษภาคม",
            6 => "มิถุนายน",
            7 => "กรกฎาคม",
            8 => "สิงหาคม",
            9 => "กันยายน",
            10 => "ตุลาคม",
            11 => "พฤศจิกายน",
            12 => "ธันวาคม",
            _ => "",
        }
    }
}

/// A half-open time window `[start, end)` over UTC instants
///
/// Used for the cumulative customer aggregates (trailing 30 days, trailing
/// 24 hours) and for bounding monthly report queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportingWindow {
    /// The trailing window of `days` days ending at `now`
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// The trailing window of `hours` hours ending at `now`
    pub fn trailing_hours(now: DateTime<Utc>, hours: i64) -> Self {
        Self {
            start: now - Duration::hours(hours),
            end: now,
        }
    }

    /// The Bangkok calendar month as a UTC window
    pub fn for_month(ym: YearMonth) -> Self {
        let start = ym
            .first_day()
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists")
            .and_local_timezone(Bangkok)
            .single()
            .expect("Bangkok has no DST gaps")
            .with_timezone(&Utc);
        let end = ym
            .succ()
            .first_day()
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists")
            .and_local_timezone(Bangkok)
            .single()
            .expect("Bangkok has no DST gaps")
            .with_timezone(&Utc);
        Self { start, end }
    }

    /// Returns true if this window contains the instant
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_buddhist_year() {
        let d = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        assert_eq!(buddhist_year(d), 2568);
        assert_eq!(buddhist_year_2digit(d), 68);
    }

    #[test]
    fn test_year_month_display_and_parse() {
        let ym = YearMonth::new(2025, 10).unwrap();
        assert_eq!(ym.to_string(), "2025-10");
        assert_eq!("2025-10".parse::<YearMonth>().unwrap(), ym);
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("2025".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_year_month_boundaries() {
        let dec = YearMonth::new(2025, 12).unwrap();
        assert_eq!(dec.succ(), YearMonth::new(2026, 1).unwrap());
        assert_eq!(dec.pred(), YearMonth::new(2025, 11).unwrap());
        assert_eq!(
            dec.last_day(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_month_window_is_half_open() {
        let ym = YearMonth::new(2025, 10).unwrap();
        let window = ReportingWindow::for_month(ym);

        // 2025-10-01 00:00 Bangkok is 2025-09-30 17:00 UTC
        let first = Utc.with_ymd_and_hms(2025, 9, 30, 17, 0, 0).unwrap();
        assert_eq!(window.start, first);
        assert!(window.contains(first));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_bangkok_day_rolls_before_utc() {
        // 18:00 UTC is already the next day in Bangkok (+7)
        let at = Utc.with_ymd_and_hms(2025, 10, 1, 18, 0, 0).unwrap();
        assert_eq!(
            bangkok_today(at),
            NaiveDate::from_ymd_opt(2025, 10, 2).unwrap()
        );
    }

    #[test]
    fn test_thai_month_names() {
        assert_eq!(ThaiMonth(1).name(), "มกราคม");
        assert_eq!(ThaiMonth(10).name(), "ตุลาคม");
        assert_eq!(ThaiMonth(13).name(), "");
    }
}
