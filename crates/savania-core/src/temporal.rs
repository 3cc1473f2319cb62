//! # Temporal Types — Local Calendar Windows
//!
//! Documents carry UTC instants (`date_soumission`, `created_at`) and
//! local calendar dates (`date_reservation`). Every "today", "this week"
//! or "this month" question is asked in the venue's local time and then
//! turned into a half-open UTC window `[start, end)` for querying.
//!
//! The venue's offset is a fixed `chrono::FixedOffset` taken from
//! configuration. Weeks start on Sunday.

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
};

use crate::error::SavaniaError;

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Whether `instant` falls inside the window.
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant < self.end
    }
}

/// Calendar arithmetic in the venue's local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalCalendar {
    offset: FixedOffset,
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl LocalCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Calendar at UTC+00:00 (Lomé).
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Parse an offset written as `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
    pub fn parse_offset(s: &str) -> Result<Self, SavaniaError> {
        let invalid = || SavaniaError::InvalidOffset {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }
        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(invalid()),
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
        let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
        if hours > 14 || minutes > 59 {
            return Err(invalid());
        }
        let offset =
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `instant` seen on the venue's wall clock.
    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Local calendar date of `instant`.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }

    /// UTC instant of local midnight starting `day`.
    ///
    /// Fails for days at the edge of the representable calendar, where the
    /// instant falls outside it.
    pub fn midnight(&self, day: NaiveDate) -> Result<DateTime<Utc>, SavaniaError> {
        let local = day.and_time(NaiveTime::MIN);
        let utc = local
            .checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))
            .ok_or(SavaniaError::DateOutOfRange { value: day })?;
        Ok(Utc.from_utc_datetime(&utc))
    }

    /// `[day 00:00, day+1 00:00)` in local time, as UTC instants.
    pub fn day_window(&self, day: NaiveDate) -> Result<TimeWindow, SavaniaError> {
        self.days_window(day, day)
    }

    /// `[from 00:00, to+1 00:00)`: every instant on the local days `from..=to`.
    pub fn days_window(&self, from: NaiveDate, to: NaiveDate) -> Result<TimeWindow, SavaniaError> {
        let after = to
            .checked_add_days(Days::new(1))
            .ok_or(SavaniaError::DateOutOfRange { value: to })?;
        Ok(TimeWindow {
            start: self.midnight(from)?,
            end: self.midnight(after)?,
        })
    }

    /// Sunday on or before `day`, or the first representable day.
    pub fn week_start(&self, day: NaiveDate) -> NaiveDate {
        day.checked_sub_days(Days::new(u64::from(day.weekday().num_days_from_sunday())))
            .unwrap_or(NaiveDate::MIN)
    }

    /// First day of the month containing `day`.
    pub fn month_start(&self, day: NaiveDate) -> NaiveDate {
        day.with_day(1).unwrap_or(day)
    }

    /// First day of the month before the one containing `day`.
    pub fn previous_month_start(&self, day: NaiveDate) -> NaiveDate {
        let month_start = self.month_start(day);
        let last_of_previous = month_start.pred_opt().unwrap_or(month_start);
        self.month_start(last_of_previous)
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_day(s: &str) -> Result<NaiveDate, SavaniaError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| SavaniaError::InvalidDate {
        value: s.to_string(),
    })
}
