//! Publication date window for the vote-ranked feed.

use crate::feed::cursor::CursorError;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Length of the default `top` window, ending today.
pub const DEFAULT_WINDOW_DAYS: u64 = 90;

/// Inclusive calendar-date range over `published_at`.
///
/// # Invariants
/// - `from <= to`.
/// - `to + 1 day` is representable, so `bounds()` cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateWindow {
    /// Builds a window from explicit inclusive bounds.
    ///
    /// # Errors
    /// - `CursorError::invalid_date_range()` when `from > to` or the end
    ///   date is the last representable day.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, CursorError> {
        if from > to || to.checked_add_days(Days::new(1)).is_none() {
            return Err(CursorError::invalid_date_range());
        }
        Ok(Self { from, to })
    }

    /// Resolves optional caller bounds against `today`.
    ///
    /// Missing `to` defaults to `today`; missing `from` defaults to
    /// `DEFAULT_WINDOW_DAYS` before the resolved `to`.
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, CursorError> {
        let end = to.unwrap_or(today);
        let start = match from {
            Some(start) => start,
            None => end
                .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
                .ok_or_else(CursorError::invalid_date_range)?,
        };
        Self::new(start, end)
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Half-open UTC datetime bounds `[from 00:00, (to + 1 day) 00:00)`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.from.and_time(NaiveTime::MIN).and_utc();
        let end_exclusive = self
            .to
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN)
            .and_utc();
        (start, end_exclusive)
    }
}
