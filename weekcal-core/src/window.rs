//! Time windows and local-day arithmetic.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Number of days shown in a week view.
pub const WEEK_DAYS: usize = 7;

/// Half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Returns `None` when `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Window { start, end })
    }

    /// Local midnight of `anchor` up to local midnight seven days later.
    pub fn week_of(anchor: NaiveDate, zone: Tz) -> Self {
        let end_date = anchor
            .checked_add_days(Days::new(WEEK_DAYS as u64))
            .unwrap_or(NaiveDate::MAX);
        Window {
            start: local_midnight(anchor, zone),
            end: local_midnight(end_date, zone),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Interpret a wall-clock time in `zone`.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap are moved forward one hour.
pub fn resolve_local(naive: NaiveDateTime, zone: Tz) -> DateTime<Utc> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => zone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
    }
}

pub fn local_midnight(date: NaiveDate, zone: Tz) -> DateTime<Utc> {
    resolve_local(date.and_time(chrono::NaiveTime::MIN), zone)
}

/// The calendar day an instant falls on, as seen from `zone`.
pub fn local_date(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn week_window_spans_local_midnights() {
        let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let window = Window::week_of(anchor, chrono_tz::Europe::Berlin);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 1, 7, 23, 0, 0).unwrap());
    }

    #[test]
    fn window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let window = Window::new(start, end).unwrap();

        assert!(window.contains(start));
        assert!(!window.contains(end));
        assert!(Window::new(end, start).is_none());
    }

    #[test]
    fn gap_times_move_forward() {
        // 2024-03-31 02:30 does not exist in Berlin
        let naive = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let resolved = resolve_local(naive, chrono_tz::Europe::Berlin);

        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap());
    }

    #[test]
    fn local_date_differs_from_utc_date() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 23, 30, 0).unwrap();

        assert_eq!(
            local_date(instant, chrono_tz::Europe::Berlin),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
        assert_eq!(
            local_date(instant, chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }
}
