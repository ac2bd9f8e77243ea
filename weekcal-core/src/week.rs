//! Seven-day grouping of normalized events.

use chrono::{Days, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::event::NormalizedEvent;
use crate::window::{WEEK_DAYS, local_date};

/// Events starting on one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub events: Vec<NormalizedEvent>,
}

impl DayBucket {
    pub fn new(date: NaiveDate) -> Self {
        DayBucket {
            date,
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Exactly seven consecutive day buckets, starting at the anchor date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekView {
    pub days: [DayBucket; WEEK_DAYS],
}

impl WeekView {
    /// Seven empty buckets; what the view shows when there is no document.
    pub fn empty(anchor: NaiveDate) -> Self {
        WeekView {
            days: std::array::from_fn(|i| {
                let date = anchor
                    .checked_add_days(Days::new(i as u64))
                    .unwrap_or(NaiveDate::MAX);
                DayBucket::new(date)
            }),
        }
    }

    pub fn anchor(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn bucket(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.days.iter().find(|day| day.date == date)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DayBucket> {
        self.days.iter()
    }

    pub fn event_count(&self) -> usize {
        self.days.iter().map(|day| day.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }
}

/// Bucket `events` (sorted by start) into the week beginning at `anchor`.
///
/// The day of an event is the date of its start instant in `zone`. Events
/// outside the seven days are dropped.
pub fn group_by_day(
    events: impl IntoIterator<Item = NormalizedEvent>,
    anchor: NaiveDate,
    zone: Tz,
) -> WeekView {
    let mut view = WeekView::empty(anchor);

    for event in events {
        let offset = (local_date(event.start, zone) - anchor).num_days();
        if let Some(bucket) = usize::try_from(offset)
            .ok()
            .and_then(|i| view.days.get_mut(i))
        {
            bucket.events.push(event);
        }
    }

    view
}
