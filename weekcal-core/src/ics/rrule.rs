//! RRULE value parsing for the FREQ/INTERVAL/COUNT/UNTIL subset.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::event::{Frequency, RecurrenceRule, Termination};
use crate::window::{local_midnight, resolve_local};

/// Parse an RRULE value like `FREQ=WEEKLY;INTERVAL=2;UNTIL=20240301T000000Z`.
///
/// Returns `None` when FREQ is missing or not DAILY/WEEKLY. Other parts
/// (BYDAY, WKST, ...) are ignored. Floating UNTIL values are read in `zone`.
pub fn parse_rrule(value: &str, zone: Tz) -> Option<RecurrenceRule> {
    let mut frequency = None;
    let mut interval = 1;
    let mut count = None;
    let mut until = None;

    for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, val)) = part.split_once('=') else {
            debug!(part, "Ignoring RRULE part without value");
            continue;
        };

        match key.to_ascii_uppercase().as_str() {
            "FREQ" => {
                frequency = match val.to_ascii_uppercase().as_str() {
                    "DAILY" => Some(Frequency::Daily),
                    "WEEKLY" => Some(Frequency::Weekly),
                    _ => return None,
                }
            }
            "INTERVAL" => {
                interval = val.parse::<u32>().ok().filter(|n| *n > 0).unwrap_or(1);
            }
            "COUNT" => count = val.parse::<u32>().ok(),
            "UNTIL" => until = parse_until(val, zone),
            other => debug!(part = other, "Ignoring unsupported RRULE part"),
        }
    }

    let termination = match (count, until) {
        (Some(n), _) => Termination::Count(n),
        (None, Some(instant)) => Termination::Until(instant),
        (None, None) => Termination::Unbounded,
    };

    Some(RecurrenceRule {
        frequency: frequency?,
        interval,
        termination,
    })
}

/// UNTIL as UTC, floating or DATE. A DATE includes the whole day.
fn parse_until(value: &str, zone: Tz) -> Option<DateTime<Utc>> {
    if let Some(utc) = value.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| dt.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(resolve_local(naive, zone));
    }
    let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
    let next = date.checked_add_days(Days::new(1))?;
    Some(local_midnight(next, zone) - Duration::seconds(1))
}
