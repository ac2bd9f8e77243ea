//! ICS parsing using the icalendar crate's parser.

use std::collections::HashSet;

use chrono::{DateTime, Days, Duration, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::{debug, warn};

use super::rrule::parse_rrule;
use crate::error::{WeekcalError, WeekcalResult};
use crate::event::{CalendarDocument, EventDefinition, NO_TITLE};
use crate::window::{local_midnight, resolve_local};

/// Parse ICS text, reading floating and all-day values as UTC.
pub fn parse(content: &str) -> WeekcalResult<CalendarDocument> {
    parse_in(content, Tz::UTC)
}

/// Parse ICS text, reading floating and all-day values in `zone`.
///
/// Fails when BEGIN/END delimiters are unbalanced, when there is no
/// VCALENDAR, or when an event lacks a usable DTSTART.
pub fn parse_in(content: &str, zone: Tz) -> WeekcalResult<CalendarDocument> {
    let unfolded = unfold(content.trim_start_matches('\u{feff}'));
    check_delimiters(&unfolded)?;

    let calendar = read_calendar(&unfolded)
        .map_err(|e| WeekcalError::MalformedDocument(e.to_string()))?;

    let mut vevents = Vec::new();
    collect_events(&calendar.components, &mut vevents);

    let mut document = CalendarDocument::default();
    let mut seen = HashSet::new();

    for (index, vevent) in vevents.into_iter().enumerate() {
        let event = read_event(vevent, index, zone)?;

        if event.recurrence_id.is_some() {
            document.overrides.push(event);
        } else if seen.insert(event.uid.clone()) {
            document.events.push(event);
        } else {
            warn!(uid = %event.uid, "Dropping event with duplicate UID");
        }
    }

    // Overrides without a master are shown as ordinary events.
    let (orphans, overrides): (Vec<_>, Vec<_>) = std::mem::take(&mut document.overrides)
        .into_iter()
        .partition(|o| !seen.contains(&o.uid));
    document.overrides = overrides;
    for mut orphan in orphans {
        if seen.insert(orphan.uid.clone()) {
            debug!(uid = %orphan.uid, "RECURRENCE-ID without master event");
            orphan.recurrence_id = None;
            document.events.push(orphan);
        }
    }

    Ok(document)
}

/// Verify that every BEGIN has a matching END and that content lives in a VCALENDAR.
fn check_delimiters(unfolded: &str) -> WeekcalResult<()> {
    let mut open: Vec<String> = Vec::new();
    let mut saw_calendar = false;

    for (n, line) in unfolded.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let line_no = n + 1;

        if let Some(name) = strip_prefix_ci(line, "BEGIN:") {
            let name = name.trim().to_ascii_uppercase();
            if open.is_empty() {
                if name != "VCALENDAR" {
                    return Err(malformed(format!(
                        "line {line_no}: BEGIN:{name} outside of VCALENDAR"
                    )));
                }
                saw_calendar = true;
            }
            open.push(name);
        } else if let Some(name) = strip_prefix_ci(line, "END:") {
            let name = name.trim().to_ascii_uppercase();
            match open.pop() {
                Some(expected) if expected == name => {}
                Some(expected) => {
                    return Err(malformed(format!(
                        "line {line_no}: END:{name} does not close BEGIN:{expected}"
                    )));
                }
                None => {
                    return Err(malformed(format!(
                        "line {line_no}: END:{name} without matching BEGIN"
                    )));
                }
            }
        } else if open.is_empty() {
            return Err(malformed(format!(
                "line {line_no}: property outside of VCALENDAR"
            )));
        }
    }

    if let Some(name) = open.last() {
        return Err(malformed(format!("BEGIN:{name} is never closed")));
    }
    if !saw_calendar {
        return Err(malformed("missing BEGIN:VCALENDAR".to_string()));
    }

    Ok(())
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

fn malformed(message: String) -> WeekcalError {
    WeekcalError::MalformedDocument(message)
}

/// Depth-first collection of VEVENT components, in document order.
fn collect_events<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_events(&component.components, out);
        }
    }
}

/// A resolved DTSTART/DTEND value.
struct Instant {
    at: DateTime<Utc>,
    all_day: bool,
    zone: Tz,
}

fn read_event(vevent: &Component, index: usize, zone: Tz) -> WeekcalResult<EventDefinition> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.as_ref().trim().to_string())
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| format!("event-{}", index + 1));

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let location = vevent
        .find_prop("LOCATION")
        .map(|p| p.val.to_string())
        .filter(|s| !s.trim().is_empty());

    let dtstart = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| malformed(format!("event '{uid}' has no DTSTART")))?;
    let start = read_instant(dtstart, zone).ok_or_else(|| {
        malformed(format!(
            "event '{uid}' has an invalid DTSTART '{}'",
            dtstart.val.as_ref()
        ))
    })?;

    let end = read_end(vevent, &start, zone, &uid);

    let rule = vevent.find_prop("RRULE").and_then(|p| {
        let rule = parse_rrule(p.val.as_ref(), start.zone);
        if rule.is_none() {
            warn!(
                uid = %uid,
                rrule = %p.val.as_ref(),
                "Unsupported RRULE, treating event as single"
            );
        }
        rule
    });

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| read_instant(p, zone))
        .map(|i| i.at);

    Ok(EventDefinition {
        uid,
        summary,
        location,
        start: start.at,
        end,
        all_day: start.all_day,
        zone: start.zone,
        rule,
        recurrence_id,
    })
}

/// DTEND, else DTSTART + DURATION, else the RFC 5545 default.
fn read_end(vevent: &Component, start: &Instant, zone: Tz, uid: &str) -> DateTime<Utc> {
    let explicit = vevent
        .find_prop("DTEND")
        .and_then(|p| read_instant(p, zone))
        .map(|i| i.at)
        .or_else(|| {
            vevent
                .find_prop("DURATION")
                .and_then(|p| parse_duration(p.val.as_ref()))
                .map(|d| start.at + d)
        });

    match explicit {
        Some(end) if end >= start.at => end,
        Some(_) => {
            debug!(uid = %uid, "Event ends before it starts, using zero duration");
            start.at
        }
        None if start.all_day => {
            let date = start.at.with_timezone(&start.zone).date_naive();
            date.checked_add_days(Days::new(1))
                .map(|next| local_midnight(next, start.zone))
                .unwrap_or(start.at)
        }
        None => start.at,
    }
}

/// Convert a date or date-time property to an instant, keeping its zone.
fn read_instant(prop: &Property, default_zone: Tz) -> Option<Instant> {
    let instant = match DatePerhapsTime::try_from(prop).ok()? {
        DatePerhapsTime::Date(date) => Instant {
            at: local_midnight(date, default_zone),
            all_day: true,
            zone: default_zone,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Instant {
            at: dt,
            all_day: false,
            zone: Tz::UTC,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Instant {
            at: resolve_local(naive, default_zone),
            all_day: false,
            zone: default_zone,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let zone = tzid.parse::<Tz>().unwrap_or_else(|_| {
                debug!(tzid = %tzid, "Unknown TZID, using default zone");
                default_zone
            });
            Instant {
                at: resolve_local(date_time, zone),
                all_day: false,
                zone,
            }
        }
    };
    Some(instant)
}

/// Parse an ISO 8601 duration such as `PT1H30M` or `P1D`.
fn parse_duration(value: &str) -> Option<Duration> {
    let negative = value.starts_with('-');
    let value = value.trim_start_matches(['-', '+']);
    let std_duration: std::time::Duration = iso8601::duration(value).ok()?.into();
    let duration = Duration::from_std(std_duration).ok()?;
    Some(if negative { -duration } else { duration })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Frequency, Termination};
    use chrono::TimeZone;

    fn wrap(body: &str) -> String {
        format!("BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:TEST\n{body}\nEND:VCALENDAR\n")
    }

    #[test]
    fn test_parse_single_event() {
        let ics = wrap(
            "BEGIN:VEVENT
UID:standup-1
SUMMARY:Standup
LOCATION:Room 4\\, second floor
DTSTART:20240102T090000Z
DTEND:20240102T091500Z
END:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        assert_eq!(doc.events.len(), 1);
        let event = &doc.events[0];
        assert_eq!(event.uid, "standup-1");
        assert_eq!(event.summary, "Standup");
        assert_eq!(event.location.as_deref(), Some("Room 4, second floor"));
        assert_eq!(event.start, Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap());
        assert!(!event.all_day);
        assert!(event.rule.is_none());
    }

    #[test]
    fn test_parse_line_folding_and_escapes() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:test-123\r\n\
SUMMARY:Planning\\; budget \r\n review\\, Q1\r\n\
DTSTART:20240101T100000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let doc = parse(ics).expect("Should parse");

        assert_eq!(doc.events[0].summary, "Planning; budget review, Q1");
    }

    #[test]
    fn test_escaped_backslash_is_decoded_once() {
        let ics = wrap(
            r"BEGIN:VEVENT
UID:a
SUMMARY:a\\nb\, c
LOCATION:Room\\N4\, east wing
DTSTART:20240101T100000Z
END:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        assert_eq!(doc.events[0].summary, r"a\nb, c");
        assert_eq!(doc.events[0].location.as_deref(), Some(r"Room\N4, east wing"));
    }

    #[test]
    fn test_missing_summary_uses_placeholder() {
        let ics = wrap("BEGIN:VEVENT\nUID:a\nDTSTART:20240101T100000Z\nEND:VEVENT");

        let doc = parse(&ics).expect("Should parse");

        assert_eq!(doc.events[0].summary, NO_TITLE);
        assert_eq!(doc.events[0].end, doc.events[0].start);
    }

    #[test]
    fn test_missing_uid_is_synthesized() {
        let ics = wrap(
            "BEGIN:VEVENT\nSUMMARY:One\nDTSTART:20240101T100000Z\nEND:VEVENT\n\
BEGIN:VEVENT\nSUMMARY:Two\nDTSTART:20240101T110000Z\nEND:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        let uids: Vec<_> = doc.events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["event-1", "event-2"]);
    }

    #[test]
    fn test_missing_dtstart_is_malformed() {
        let ics = wrap("BEGIN:VEVENT\nUID:a\nSUMMARY:No start\nEND:VEVENT");

        let err = parse(&ics).unwrap_err();

        assert!(matches!(err, WeekcalError::MalformedDocument(msg) if msg.contains("DTSTART")));
    }

    #[test]
    fn test_unclosed_component_is_malformed() {
        let ics = "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:a\nDTSTART:20240101T100000Z\nEND:VCALENDAR\n";

        assert!(matches!(parse(ics), Err(WeekcalError::MalformedDocument(_))));
    }

    #[test]
    fn test_empty_text_is_malformed() {
        assert!(matches!(parse(""), Err(WeekcalError::MalformedDocument(_))));
        assert!(matches!(
            parse("not a calendar"),
            Err(WeekcalError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_calendar_without_events_is_empty() {
        let doc = parse(&wrap("X-WR-CALNAME:Work")).expect("Should parse");

        assert!(doc.is_empty());
    }

    #[test]
    fn test_tzid_is_resolved() {
        let ics = wrap(
            "BEGIN:VEVENT
UID:berlin
DTSTART;TZID=Europe/Berlin:20240102T090000
DTEND;TZID=Europe/Berlin:20240102T100000
END:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        let event = &doc.events[0];
        assert_eq!(event.start, Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap());
        assert_eq!(event.zone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_floating_time_uses_default_zone() {
        let ics = wrap("BEGIN:VEVENT\nUID:f\nDTSTART:20240102T090000\nEND:VEVENT");

        let doc = parse_in(&ics, chrono_tz::America::New_York).expect("Should parse");

        assert_eq!(
            doc.events[0].start,
            Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_all_day_event_defaults_to_one_day() {
        let ics = wrap("BEGIN:VEVENT\nUID:d\nDTSTART;VALUE=DATE:20240103\nEND:VEVENT");

        let doc = parse(&ics).expect("Should parse");

        let event = &doc.events[0];
        assert!(event.all_day);
        assert_eq!(event.start, Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_duration_property_sets_end() {
        let ics = wrap("BEGIN:VEVENT\nUID:d\nDTSTART:20240103T100000Z\nDURATION:PT1H30M\nEND:VEVENT");

        let doc = parse(&ics).expect("Should parse");

        assert_eq!(
            doc.events[0].end,
            Utc.with_ymd_and_hms(2024, 1, 3, 11, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_rrule_is_parsed_and_byday_ignored() {
        let ics = wrap(
            "BEGIN:VEVENT
UID:weekly
DTSTART:20240101T100000Z
RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO;COUNT=4
END:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        let rule = doc.events[0].rule.expect("Should have rule");
        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.interval, 2);
        assert_eq!(rule.termination, Termination::Count(4));
    }

    #[test]
    fn test_unsupported_frequency_becomes_single_event() {
        let ics = wrap(
            "BEGIN:VEVENT\nUID:m\nDTSTART:20240101T100000Z\nRRULE:FREQ=MONTHLY\nEND:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        assert!(doc.events[0].rule.is_none());
    }

    #[test]
    fn test_duplicate_uid_keeps_first() {
        let ics = wrap(
            "BEGIN:VEVENT\nUID:dup\nSUMMARY:First\nDTSTART:20240101T100000Z\nEND:VEVENT\n\
BEGIN:VEVENT\nUID:dup\nSUMMARY:Second\nDTSTART:20240102T100000Z\nEND:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        assert_eq!(doc.events.len(), 1);
        assert_eq!(doc.events[0].summary, "First");
    }

    #[test]
    fn test_recurrence_id_becomes_override() {
        let ics = wrap(
            "BEGIN:VEVENT
UID:series
SUMMARY:Sync
DTSTART:20240101T100000Z
RRULE:FREQ=DAILY
END:VEVENT
BEGIN:VEVENT
UID:series
SUMMARY:Sync (moved)
RECURRENCE-ID:20240102T100000Z
DTSTART:20240102T150000Z
END:VEVENT",
        );

        let doc = parse(&ics).expect("Should parse");

        assert_eq!(doc.events.len(), 1);
        assert_eq!(doc.overrides.len(), 1);
        assert_eq!(
            doc.overrides[0].recurrence_id,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap())
        );
    }
}
