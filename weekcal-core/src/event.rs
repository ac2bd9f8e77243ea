//! Calendar data model shared by the pipeline stages.
//!
//! A parsed [`CalendarDocument`] holds [`EventDefinition`]s. Expansion passes
//! non-recurring definitions through and generates an [`Occurrence`] per
//! recurrence instance. The merger tags both as [`CalendarEntry`] and
//! collapses them into [`NormalizedEvent`]s for grouping.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Summary used when an event has no SUMMARY property.
pub const NO_TITLE: &str = "(No title)";

/// The events extracted from one ICS document, in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalendarDocument {
    /// Master definitions; identifiers are unique.
    pub events: Vec<EventDefinition>,
    /// Instance overrides (components carrying a RECURRENCE-ID).
    pub overrides: Vec<EventDefinition>,
}

impl CalendarDocument {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn find(&self, uid: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|e| e.uid == uid)
    }
}

/// A VEVENT as it appears in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    pub uid: String,
    pub summary: String,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    /// Zone whose wall clock recurrence steps follow.
    pub zone: Tz,
    pub rule: Option<RecurrenceRule>,
    /// Start of the generated instance this definition replaces.
    pub recurrence_id: Option<DateTime<Utc>>,
}

impl EventDefinition {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_recurring(&self) -> bool {
        self.rule.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    /// Length of one step in calendar days.
    pub fn days(self) -> u64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
        }
    }
}

/// How a recurrence rule ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Count(u32),
    Until(DateTime<Utc>),
    /// Only the expander's iteration bound stops the rule.
    Unbounded,
}

/// The FREQ/INTERVAL/COUNT/UNTIL subset of an RRULE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub termination: Termination,
}

impl RecurrenceRule {
    /// Calendar days between two consecutive instances.
    pub fn step_days(&self) -> u64 {
        self.frequency.days() * u64::from(self.interval.max(1))
    }
}

/// One concrete instance generated from a recurring definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub summary: String,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    /// Identifier of the originating definition (lookup only).
    pub source_uid: String,
}

/// Output of expansion: a pass-through definition or a generated occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarEntry {
    Single(EventDefinition),
    Occurrence(Occurrence),
}

/// The uniform event shape consumed by grouping and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

impl From<EventDefinition> for NormalizedEvent {
    fn from(def: EventDefinition) -> Self {
        NormalizedEvent {
            summary: def.summary,
            location: def.location,
            start: def.start,
            end: def.end,
            all_day: def.all_day,
        }
    }
}

impl From<Occurrence> for NormalizedEvent {
    fn from(occ: Occurrence) -> Self {
        NormalizedEvent {
            summary: occ.summary,
            location: occ.location,
            start: occ.start,
            end: occ.end,
            all_day: occ.all_day,
        }
    }
}

impl From<CalendarEntry> for NormalizedEvent {
    fn from(entry: CalendarEntry) -> Self {
        match entry {
            CalendarEntry::Single(def) => def.into(),
            CalendarEntry::Occurrence(occ) => occ.into(),
        }
    }
}
