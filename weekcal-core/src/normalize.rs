//! Merge pass-through events and occurrences into one sorted sequence.

use crate::event::{CalendarEntry, EventDefinition, NormalizedEvent, Occurrence};

/// Normalize both sources and sort them by start.
///
/// The sort is stable: on equal starts, non-recurring events stay ahead of
/// occurrences, and each source keeps its own order.
pub fn normalize_and_merge(
    singles: impl IntoIterator<Item = EventDefinition>,
    occurrences: impl IntoIterator<Item = Occurrence>,
) -> Vec<NormalizedEvent> {
    let entries = singles
        .into_iter()
        .map(CalendarEntry::Single)
        .chain(occurrences.into_iter().map(CalendarEntry::Occurrence));

    merge_entries(entries)
}

/// Normalize already-tagged entries, keeping insertion order on ties.
pub fn merge_entries(entries: impl IntoIterator<Item = CalendarEntry>) -> Vec<NormalizedEvent> {
    let mut merged: Vec<NormalizedEvent> = entries.into_iter().map(NormalizedEvent::from).collect();
    merged.sort_by_key(|event| event.start);
    merged
}
