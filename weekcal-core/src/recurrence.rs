//! Bounded recurrence expansion.
//!
//! Expands each definition of a [`CalendarDocument`] into the instances that
//! fall inside a window. Recurring definitions are stepped on their own wall
//! clock and stop at COUNT, UNTIL, the window end, or the per-definition
//! iteration bound, whichever comes first.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Days, Utc};
use tracing::{debug, warn};

use crate::event::{CalendarDocument, EventDefinition, Occurrence, RecurrenceRule, Termination};
use crate::window::{Window, resolve_local};

/// Iteration bound used when the caller does not pick one.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// Result of expanding a document over a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Non-recurring definitions starting inside the window.
    pub singles: Vec<EventDefinition>,
    /// Generated instances, grouped by definition and ordered within each.
    pub occurrences: Vec<Occurrence>,
    /// Identifiers whose expansion stopped at the iteration bound.
    pub truncated: Vec<String>,
}

impl Expansion {
    pub fn is_truncated(&self) -> bool {
        !self.truncated.is_empty()
    }
}

/// Expand every definition in `document` over `window`.
///
/// `max_iterations` bounds the candidates generated per recurring definition,
/// including candidates before the window start; values below 1 count as 1.
/// Hitting the bound is recorded in [`Expansion::truncated`], never an error.
pub fn expand(document: &CalendarDocument, window: Window, max_iterations: u32) -> Expansion {
    let max_iterations = max_iterations.max(1);
    let overrides = overrides_by_uid(document);
    let mut expansion = Expansion::default();

    for def in &document.events {
        let Some(rule) = &def.rule else {
            if window.contains(def.start) {
                expansion.singles.push(def.clone());
            }
            continue;
        };

        let replaced: HashSet<DateTime<Utc>> = overrides
            .get(def.uid.as_str())
            .map(|list| list.iter().filter_map(|o| o.recurrence_id).collect())
            .unwrap_or_default();

        let mut instances = Vec::new();
        let truncated = expand_rule(def, rule, window, max_iterations, &replaced, &mut instances);
        if truncated {
            warn!(
                uid = %def.uid,
                max_iterations,
                "Recurrence expansion stopped at iteration limit"
            );
            expansion.truncated.push(def.uid.clone());
        }

        for replacement in overrides.get(def.uid.as_str()).into_iter().flatten() {
            if window.contains(replacement.start) {
                instances.push(occurrence_of(replacement, &def.uid));
            }
        }

        // A moved instance may land anywhere in the series.
        instances.sort_by_key(|o| o.start);
        expansion.occurrences.extend(instances);
    }

    expansion
}

fn overrides_by_uid(document: &CalendarDocument) -> HashMap<&str, Vec<&EventDefinition>> {
    let mut map: HashMap<&str, Vec<&EventDefinition>> = HashMap::new();
    for o in &document.overrides {
        match document.find(&o.uid) {
            Some(master) if master.is_recurring() => {
                map.entry(o.uid.as_str()).or_default().push(o);
            }
            _ => debug!(uid = %o.uid, "Ignoring override of non-recurring event"),
        }
    }
    map
}

/// Generate the instances of one recurring definition into `out`.
///
/// Returns true when the iteration bound cut the rule short.
fn expand_rule(
    def: &EventDefinition,
    rule: &RecurrenceRule,
    window: Window,
    max_iterations: u32,
    replaced: &HashSet<DateTime<Utc>>,
    out: &mut Vec<Occurrence>,
) -> bool {
    let wall_start = def.start.with_timezone(&def.zone).naive_local();
    let duration = def.duration();
    let step = rule.step_days();
    let mut generated: u32 = 0;

    loop {
        if let Termination::Count(limit) = rule.termination {
            if generated >= limit {
                return false;
            }
        }

        let candidate = if generated == 0 {
            def.start
        } else {
            let offset = Days::new(step.saturating_mul(u64::from(generated)));
            match wall_start.checked_add_days(offset) {
                Some(wall) => resolve_local(wall, def.zone),
                None => return false,
            }
        };

        if let Termination::Until(until) = rule.termination {
            if candidate > until {
                return false;
            }
        }
        if candidate >= window.end {
            return false;
        }
        if generated >= max_iterations {
            return true;
        }
        generated += 1;

        if candidate < window.start || replaced.contains(&candidate) {
            continue;
        }

        out.push(Occurrence {
            summary: def.summary.clone(),
            location: def.location.clone(),
            start: candidate,
            end: candidate + duration,
            all_day: def.all_day,
            source_uid: def.uid.clone(),
        });
    }
}

fn occurrence_of(def: &EventDefinition, source_uid: &str) -> Occurrence {
    Occurrence {
        summary: def.summary.clone(),
        location: def.location.clone(),
        start: def.start,
        end: def.end,
        all_day: def.all_day,
        source_uid: source_uid.to_string(),
    }
}
