//! End-to-end week computation: parse, expand, merge, group.
//!
//! Everything here is synchronous and free of I/O. Callers fetch the ICS
//! text themselves and hand it in, or pass `None` when no document is
//! available.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::error::{WeekcalError, WeekcalResult};
use crate::event::CalendarDocument;
use crate::ics::parse_in;
use crate::normalize::normalize_and_merge;
use crate::recurrence::{DEFAULT_MAX_ITERATIONS, expand};
use crate::week::{WeekView, group_by_day};
use crate::window::Window;

/// Explicit inputs for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// First day of the view ("today").
    pub anchor: NaiveDate,
    /// Zone that decides which local day an event falls on.
    pub zone: Tz,
    /// Per-definition bound on recurrence candidates.
    pub max_iterations: u32,
}

impl ViewOptions {
    pub fn new(anchor: NaiveDate, zone: Tz) -> Self {
        ViewOptions {
            anchor,
            zone,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> WeekcalResult<Self> {
        if max_iterations == 0 {
            return Err(WeekcalError::Config(
                "max_iterations must be a positive integer".into(),
            ));
        }
        self.max_iterations = max_iterations;
        Ok(self)
    }

    /// The expansion window covering the seven days of the view.
    pub fn window(&self) -> Window {
        Window::week_of(self.anchor, self.zone)
    }
}

/// A week view plus the diagnostics gathered while building it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekReport {
    pub view: WeekView,
    /// Definitions whose occurrences were cut off by the iteration bound.
    pub truncated: Vec<String>,
}

impl WeekReport {
    pub fn empty(anchor: NaiveDate) -> Self {
        WeekReport {
            view: WeekView::empty(anchor),
            truncated: Vec::new(),
        }
    }

    pub fn is_truncated(&self) -> bool {
        !self.truncated.is_empty()
    }
}

/// Build the week for `document_text`.
///
/// `None` means no document is available and yields seven empty days. Only
/// parsing can fail; a malformed document produces no partial view.
pub fn build_week(document_text: Option<&str>, options: &ViewOptions) -> WeekcalResult<WeekReport> {
    let Some(text) = document_text else {
        return Ok(WeekReport::empty(options.anchor));
    };

    let document = parse_in(text, options.zone)?;
    if document.is_empty() {
        debug!("Calendar contains no events");
    }
    Ok(build_week_from_document(&document, options))
}

/// The infallible part of the pipeline, for an already parsed document.
pub fn build_week_from_document(document: &CalendarDocument, options: &ViewOptions) -> WeekReport {
    let expansion = expand(document, options.window(), options.max_iterations);
    debug!(
        singles = expansion.singles.len(),
        occurrences = expansion.occurrences.len(),
        truncated = expansion.truncated.len(),
        "Expanded calendar"
    );

    let truncated = expansion.truncated;
    let events = normalize_and_merge(expansion.singles, expansion.occurrences);

    WeekReport {
        view: group_by_day(events, options.anchor, options.zone),
        truncated,
    }
}
