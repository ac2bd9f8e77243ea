//! Fetch-and-build for one request, and the guard that keeps a slow
//! response from overwriting a newer one.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};
use weekcal_core::{ViewOptions, WeekReport, WeekcalError, build_week};

use crate::fetch::{FetchError, FetchText};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] WeekcalError),
}

/// Fetch the calendar at `url` and build its week.
///
/// Without a URL there is no document, which yields an empty week.
pub async fn load_week<F: FetchText>(
    fetcher: &F,
    url: Option<&str>,
    options: &ViewOptions,
) -> Result<WeekReport, LoadError> {
    let text = match url {
        Some(url) => Some(fetcher.fetch_text(url).await?),
        None => None,
    };
    Ok(build_week(text.as_deref(), options)?)
}

/// Collapse a failed load into an empty week.
pub fn or_empty(result: Result<WeekReport, LoadError>, anchor: NaiveDate) -> WeekReport {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "Could not load calendar, showing empty week");
        WeekReport::empty(anchor)
    })
}

/// Sequence number attached to a request when it is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

/// Issues strictly increasing request tickets.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: AtomicU64,
}

impl RequestSequencer {
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}

/// The week currently on screen; only the newest request may replace it.
#[derive(Debug, Default)]
pub struct ViewState {
    sequencer: RequestSequencer,
    current: Option<WeekReport>,
}

impl ViewState {
    /// Start a new request, superseding any still in flight.
    pub fn begin(&self) -> RequestTicket {
        self.sequencer.issue()
    }

    /// Store `report` if `ticket` is the latest issued. Returns whether it was stored.
    pub fn apply(&mut self, ticket: RequestTicket, report: WeekReport) -> bool {
        if !self.sequencer.is_latest(ticket) {
            debug!(?ticket, "Discarding stale calendar result");
            return false;
        }
        self.current = Some(report);
        true
    }

    pub fn current(&self) -> Option<&WeekReport> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use std::collections::HashMap;

    struct FakeFetcher {
        responses: HashMap<String, String>,
    }

    impl FetchText for FakeFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))
        }
    }

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn options() -> ViewOptions {
        ViewOptions::new(anchor(), Tz::UTC)
    }

    fn fetcher() -> FakeFetcher {
        let calendar = "BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:TEST\n\
BEGIN:VEVENT\nUID:a\nSUMMARY:Standup\nDTSTART:20240102T090000Z\nEND:VEVENT\n\
END:VCALENDAR\n";
        FakeFetcher {
            responses: HashMap::from([
                ("good".to_string(), calendar.to_string()),
                ("broken".to_string(), "BEGIN:VCALENDAR\n".to_string()),
            ]),
        }
    }

    #[tokio::test]
    async fn test_load_week_builds_view() {
        let report = load_week(&fetcher(), Some("good"), &options()).await.unwrap();

        assert_eq!(report.view.event_count(), 1);
    }

    #[tokio::test]
    async fn test_no_url_is_empty_week() {
        let report = load_week(&fetcher(), None, &options()).await.unwrap();

        assert!(report.view.is_empty());
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty_week() {
        let fetch_failure = load_week(&fetcher(), Some("missing"), &options()).await;
        assert!(matches!(fetch_failure, Err(LoadError::Fetch(_))));
        assert!(or_empty(fetch_failure, anchor()).view.is_empty());

        let parse_failure = load_week(&fetcher(), Some("broken"), &options()).await;
        assert!(matches!(parse_failure, Err(LoadError::Parse(_))));
        let report = or_empty(parse_failure, anchor());
        assert_eq!(report.view.days.len(), 7);
        assert!(report.view.is_empty());
    }

    #[test]
    fn test_tickets_increase() {
        let sequencer = RequestSequencer::default();

        let first = sequencer.issue();
        let second = sequencer.issue();

        assert!(first < second);
        assert!(!sequencer.is_latest(first));
        assert!(sequencer.is_latest(second));
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut state = ViewState::default();
        let mut old_view = WeekReport::empty(anchor());
        old_view.truncated.push("old".to_string());
        let new_view = WeekReport::empty(anchor());

        let old_ticket = state.begin();
        let new_ticket = state.begin();

        // The newer request finishes first, the older one afterwards.
        assert!(state.apply(new_ticket, new_view.clone()));
        assert!(!state.apply(old_ticket, old_view));
        assert_eq!(state.current(), Some(&new_view));
    }

    #[test]
    fn test_result_before_newer_request_is_discarded() {
        let mut state = ViewState::default();

        let first = state.begin();
        let _second = state.begin();

        assert!(!state.apply(first, WeekReport::empty(anchor())));
        assert_eq!(state.current(), None);
    }
}
