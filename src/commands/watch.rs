use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};
use weekcal_core::WeekReport;

use crate::config::{self, FilePreferences, Settings, SettingsOverrides};
use crate::fetch::HttpFetcher;
use crate::refresh::{RequestTicket, ViewState, load_week, or_empty};
use crate::render::render_week;

/// Re-fetch on every tick, re-reading preferences so a changed calendar URL
/// is picked up. Results of superseded requests are dropped.
pub async fn run(interval: Duration, overrides: SettingsOverrides) -> Result<()> {
    let path = config::config_path()?;
    let fetcher = Arc::new(HttpFetcher::new()?);
    let (tx, mut rx) = mpsc::channel::<(RequestTicket, WeekReport)>(8);
    let mut state = ViewState::default();
    let mut ticker = tokio::time::interval(interval);
    let mut settings: Option<Settings> = None;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let latest = reload(settings.as_ref(), load_settings(&path, &overrides))?;
                if settings.as_ref().map(|s| &s.calendar_url) != Some(&latest.calendar_url) {
                    info!(url = ?latest.calendar_url, "Calendar source changed");
                }
                let options = latest.view_options(latest.today())?;
                let url = latest.calendar_url.clone();
                settings = Some(latest);

                let ticket = state.begin();
                let fetcher = Arc::clone(&fetcher);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = load_week(fetcher.as_ref(), url.as_deref(), &options).await;
                    let _ = tx.send((ticket, or_empty(result, options.anchor))).await;
                });
            }
            Some((ticket, report)) = rx.recv() => {
                if state.apply(ticket, report) {
                    if let (Some(settings), Some(report)) = (&settings, state.current()) {
                        // Clear screen and move the cursor home before redrawing
                        print!("\x1B[2J\x1B[H");
                        println!("{}", render_week(report, settings.zone, settings.today()));
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Stopping watch");
                return Ok(());
            }
        }
    }
}

fn load_settings(path: &Path, overrides: &SettingsOverrides) -> Result<Settings> {
    Settings::resolve(&FilePreferences::load_from(path)?, overrides)
}

/// Pick the settings for the next refresh.
///
/// A preferences file that fails to load keeps the previous settings, so a
/// half-saved edit does not stop the loop. Without previous settings the
/// error is returned.
fn reload(previous: Option<&Settings>, loaded: Result<Settings>) -> Result<Settings> {
    match (loaded, previous) {
        (Ok(settings), _) => Ok(settings),
        (Err(e), Some(previous)) => {
            warn!(error = %e, "Could not reload preferences, keeping previous settings");
            Ok(previous.clone())
        }
        (Err(e), None) => Err(e),
    }
}
