use anyhow::Result;
use chrono::NaiveDate;
use owo_colors::OwoColorize;
use weekcal_core::WeekReport;

use crate::config::{FilePreferences, Settings, SettingsOverrides};
use crate::fetch::HttpFetcher;
use crate::refresh::load_week;
use crate::render::render_week;

pub async fn run(overrides: SettingsOverrides, date: Option<NaiveDate>, json: bool) -> Result<()> {
    let prefs = FilePreferences::load()?;
    let settings = Settings::resolve(&prefs, &overrides)?;
    let today = settings.today();
    let options = settings.view_options(date.unwrap_or(today))?;

    if settings.calendar_url.is_none() {
        eprintln!(
            "{}",
            "No calendar configured. Set one with:\n  weekcal config set calendar_url <url>".dimmed()
        );
    }

    let fetcher = HttpFetcher::new()?;
    let report = match load_week(&fetcher, settings.calendar_url.as_deref(), &options).await {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(error = %e, "Could not load calendar");
            eprintln!("{} {}", "Could not load calendar:".yellow(), e);
            WeekReport::empty(options.anchor)
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_week(&report, settings.zone, today));
    }

    Ok(())
}
