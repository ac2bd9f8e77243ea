use anyhow::{Context, Result};

use crate::config::{FilePreferences, Settings, SettingsOverrides};
use crate::search::resolve_query;

pub fn run(query: &[String], engine: Option<String>, open_browser: bool) -> Result<()> {
    let overrides = SettingsOverrides {
        search_engine: engine,
        ..Default::default()
    };
    let settings = Settings::resolve(&FilePreferences::load()?, &overrides)?;

    let url = resolve_query(&query.join(" "), settings.search_engine)?;
    println!("{}", url);

    if open_browser {
        open::that(url.as_str()).context("Could not open browser")?;
    }

    Ok(())
}
