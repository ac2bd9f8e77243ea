use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use weekcal_core::ViewOptions;
use weekcal_core::recurrence::DEFAULT_MAX_ITERATIONS;

use crate::search::SearchEngine;

pub const CALENDAR_URL: &str = "calendar_url";
pub const SEARCH_ENGINE: &str = "search_engine";
pub const TIMEZONE: &str = "timezone";
pub const MAX_ITERATIONS: &str = "max_iterations";

/// Keys accepted by `weekcal config set`.
pub const KNOWN_KEYS: &[&str] = &[CALENDAR_URL, SEARCH_ENGINE, TIMEZONE, MAX_ITERATIONS];

/// Simple string key/value store for user preferences.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Get the config directory path (~/.config/weekcal)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("weekcal");
    Ok(config_dir)
}

/// Get the config file path (~/.config/weekcal/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Reject unknown keys and values that would not resolve later.
fn validate(key: &str, value: &str) -> Result<()> {
    match key {
        CALENDAR_URL => {
            if value.trim().is_empty() {
                anyhow::bail!("calendar_url must not be empty");
            }
        }
        SEARCH_ENGINE => {
            value.parse::<SearchEngine>()?;
        }
        TIMEZONE => {
            parse_zone(value)?;
        }
        MAX_ITERATIONS => {
            parse_max_iterations(value)?;
        }
        _ => anyhow::bail!(
            "Unknown preference '{}'. Known keys: {}",
            key,
            KNOWN_KEYS.join(", ")
        ),
    }
    Ok(())
}

fn parse_zone(value: &str) -> Result<Tz> {
    value
        .parse::<Tz>()
        .map_err(|_| anyhow::anyhow!("Unknown time zone '{}'", value))
}

fn parse_max_iterations(value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .with_context(|| format!("max_iterations must be a positive integer, got '{}'", value))
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

#[cfg(test)]
impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences persisted as a flat TOML table.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// Load from ~/.config/weekcal/config.toml (empty if missing)
    pub fn load() -> Result<Self> {
        Self::load_from(config_path()?)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Invalid preferences file {}", path.display()))?
        } else {
            debug!(path = %path.display(), "No preferences file yet");
            BTreeMap::new()
        };

        Ok(FilePreferences { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Could not write {}", self.path.display()))?;

        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

/// Values given on the command line, taking precedence over stored ones.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub calendar_url: Option<String>,
    pub timezone: Option<String>,
    pub max_iterations: Option<u32>,
    pub search_engine: Option<String>,
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub calendar_url: Option<String>,
    pub zone: Tz,
    pub max_iterations: u32,
    pub search_engine: SearchEngine,
}

impl Settings {
    pub fn resolve(store: &impl PreferenceStore, overrides: &SettingsOverrides) -> Result<Self> {
        let calendar_url = overrides
            .calendar_url
            .clone()
            .or_else(|| store.get(CALENDAR_URL))
            .filter(|url| !url.trim().is_empty());

        let zone = match overrides.timezone.clone().or_else(|| store.get(TIMEZONE)) {
            Some(name) => parse_zone(&name)?,
            None => system_zone(),
        };

        let max_iterations = match overrides.max_iterations {
            Some(n) => n,
            None => store
                .get(MAX_ITERATIONS)
                .map(|v| parse_max_iterations(&v))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_ITERATIONS),
        };

        let search_engine = overrides
            .search_engine
            .clone()
            .or_else(|| store.get(SEARCH_ENGINE))
            .map(|v| v.parse::<SearchEngine>())
            .transpose()?
            .unwrap_or_default();

        Ok(Settings {
            calendar_url,
            zone,
            max_iterations,
            search_engine,
        })
    }

    pub fn view_options(&self, anchor: chrono::NaiveDate) -> Result<ViewOptions> {
        Ok(ViewOptions::new(anchor, self.zone).with_max_iterations(self.max_iterations)?)
    }

    /// Current date in the viewer's zone.
    pub fn today(&self) -> chrono::NaiveDate {
        chrono::Utc::now().with_timezone(&self.zone).date_naive()
    }
}

/// The machine's IANA zone, falling back to UTC.
fn system_zone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or_else(|| {
            debug!("Could not detect system time zone, using UTC");
            Tz::UTC
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_preferences_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut prefs = FilePreferences::load_from(&path).unwrap();
        assert_eq!(prefs.get(CALENDAR_URL), None);
        prefs.set(CALENDAR_URL, "https://example.com/cal.ics").unwrap();
        prefs.set(SEARCH_ENGINE, "duckduckgo").unwrap();

        let reloaded = FilePreferences::load_from(&path).unwrap();
        assert_eq!(
            reloaded.get(CALENDAR_URL).as_deref(),
            Some("https://example.com/cal.ics")
        );
        assert_eq!(reloaded.entries().count(), 2);
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_values() {
        let mut prefs = MemoryPreferences::default();

        assert!(prefs.set("theme", "dark").is_err());
        assert!(prefs.set(TIMEZONE, "Mars/Olympus").is_err());
        assert!(prefs.set(MAX_ITERATIONS, "0").is_err());
        assert!(prefs.set(SEARCH_ENGINE, "altavista").is_err());
        assert!(prefs.set(CALENDAR_URL, "  ").is_err());
        assert_eq!(prefs.get(TIMEZONE), None);
    }

    #[test]
    fn test_resolve_uses_store_values() {
        let mut prefs = MemoryPreferences::default();
        prefs.set(CALENDAR_URL, "https://example.com/a.ics").unwrap();
        prefs.set(TIMEZONE, "Europe/Berlin").unwrap();
        prefs.set(MAX_ITERATIONS, "50").unwrap();
        prefs.set(SEARCH_ENGINE, "bing").unwrap();

        let settings = Settings::resolve(&prefs, &SettingsOverrides::default()).unwrap();

        assert_eq!(settings.calendar_url.as_deref(), Some("https://example.com/a.ics"));
        assert_eq!(settings.zone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.max_iterations, 50);
        assert_eq!(settings.search_engine, SearchEngine::Bing);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut prefs = MemoryPreferences::default();
        prefs.set(CALENDAR_URL, "https://example.com/a.ics").unwrap();
        prefs.set(TIMEZONE, "Europe/Berlin").unwrap();
        let overrides = SettingsOverrides {
            calendar_url: Some("https://example.com/b.ics".into()),
            timezone: Some("America/New_York".into()),
            max_iterations: Some(7),
            search_engine: None,
        };

        let settings = Settings::resolve(&prefs, &overrides).unwrap();

        assert_eq!(settings.calendar_url.as_deref(), Some("https://example.com/b.ics"));
        assert_eq!(settings.zone, chrono_tz::America::New_York);
        assert_eq!(settings.max_iterations, 7);
        assert_eq!(settings.search_engine, SearchEngine::Google);
    }

    #[test]
    fn test_zero_iterations_override_is_rejected_by_view_options() {
        let overrides = SettingsOverrides {
            timezone: Some("UTC".into()),
            max_iterations: Some(0),
            ..Default::default()
        };
        let settings = Settings::resolve(&MemoryPreferences::default(), &overrides).unwrap();

        assert!(settings.view_options(settings.today()).is_err());
    }
}
