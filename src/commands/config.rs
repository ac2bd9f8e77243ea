use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::{FilePreferences, KNOWN_KEYS, PreferenceStore};

pub fn list() -> Result<()> {
    let prefs = FilePreferences::load()?;

    println!("{}", prefs.path().display().to_string().dimmed());
    for key in KNOWN_KEYS {
        match prefs.get(key) {
            Some(value) => println!("{} = {}", key.bold(), value),
            None => println!("{} = {}", key.bold(), "(not set)".dimmed()),
        }
    }
    for (key, value) in prefs.entries().filter(|(k, _)| !KNOWN_KEYS.contains(k)) {
        println!("{} = {} {}", key, value, "(ignored)".dimmed());
    }

    Ok(())
}

pub fn get(key: &str) -> Result<()> {
    let prefs = FilePreferences::load()?;

    match prefs.get(key) {
        Some(value) => println!("{}", value),
        None => anyhow::bail!("'{}' is not set", key),
    }

    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut prefs = FilePreferences::load()?;
    prefs.set(key, value)?;

    println!("{} {} = {}", "✓".green(), key, value);
    Ok(())
}
