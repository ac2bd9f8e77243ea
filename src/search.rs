//! Search-engine preference and query resolution.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchEngine {
    #[default]
    Google,
    DuckDuckGo,
    Bing,
    Ecosia,
}

impl SearchEngine {
    pub const ALL: [SearchEngine; 4] = [
        SearchEngine::Google,
        SearchEngine::DuckDuckGo,
        SearchEngine::Bing,
        SearchEngine::Ecosia,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::DuckDuckGo => "duckduckgo",
            SearchEngine::Bing => "bing",
            SearchEngine::Ecosia => "ecosia",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            SearchEngine::Google => "https://www.google.com/search",
            SearchEngine::DuckDuckGo => "https://duckduckgo.com/",
            SearchEngine::Bing => "https://www.bing.com/search",
            SearchEngine::Ecosia => "https://www.ecosia.org/search",
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SearchEngine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(SearchEngine::Google),
            "duckduckgo" | "ddg" => Ok(SearchEngine::DuckDuckGo),
            "bing" => Ok(SearchEngine::Bing),
            "ecosia" => Ok(SearchEngine::Ecosia),
            other => {
                let known: Vec<_> = SearchEngine::ALL.iter().map(|e| e.name()).collect();
                anyhow::bail!(
                    "Unknown search engine '{}'. Available: {}",
                    other,
                    known.join(", ")
                )
            }
        }
    }
}

/// Turn user input into a URL: navigate to it if it already is one,
/// otherwise search for it.
pub fn resolve_query(input: &str, engine: SearchEngine) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("Nothing to search for");
    }

    if let Ok(url) = Url::parse(input) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(url);
        }
    }

    if looks_like_domain(input) {
        if let Ok(url) = Url::parse(&format!("https://{}", input)) {
            return Ok(url);
        }
    }

    Ok(Url::parse_with_params(engine.endpoint(), &[("q", input)])?)
}

/// `example.com` or `docs.rs/chrono`, but not `3.14` or `what is rust`.
fn looks_like_domain(input: &str) -> bool {
    if input.contains(char::is_whitespace) {
        return false;
    }
    let host = input.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();

    match host.rsplit_once('.') {
        Some((name, tld)) => {
            !name.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}
