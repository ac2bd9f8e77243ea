//! Fetching raw ICS text from a calendar URL.
//!
//! One request per call, no retries. `webcal://` subscriptions are fetched
//! over HTTPS; `file://` URLs and plain paths are read from disk.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid calendar URL '{0}'")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("Could not read calendar file: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can turn a calendar location into ICS text.
pub trait FetchText {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Where a calendar location points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Http(Url),
    File(PathBuf),
}

impl Source {
    pub fn parse(location: &str) -> Result<Self, FetchError> {
        let location = location.trim();
        let invalid = || FetchError::InvalidUrl(location.to_string());

        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Ok(Source::File(PathBuf::from(location)));
            }
            Err(_) => return Err(invalid()),
        };

        match url.scheme() {
            "http" | "https" => Ok(Source::Http(url)),
            // url refuses to switch a non-special scheme to https in place
            "webcal" | "webcals" => {
                let rest = &url.as_str()[url.scheme().len()..];
                Url::parse(&format!("https{rest}"))
                    .map(Source::Http)
                    .map_err(|_| invalid())
            }
            "file" => url.to_file_path().map(Source::File).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

/// Fetches over HTTP(S) with reqwest, or from the local filesystem.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("weekcal/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl FetchText for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        match Source::parse(url)? {
            Source::Http(url) => {
                info!(url = %url, "Fetching calendar");
                let response = self.client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(FetchError::Status(response.status()));
                }
                Ok(response.text().await?)
            }
            Source::File(path) => {
                info!(path = %path.display(), "Reading calendar file");
                Ok(tokio::fs::read_to_string(path).await?)
            }
        }
    }
}
