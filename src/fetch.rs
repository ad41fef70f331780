//! Feed transport
//!
//! The importer only needs "GET this URL and give me the body". Keeping that
//! behind [`FeedFetcher`] lets tests and batch jobs swap the network out.

use crate::config::HttpConfig;
use crate::error::Result;
use std::time::Duration;

/// Response of a single feed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub ok: bool,
    pub status: u16,
    pub text: String,
}

impl FetchResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            status: 200,
            text: text.into(),
        }
    }

    pub fn failed(status: u16) -> Self {
        Self {
            ok: false,
            status,
            text: String::new(),
        }
    }
}

/// Fetch capability consumed by the feed readers
pub trait FeedFetcher {
    /// Download `url`. A non-success HTTP status is a normal response with
    /// `ok == false`; only transport failures are errors.
    fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

impl<T: FeedFetcher + ?Sized> FeedFetcher for &T {
    fn fetch(&self, url: &str) -> Result<FetchResponse> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

impl FeedFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self.client.get(url).send()?;
        let status = response.status();

        if !status.is_success() {
            return Ok(FetchResponse::failed(status.as_u16()));
        }

        let text = response.text()?;
        Ok(FetchResponse {
            ok: true,
            status: status.as_u16(),
            text,
        })
    }
}
