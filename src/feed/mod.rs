use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

pub mod model;

pub use model::RawPage;

const ITUNES_BASE: &str = "https://itunes.apple.com/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Timeout,
    HttpStatus(u16),
    Decode,
}

/// A page request that could not be completed. Never retried by the poller.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Source of review pages for a subject. `page` is 1-based.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(
        &self,
        subject: &str,
        page: u32,
        country: &str,
    ) -> Result<RawPage, FetchError>;
}

#[derive(Clone)]
pub struct ItunesFeedClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for ItunesFeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItunesFeedClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ItunesFeedClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(ITUNES_BASE).expect("valid default iTunes URL");
        Self::with_base_url(base_url, timeout)
    }

    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(concat!("review-poller/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, FetchError> {
        let base_url = Url::parse(&cfg.feed.base_url)
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Self::with_base_url(base_url, Duration::from_secs(cfg.feed.request_timeout_secs))
    }

    pub fn page_url(&self, subject: &str, page: u32, country: &str) -> Result<Url, FetchError> {
        let path = format!(
            "{country}/rss/customerreviews/id={subject}/sortBy=mostRecent/page={page}/json"
        );
        self.base_url
            .join(&path)
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait]
impl FeedSource for ItunesFeedClient {
    async fn fetch_page(
        &self,
        subject: &str,
        page: u32,
        country: &str,
    ) -> Result<RawPage, FetchError> {
        let url = self.page_url(subject, page, country)?;
        debug!(%url, "fetching review page");

        let res = self.http.get(url).send().await.map_err(map_reqwest_error)?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = res.bytes().await.map_err(map_reqwest_error)?;
        let parsed: model::FeedResponse = serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        Ok(RawPage::from(parsed))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
