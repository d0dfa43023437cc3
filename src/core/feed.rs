//! Read access to the order and reservation lists of the back-office API.

use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use super::config::Settings;
use super::model::{Feed, WatchedList};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{} request returned status {status}", .feed.display_name())]
    Status { feed: Feed, status: u16 },

    #[error("{} response is not valid JSON: {source}", .feed.display_name())]
    Decode {
        feed: Feed,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, feed: Feed) -> Result<WatchedList, FeedError>;
}

/// Fetch both feeds concurrently; the first failure wins.
pub async fn fetch_both<S>(source: &S) -> Result<(WatchedList, WatchedList), FeedError>
where
    S: FeedSource + ?Sized,
{
    tokio::try_join!(source.fetch(Feed::Orders), source.fetch(Feed::Reservations))
}

#[derive(Clone)]
pub struct HttpFeedClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpFeedClient {
    pub fn new(settings: &Settings) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            token: settings.api_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn url_for(&self, feed: Feed) -> String {
        format!("{}{}", self.base_url, feed.path())
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch(&self, feed: Feed) -> Result<WatchedList, FeedError> {
        let mut request = self.http.get(self.url_for(feed));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("{} request was rejected as unauthorized, check the API token", feed.display_name());
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                feed,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let value: Value =
            serde_json::from_slice(&body).map_err(|source| FeedError::Decode { feed, source })?;
        Ok(WatchedList::from_value(value))
    }
}
