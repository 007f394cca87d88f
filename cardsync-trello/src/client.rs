//! Throttled Trello REST client

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Trello REST client authenticated with a key and token
///
/// Every request waits until at least `throttle` has passed since the
/// previous one.
pub struct TrelloClient {
    http: reqwest::Client,
    base: Url,
    key: String,
    token: String,
    throttle: Duration,
    max_text_length: usize,
    last_request: Mutex<Option<Instant>>,
}

impl TrelloClient {
    /// Create a client against `api_url` (e.g. `https://api.trello.com/1`)
    pub fn new(
        api_url: &str,
        key: impl Into<String>,
        token: impl Into<String>,
        throttle: Duration,
        max_text_length: usize,
    ) -> Result<Self> {
        let key = key.into();
        let token = token.into();
        if key.trim().is_empty() || token.trim().is_empty() {
            return Err(Error::Auth(
                "Trello key and token are required. Set TRELLO_KEY and TRELLO_TOKEN \
                 or add them to ~/.config/cardsync/secrets.toml"
                    .to_string(),
            ));
        }

        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(concat!("cardsync/", env!("CARGO_PKG_VERSION")))
                .build()?,
            base: base_url(api_url)?,
            key,
            token,
            throttle,
            max_text_length,
            last_request: Mutex::new(None),
        })
    }

    /// Longest description or comment text accepted
    pub fn max_text_length(&self) -> usize {
        self.max_text_length
    }

    /// Reject text longer than the configured limit before sending it
    pub fn check_text(&self, text: &str) -> Result<()> {
        let length = text.chars().count();
        if length > self.max_text_length {
            return Err(Error::PayloadTooLarge {
                length,
                limit: self.max_text_length,
            });
        }
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let body = self.send(Method::GET, path, query, None::<&()>, 0).await?;
        parse(path, &body)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        text_length: usize,
    ) -> Result<T> {
        let body = self.send(Method::POST, path, &[], Some(body), text_length).await?;
        parse(path, &body)
    }

    pub async fn put<B: Serialize>(&self, path: &str, body: &B, text_length: usize) -> Result<()> {
        self.send(Method::PUT, path, &[], Some(body), text_length)
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, &[], None::<&()>, 0)
            .await
            .map(|_| ())
    }

    /// Send one request and return the response body
    ///
    /// `text_length` is the size of the largest text field in `body`, used
    /// to report a payload error when the server rejects the request size.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        text_length: usize,
    ) -> Result<String> {
        let url = self.url(path, query)?;
        self.wait_turn().await;

        debug!(%method, path, "Trello request");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;
        match status {
            s if s.is_success() => Ok(text),
            StatusCode::PAYLOAD_TOO_LARGE | StatusCode::URI_TOO_LONG => Err(Error::PayloadTooLarge {
                length: text_length,
                limit: self.max_text_length,
            }),
            StatusCode::UNAUTHORIZED => Err(Error::Auth(text)),
            _ => Err(Error::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body: text,
            }),
        }
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", path, e)))?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().copied())
            .append_pair("key", &self.key)
            .append_pair("token", &self.token);
        Ok(url)
    }

    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.throttle {
                sleep(self.throttle - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl std::fmt::Debug for TrelloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloClient")
            .field("base", &self.base.as_str())
            .field("throttle", &self.throttle)
            .field("max_text_length", &self.max_text_length)
            .finish_non_exhaustive()
    }
}

/// Base URL with a trailing slash so relative paths join under it
fn base_url(api_url: &str) -> Result<Url> {
    let mut url = Url::parse(api_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", api_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidUrl(api_url.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::Parse(format!("{}: {}", path, e)))
}
