//! Manifest download.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

/// The manifest could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("failed to fetch '{url}': {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("fetching '{url}' failed with HTTP {status}{body_snippet}")]
  HttpStatus {
    url: String,
    status: reqwest::StatusCode,
    body_snippet: String,
  },

  #[error("failed to read response body from '{url}': {source}")]
  Body {
    url: String,
    #[source]
    source: reqwest::Error,
  },
}

/// Downloads manifest bodies over HTTP.
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
  client: reqwest::Client,
}

impl ManifestFetcher {
  /// Create a fetcher whose requests give up after `timeout`.
  pub fn new(timeout: Duration) -> Result<Self, FetchError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("vercheck/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(FetchError::Client)?;
    Ok(Self { client })
  }

  /// GET `url` and return the raw body.
  ///
  /// Any non-2xx status is an error. No retries: a failed fetch is retried by
  /// the next scheduled check.
  pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
    debug!(url = %url, "fetching manifest");

    let response = self.client.get(url).send().await.map_err(|source| FetchError::Request {
      url: url.to_string(),
      source,
    })?;

    let status = response.status();
    info!(status = status.as_u16(), "request status");

    if !status.is_success() {
      let body_snippet = response
        .text()
        .await
        .ok()
        .map(|body| response_snippet(&body, 160))
        .unwrap_or_default();
      return Err(FetchError::HttpStatus {
        url: url.to_string(),
        status,
        body_snippet,
      });
    }

    let bytes = response.bytes().await.map_err(|source| FetchError::Body {
      url: url.to_string(),
      source,
    })?;

    Ok(bytes.to_vec())
  }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
  let snippet: String = body.chars().take(max_chars).collect();
  if snippet.is_empty() {
    String::new()
  } else {
    format!(": {snippet}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fetcher() -> ManifestFetcher {
    ManifestFetcher::new(Duration::from_secs(5)).unwrap()
  }

  #[tokio::test]
  async fn fetch_returns_body_on_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/versions/client.json")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"linux":{"x86":{"version":"1"}}}"#)
      .create_async()
      .await;

    let body = fetcher()
      .fetch(&format!("{}/versions/client.json", server.url()))
      .await
      .unwrap();

    assert_eq!(body, br#"{"linux":{"x86":{"version":"1"}}}"#);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn non_success_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/versions/server.json")
      .with_status(503)
      .with_body("maintenance")
      .create_async()
      .await;

    let err = fetcher()
      .fetch(&format!("{}/versions/server.json", server.url()))
      .await
      .unwrap_err();

    match err {
      FetchError::HttpStatus {
        status, body_snippet, ..
      } => {
        assert_eq!(status.as_u16(), 503);
        assert_eq!(body_snippet, ": maintenance");
      }
      other => panic!("expected HttpStatus, got: {}", other),
    }
  }

  #[tokio::test]
  async fn unreachable_host_is_a_request_error() {
    // Port 9 (discard) is closed on test machines
    let err = fetcher().fetch("http://127.0.0.1:9/versions/client.json").await.unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
  }

  #[test]
  fn snippet_is_truncated() {
    assert_eq!(response_snippet("", 10), "");
    assert_eq!(response_snippet("abcdef", 3), ": abc");
  }
}
