//! Page-fetch capability
//!
//! [`PageFetcher`] is the seam between the crawl engine and the network. The
//! production implementation is a thin reqwest wrapper; tests substitute a
//! canned fetcher. Per the fetch contract, script problems and non-success
//! HTTP statuses do not raise: whatever body the server produced is returned
//! as a best-effort page. Only timeouts and transport failures (or a status
//! with an unreadable body) are errors.

use crate::FetchError;
use std::future::Future;
use std::time::Duration;

/// A fetched page, ready for extraction.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Page body, best-effort even on non-success statuses
    pub body: String,
}

/// Turns a URL into a fetched page within a bounded timeout.
pub trait PageFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// Production fetcher over a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds the fetcher with the given user agent.
    ///
    /// The client-level timeout is a generous outer bound; the effective
    /// per-request timeout is passed to [`PageFetcher::fetch`].
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
            Err(_) if !status.is_success() => {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
            Err(e) => {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        if !status.is_success() {
            tracing::warn!("HTTP {} for {}, extracting best-effort body", status, url);
        }

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

fn classify(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
