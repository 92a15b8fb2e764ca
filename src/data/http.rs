use anyhow::{Context, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::HttpConfig;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
    image/avif,image/webp,image/apng,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7";

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Giving up on {url} after {tries} attempts: {last}")]
    Exhausted { url: String, tries: u32, last: String },
}

/// Page fetcher that looks like a browser and retries transient failures.
pub struct PageClient {
    client: Client,
    max_tries: u32,
    backoff: Duration,
}

/// 403 and 429 are what scraping-averse sites answer under load.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Linear backoff: `base * attempt`, plus up to 250ms of jitter.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=250);
    base * attempt + Duration::from_millis(jitter)
}

impl PageClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            max_tries: config.max_tries.max(1),
            backoff: Duration::from_secs_f64(config.backoff_secs.max(0.0)),
        })
    }

    /// GET a page body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let mut last = String::new();

        for attempt in 1..=self.max_tries {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("GET {} -> {}", url, resp.status());
                    return resp.text().await.map_err(|source| HttpError::Request {
                        url: url.to_string(),
                        source,
                    });
                }
                Ok(resp) if is_retryable(resp.status()) => {
                    last = format!("HTTP {}", resp.status());
                    warn!("GET {} returned {} (attempt {}/{})", url, resp.status(), attempt, self.max_tries);
                }
                Ok(resp) => {
                    return Err(HttpError::Status {
                        url: url.to_string(),
                        status: resp.status(),
                    });
                }
                Err(e) => {
                    warn!("GET {} failed: {} (attempt {}/{})", url, e, attempt, self.max_tries);
                    last = e.to_string();
                }
            }

            if attempt < self.max_tries {
                tokio::time::sleep(backoff_delay(self.backoff, attempt)).await;
            }
        }

        Err(HttpError::Exhausted {
            url: url.to_string(),
            tries: self.max_tries,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::FORBIDDEN));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let base = Duration::from_secs(2);
        let first = backoff_delay(base, 1);
        let third = backoff_delay(base, 3);

        assert!(first >= Duration::from_secs(2) && first <= Duration::from_millis(2250));
        assert!(third >= Duration::from_secs(6) && third <= Duration::from_millis(6250));
    }

    #[tokio::test]
    async fn test_unreachable_host_exhausts_retries() {
        let config = HttpConfig {
            max_tries: 2,
            backoff_secs: 0.0,
            timeout_secs: 2,
        };
        let client = PageClient::new(&config).unwrap();

        // Port 9 on localhost refuses connections.
        let err = client.get_text("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, HttpError::Exhausted { tries: 2, .. }));
    }
}
