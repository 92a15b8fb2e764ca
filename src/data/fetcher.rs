use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::{HttpConfig, SourcesConfig};
use crate::data::http::PageClient;
use crate::data::parsers::{parse_90minut_html, parse_reader_text, parse_table_html};
use crate::data::sources::{candidate_sources, season_slug, Source, SourceKind};
use crate::data::types::{FetchedMatches, MatchResult};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("All {tried} sources failed, last error: {last:#}")]
    AllSourcesFailed { tried: usize, last: anyhow::Error },

    #[error("No matches found in any of {0} sources")]
    NoMatches(usize),
}

/// Pick the parser that fits the source.
pub fn parse_source(kind: SourceKind, body: &str) -> Result<Vec<MatchResult>> {
    match kind {
        SourceKind::Liga90Html => parse_90minut_html(body),
        SourceKind::TableHtml => parse_table_html(body),
        SourceKind::ReaderText => parse_reader_text(body),
    }
}

pub struct MatchFetcher {
    client: PageClient,
    sources: SourcesConfig,
}

impl MatchFetcher {
    pub fn new(http: &HttpConfig, sources: SourcesConfig) -> Result<Self> {
        Ok(Self {
            client: PageClient::new(http)?,
            sources,
        })
    }

    pub fn sources_for_today(&self) -> Vec<Source> {
        let season = season_slug(Utc::now().date_naive());
        candidate_sources(&season, &self.sources)
    }

    pub async fn fetch_all_matches(&self) -> Result<FetchedMatches, SourceError> {
        self.fetch_from(self.sources_for_today()).await
    }

    /// Try sources in order until one yields matches.
    pub async fn fetch_from(&self, sources: Vec<Source>) -> Result<FetchedMatches, SourceError> {
        let tried = sources.len();
        let mut last_error: Option<anyhow::Error> = None;

        for source in sources {
            info!("Fetching ({}): {}", source.tag, source.url);

            let parsed = match self.client.get_text(&source.url).await {
                Ok(body) => parse_source(source.kind, &body),
                Err(e) => Err(e.into()),
            };

            match parsed {
                Ok(matches) if !matches.is_empty() => {
                    info!("Got {} matches from {}", matches.len(), source.url);
                    return Ok(FetchedMatches {
                        matches,
                        source_url: source.url,
                        source_tag: source.tag,
                    });
                }
                Ok(_) => {
                    warn!("No matches parsed from {}, trying next source", source.url);
                }
                Err(e) => {
                    warn!("Source {} failed: {:#}, trying next source", source.url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(last) => SourceError::AllSourcesFailed { tried, last },
            None => SourceError::NoMatches(tried),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{serve, Route};

    #[test]
    fn test_parse_source_dispatch() {
        let text = "Legia Warszawa 2-1 Lech Poznań";
        assert_eq!(parse_source(SourceKind::ReaderText, text).unwrap().len(), 1);
        assert!(parse_source(SourceKind::TableHtml, text).unwrap().is_empty());
    }

    #[test]
    fn test_source_error_messages() {
        let err = SourceError::AllSourcesFailed {
            tried: 10,
            last: anyhow::anyhow!("HTTP 403 Forbidden"),
        };
        assert_eq!(err.to_string(), "All 10 sources failed, last error: HTTP 403 Forbidden");
        assert_eq!(SourceError::NoMatches(5).to_string(), "No matches found in any of 5 sources");
    }

    #[test]
    fn test_sources_follow_config() {
        let http = HttpConfig::default();
        let sources = SourcesConfig {
            liga90_id: "15000".to_string(),
            ..SourcesConfig::default()
        };
        let fetcher = MatchFetcher::new(&http, sources).unwrap();

        let first = &fetcher.sources_for_today()[0];
        assert_eq!(first.url, "http://www.90minut.pl/liga/1/liga15000.html");
    }

    fn quick_fetcher() -> MatchFetcher {
        let http = HttpConfig {
            max_tries: 1,
            backoff_secs: 0.0,
            timeout_secs: 5,
        };
        MatchFetcher::new(&http, SourcesConfig::default()).unwrap()
    }

    fn reader(base: &str, path: &str) -> Source {
        Source {
            url: format!("{}{}", base, path),
            kind: SourceKind::ReaderText,
            tag: path.trim_start_matches('/').to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_source_falls_through_to_next() {
        let base = serve(vec![
            Route::new("/empty", 200, "Tabela ligowa\nnothing here"),
            Route::new("/results", 200, "Legia Warszawa 2-1 Lech Poznań\nPogoń Szczecin 0-0 Górnik Zabrze"),
        ])
        .await;

        let fetched = quick_fetcher()
            .fetch_from(vec![reader(&base, "/empty"), reader(&base, "/results")])
            .await
            .unwrap();

        assert_eq!(fetched.matches.len(), 2);
        assert_eq!(fetched.source_url, format!("{}/results", base));
        assert_eq!(fetched.source_tag, "results");
    }

    #[tokio::test]
    async fn test_failing_source_falls_through_to_next() {
        let base = serve(vec![
            Route::new("/results", 200, "Legia Warszawa 2-1 Lech Poznań"),
        ])
        .await;

        let fetched = quick_fetcher()
            .fetch_from(vec![reader(&base, "/gone"), reader(&base, "/results")])
            .await
            .unwrap();

        assert_eq!(fetched.matches.len(), 1);
        assert_eq!(fetched.source_url, format!("{}/results", base));
    }

    #[tokio::test]
    async fn test_every_source_failing() {
        let base = serve(vec![Route::new("/limited", 429, "")]).await;

        let err = quick_fetcher()
            .fetch_from(vec![reader(&base, "/gone"), reader(&base, "/limited")])
            .await
            .unwrap_err();

        match err {
            SourceError::AllSourcesFailed { tried, last } => {
                assert_eq!(tried, 2);
                assert!(format!("{:#}", last).contains("/limited"));
            }
            other => panic!("expected AllSourcesFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_every_source_empty() {
        let base = serve(vec![
            Route::new("/a", 200, "no scores"),
            Route::new("/b", 200, ""),
        ])
        .await;

        let err = quick_fetcher()
            .fetch_from(vec![reader(&base, "/a"), reader(&base, "/b")])
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::NoMatches(2)));
    }
}
