use chrono::{Datelike, NaiveDate};

use crate::config::SourcesConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// 90minut.pl season page.
    Liga90Html,
    /// worldfootball / weltfussball `standard_tabelle` pages.
    TableHtml,
    /// Plain text rendered by the reader proxy.
    ReaderText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub kind: SourceKind,
    pub tag: String,
}

impl Source {
    fn new(url: String, kind: SourceKind, tag: &str) -> Self {
        Self { url, kind, tag: tag.to_string() }
    }
}

/// Season slug like `2025-2026`. Seasons start in July.
pub fn season_slug(today: NaiveDate) -> String {
    let start = if today.month() >= 7 { today.year() } else { today.year() - 1 };
    format!("{}-{}", start, start + 1)
}

pub fn reader_url(reader_proxy: &str, url: &str) -> String {
    let bare = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    format!("{}http://{}", reader_proxy, bare)
}

/// Ordered list of sources to try for the given season.
pub fn candidate_sources(season: &str, config: &SourcesConfig) -> Vec<Source> {
    let liga90 = format!("http://www.90minut.pl/liga/1/liga{}.html", config.liga90_id);

    let mut sources = vec![Source::new(liga90.clone(), SourceKind::Liga90Html, "90minut")];
    if config.include_reader {
        sources.push(Source::new(
            reader_url(&config.reader_proxy, &liga90),
            SourceKind::ReaderText,
            "90minut-reader",
        ));
    }

    let tables = [
        (format!("https://www.worldfootball.net/all_matches/pol-ekstraklasa-{}/", season), "worldfootball-all"),
        (format!("https://www.worldfootball.net/schedule/pol-ekstraklasa-{}/", season), "worldfootball-schedule"),
        (format!("https://www.weltfussball.de/alle_spiele/pol-ekstraklasa-{}/", season), "weltfussball-alle"),
        (format!("https://www.weltfussball.de/spielplan/pol-ekstraklasa-{}/", season), "weltfussball-spielplan"),
    ];

    for (url, tag) in &tables {
        sources.push(Source::new(url.clone(), SourceKind::TableHtml, tag));
    }

    if config.include_reader {
        for (url, tag) in &tables {
            sources.push(Source::new(
                reader_url(&config.reader_proxy, url),
                SourceKind::ReaderText,
                &format!("{}-reader", tag),
            ));
        }
    }

    sources
}
