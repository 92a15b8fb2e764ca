use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::data::types::MatchResult;

/// Scores above this are treated as misparsed dates or round numbers.
const MAX_GOALS: u8 = 15;

const DATETIME_FORMATS: [(&str, bool); 4] = [
    ("%d/%m/%Y %H:%M", true),
    ("%d/%m/%y %H:%M", false),
    ("%d.%m.%Y %H:%M", true),
    ("%d.%m.%y %H:%M", false),
];

const DATE_FORMATS: [(&str, bool); 4] = [
    ("%d/%m/%Y", true),
    ("%d/%m/%y", false),
    ("%d.%m.%Y", true),
    ("%d.%m.%y", false),
];

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {}: {:?}", css, e))
}

fn cell_text(el: &ElementRef) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn plausible_team(name: &str) -> bool {
    name.chars().count() >= 3 && name.chars().any(char::is_alphabetic)
}

fn goals(raw: &str) -> Option<u8> {
    raw.parse::<u8>().ok().filter(|g| *g <= MAX_GOALS)
}

/// Parse a date cell plus an optional time cell.
pub fn parse_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    let full = format!("{} {}", date, time.trim());
    let full = full.trim();

    // %Y happily reads "25" as year 25, so four-digit formats must yield a real year.
    for (fmt, four_digit) in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(full, fmt) {
            if !four_digit || dt.year() >= 1000 {
                return Some(dt);
            }
        }
    }

    for (fmt, four_digit) in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date, fmt) {
            if !four_digit || d.year() >= 1000 {
                return d.and_hms_opt(0, 0, 0);
            }
        }
    }

    None
}

/// worldfootball.net / weltfussball.de result tables.
pub fn parse_table_html(html: &str) -> Result<Vec<MatchResult>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.standard_tabelle")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let score_re = Regex::new(r"^(\d+)\s*[:–-]\s*(\d+)(?:\s*\(.*\))?$")?;

    let mut matches = Vec::new();
    let mut last_date = String::new();

    for table in document.select(&table_sel) {
        for row in table.select(&row_sel) {
            let cells: Vec<String> = row.select(&cell_sel).map(|c| cell_text(&c)).collect();
            if cells.len() < 5 {
                continue;
            }

            // Consecutive fixtures on the same day leave the date cell empty.
            if !cells[0].is_empty() {
                last_date = cells[0].clone();
            }

            let Some(caps) = score_re.captures(&cells[3]) else {
                continue;
            };
            let (Some(home_goals), Some(away_goals)) = (goals(&caps[1]), goals(&caps[2])) else {
                continue;
            };

            matches.push(MatchResult {
                kickoff: parse_datetime(&last_date, &cells[1]),
                date: last_date.clone(),
                time: cells[1].clone(),
                home: cells[2].clone(),
                away: cells[4].clone(),
                home_goals,
                away_goals,
            });
        }
    }

    matches.sort_by_key(|m| m.kickoff);
    Ok(matches)
}

/// Line-oriented parser for `TeamA 2-1 TeamB` and `TeamA - TeamB 2:1`.
/// Lines are taken in chronological order.
pub fn parse_text_lines<'a, I>(lines: I) -> Result<Vec<MatchResult>>
where
    I: IntoIterator<Item = &'a str>,
{
    let score_between = Regex::new(r"^(.{2,60}?)\s+(\d{1,2})\s*[:–-]\s*(\d{1,2})\s+(.{2,60})$")?;
    let score_after = Regex::new(r"^(.{2,60}?)\s[-–]\s(.{2,60}?)\s+(\d{1,2})\s*[:–-]\s*(\d{1,2})(?:\s|$)")?;

    let mut matches = Vec::new();

    for line in lines {
        let line = line.trim();
        let lower = line.to_lowercase();
        if line.is_empty() || lower.starts_with("tabela") || lower.starts_with("ostatnia kolejka") {
            continue;
        }

        let parsed = if let Some(c) = score_between.captures(line) {
            (c[1].trim().to_string(), c[4].trim().to_string(), goals(&c[2]), goals(&c[3]))
        } else if let Some(c) = score_after.captures(line) {
            (c[1].trim().to_string(), c[2].trim().to_string(), goals(&c[3]), goals(&c[4]))
        } else {
            continue;
        };

        let (home, away, Some(home_goals), Some(away_goals)) = parsed else {
            continue;
        };
        if !plausible_team(&home) || !plausible_team(&away) {
            continue;
        }

        matches.push(MatchResult::new(home, away, home_goals, away_goals));
    }

    Ok(matches)
}

/// Text served by the reader proxy.
pub fn parse_reader_text(content: &str) -> Result<Vec<MatchResult>> {
    parse_text_lines(content.lines())
}

/// 90minut.pl season page: rows with a `h-a` cell between two team cells.
pub fn parse_90minut_html(html: &str) -> Result<Vec<MatchResult>> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let score_re = Regex::new(r"^(\d{1,2})\s*[-:–]\s*(\d{1,2})$")?;

    let mut matches = Vec::new();
    let mut row_lines = Vec::new();

    for row in document.select(&row_sel) {
        // Nested layout tables repeat their children's text; only leaf rows count.
        if row.select(&row_sel).any(|inner| inner.id() != row.id()) {
            continue;
        }

        let cells: Vec<String> = row.select(&cell_sel).map(|c| cell_text(&c)).collect();
        row_lines.push(cells.join(" "));

        for i in 1..cells.len().saturating_sub(1) {
            let Some(caps) = score_re.captures(&cells[i]) else {
                continue;
            };
            let (home, away) = (&cells[i - 1], &cells[i + 1]);
            let (Some(home_goals), Some(away_goals)) = (goals(&caps[1]), goals(&caps[2])) else {
                continue;
            };
            if plausible_team(home) && plausible_team(away) {
                matches.push(MatchResult::new(home.clone(), away.clone(), home_goals, away_goals));
                break;
            }
        }
    }

    if matches.is_empty() {
        return parse_text_lines(row_lines.iter().map(String::as_str));
    }
    Ok(matches)
}
