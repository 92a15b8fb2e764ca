use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::data::fetcher::MatchFetcher;
use crate::data::types::FetchedMatches;
use crate::execution::persistence::StateDatabase;
use crate::monitoring::logger::CsvLogger;
use crate::monitoring::telegram::{format_alert, TelegramClient};
use crate::streak::detector::current_no_draw_streak;
use crate::streak::policy::should_notify;
use crate::streak::types::AlertMode;

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub source_url: String,
    pub matches: usize,
    pub streak: usize,
    pub threshold: usize,
    pub mode: AlertMode,
    pub notified: bool,
}

/// One check-and-notify cycle: fetch, detect, decide, notify, persist.
pub struct StreakRunner {
    fetcher: MatchFetcher,
    telegram: TelegramClient,
    db: StateDatabase,
    csv: Option<CsvLogger>,
    threshold: usize,
    mode: AlertMode,
}

impl StreakRunner {
    pub fn new(
        fetcher: MatchFetcher,
        telegram: TelegramClient,
        db: StateDatabase,
        csv: Option<CsvLogger>,
        threshold: usize,
        mode: AlertMode,
    ) -> Self {
        Self { fetcher, telegram, db, csv, threshold, mode }
    }

    #[cfg(test)]
    pub fn db(&self) -> &StateDatabase {
        &self.db
    }

    pub async fn run_once(&self) -> Result<RunOutcome> {
        let result = match self.fetcher.fetch_all_matches().await {
            Ok(fetched) => self.process(&fetched).await,
            Err(e) => Err(anyhow::Error::new(e).context("Failed to fetch match results")),
        };

        if let Some(csv) = &self.csv {
            let logged = match &result {
                Ok(outcome) => csv.log_run(outcome),
                Err(e) => csv.log_failure(&format!("{:#}", e)),
            };
            if let Err(e) = logged {
                warn!("Failed to write run log: {}", e);
            }
        }

        result
    }

    /// Everything after the fetch. State is saved only once the alert went out,
    /// so a failed send is retried by the next run.
    pub async fn process(&self, fetched: &FetchedMatches) -> Result<RunOutcome> {
        let streak = current_no_draw_streak(&fetched.matches);
        info!(
            "Current no-draw streak: {} ({} matches from {})",
            streak.length,
            fetched.matches.len(),
            fetched.source_tag
        );

        let mut state = self.db.load_state()?;
        let notify = should_notify(&streak, self.threshold, self.mode, &state);

        if let (true, Some(last)) = (notify, streak.last.as_ref()) {
            let text = format_alert(streak.length, last, self.threshold, self.mode, &fetched.source_url);
            self.telegram
                .send_message(&text)
                .await
                .context("Failed to send Telegram alert")?;

            self.db.log_notification(
                streak.length,
                &last.key(),
                &fetched.source_url,
                self.mode,
                self.telegram.is_dry_run(),
            )?;
            info!("Alert sent for streak of {}", streak.length);
        }

        state.record(&streak, notify, Utc::now().to_rfc3339());
        self.db.save_state(&state)?;

        Ok(RunOutcome {
            source_url: fetched.source_url.clone(),
            matches: fetched.matches.len(),
            streak: streak.length,
            threshold: self.threshold,
            mode: self.mode,
            notified: notify,
        })
    }
}
