use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TelegramCredentials;
use crate::data::types::MatchResult;
use crate::streak::types::AlertMode;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("TELEGRAM_TOKEN/TELEGRAM_CHAT_ID not set")]
    MissingCredentials,

    #[error("Telegram request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telegram API error {status}: {description}")]
    Api { status: u16, description: String },
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build the HTML alert sent to the chat.
pub fn format_alert(
    streak: usize,
    last: &MatchResult,
    threshold: usize,
    mode: AlertMode,
    source_url: &str,
) -> String {
    let when = format!("{} {}", last.date, last.time);
    let when = when.trim();
    let when = if when.is_empty() {
        String::new()
    } else {
        format!(" ({})", escape_html(when))
    };

    format!(
        "🔥 <b>Ekstraklasa</b>: seria <b>{}</b> meczów z rzędu bez remisu!\n\
         Ostatni: <b>{}</b> {} <b>{}</b>{}.\n\
         Próg: ≥ {}. Tryb: {}.\n\
         Źródło: {}",
        streak,
        escape_html(&last.home),
        last.score(),
        escape_html(&last.away),
        when,
        threshold,
        mode,
        escape_html(source_url),
    )
}

pub struct TelegramClient {
    client: Client,
    api_base: String,
    credentials: Option<TelegramCredentials>,
    dry_run: bool,
}

impl TelegramClient {
    pub fn new(api_base: String, credentials: Option<TelegramCredentials>, dry_run: bool) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// `sendMessage` with HTML parse mode. Dry runs only log the text.
    pub async fn send_message(&self, text: &str) -> Result<(), TelegramError> {
        if self.dry_run {
            info!("[DRY RUN] Telegram message would be:\n{}", text);
            return Ok(());
        }

        let creds = self.credentials.as_ref().ok_or(TelegramError::MissingCredentials)?;
        let url = format!("{}/bot{}/sendMessage", self.api_base, creds.token);

        let response = self.client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": creds.chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;

        let status = response.status();
        let body: Option<TelegramResponse> = response.json().await.ok();

        match body {
            Some(TelegramResponse { ok: true, .. }) if status.is_success() => {
                debug!("Telegram message sent to {}", creds.chat_id);
                Ok(())
            }
            other => Err(TelegramError::Api {
                status: status.as_u16(),
                description: other
                    .and_then(|b| b.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}
