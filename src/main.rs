mod config;
mod data;
mod execution;
mod monitoring;
mod streak;
#[cfg(test)]
mod testkit;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use config::{Config, EnvConfig};
use data::fetcher::MatchFetcher;
use execution::persistence::StateDatabase;
use execution::runner::StreakRunner;
use monitoring::logger::CsvLogger;
use monitoring::telegram::TelegramClient;

#[derive(Debug, Parser)]
#[command(name = "ekstra-streak-bot", version, about = "Ekstraklasa no-draw streak alerts on Telegram")]
struct Cli {
    /// Path to the TOML config file (optional)
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Log the alert instead of sending it
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check once and exit
    Run,
    /// Check now and then on a fixed interval until Ctrl-C
    Watch {
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show the stored alert state
    Status,
    /// Send a test message to the configured chat
    TestTelegram,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let env_config = EnvConfig::load()?;
    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env(&env_config);
    if cli.dry_run {
        config.system.dry_run = true;
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let runner = build_runner(&config, &env_config)?;
            let outcome = runner.run_once().await?;
            tracing::info!(
                "Run complete: streak={} threshold={} notified={}",
                outcome.streak, outcome.threshold, outcome.notified
            );
        }
        Command::Watch { interval } => {
            let runner = build_runner(&config, &env_config)?;
            let secs = interval.unwrap_or(config.schedule.interval_secs).max(1);
            watch(&runner, Duration::from_secs(secs)).await;
        }
        Command::Status => {
            let db = StateDatabase::new(&config.system.state_path)?;
            print_status(&db)?;
        }
        Command::TestTelegram => {
            telegram_client(&config, &env_config)
                .send_message("🧪 <b>Ekstraklasa streak bot</b>: test message")
                .await?;
            tracing::info!("Test message sent");
        }
    }

    Ok(())
}

fn build_runner(config: &Config, env_config: &EnvConfig) -> Result<StreakRunner> {
    if !config.system.dry_run {
        env_config.require_telegram()?;
    }

    tracing::info!("Threshold: {}", env_config.threshold);
    tracing::info!("Alert mode: {}", env_config.alert_mode);
    tracing::info!("Dry run mode: {}", config.system.dry_run);
    tracing::info!("State database: {}", config.system.state_path);

    let db = StateDatabase::new(&config.system.state_path)
        .with_context(|| format!("Failed to open state database: {}", config.system.state_path))?;

    let csv = if config.monitoring.csv_logging {
        Some(CsvLogger::new(config.monitoring.csv_log_path.clone())?)
    } else {
        None
    };

    let fetcher = MatchFetcher::new(&config.http, config.sources.clone())?;
    let telegram = telegram_client(config, env_config);

    Ok(StreakRunner::new(
        fetcher,
        telegram,
        db,
        csv,
        env_config.threshold,
        env_config.alert_mode,
    ))
}

/// Credentials stay optional here: dry runs never touch the API.
fn telegram_client(config: &Config, env_config: &EnvConfig) -> TelegramClient {
    TelegramClient::new(
        config.telegram.api_base.clone(),
        env_config.telegram.clone(),
        config.system.dry_run,
    )
}

async fn watch(runner: &StreakRunner, every: Duration) {
    tracing::info!("Watching every {}s, Ctrl-C to stop", every.as_secs());

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match runner.run_once().await {
                    Ok(outcome) => tracing::info!(
                        "Streak {} (notified: {})", outcome.streak, outcome.notified
                    ),
                    Err(e) => tracing::error!("Run failed: {:#}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                break;
            }
        }
    }
}

fn print_status(db: &StateDatabase) -> Result<()> {
    let state = db.load_state()?;

    println!("Last streak length:   {}", state.last_streak_len);
    println!("Last seen match:      {}", state.last_seen_key.as_deref().unwrap_or("-"));
    println!(
        "Last alert:           {}",
        match (&state.last_notified_key, state.last_notified_streak) {
            (Some(key), Some(len)) => format!("streak {} at {}", len, key),
            _ => "-".to_string(),
        }
    );
    println!("Updated at:           {}", state.updated_at.as_deref().unwrap_or("-"));
    println!("Notifications sent:   {}", db.count_notifications()?);

    for record in db.recent_notifications(5)? {
        println!(
            "  #{} {} streak={} mode={}{} {}",
            record.id,
            record.sent_at,
            record.streak,
            record.mode,
            if record.dry_run { " (dry run)" } else { "" },
            record.match_key
        );
    }

    Ok(())
}
