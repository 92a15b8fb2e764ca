use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::streak::types::{AlertMode, AlertState};

pub struct StateDatabase {
    conn: Connection,
}

/// One row of the notification log.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub id: i64,
    pub streak: usize,
    pub match_key: String,
    pub source_url: String,
    pub mode: String,
    pub dry_run: bool,
    pub sent_at: String,
}

impl StateDatabase {
    /// Open (or create) the state file. `":memory:"` gives a throwaway database.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS alert_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_streak_len INTEGER NOT NULL DEFAULT 0,
                last_notified_key TEXT,
                last_notified_streak INTEGER,
                last_notified_start_key TEXT,
                last_seen_key TEXT,
                last_seen_streak INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                streak INTEGER NOT NULL,
                match_key TEXT NOT NULL,
                source_url TEXT NOT NULL,
                mode TEXT NOT NULL,
                dry_run INTEGER NOT NULL DEFAULT 0,
                sent_at TIMESTAMP NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_sent_at ON notifications(sent_at);
            "#
        )?;

        Ok(Self { conn })
    }

    /// Load the alert state; a fresh database yields the default state.
    pub fn load_state(&self) -> Result<AlertState> {
        let state = self.conn
            .query_row(
                "SELECT last_streak_len, last_notified_key, last_notified_streak,
                        last_notified_start_key, last_seen_key, last_seen_streak, updated_at
                 FROM alert_state WHERE id = 1",
                [],
                |row| {
                    Ok(AlertState {
                        last_streak_len: row.get(0)?,
                        last_notified_key: row.get(1)?,
                        last_notified_streak: row.get(2)?,
                        last_notified_start_key: row.get(3)?,
                        last_seen_key: row.get(4)?,
                        last_seen_streak: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(state.unwrap_or_default())
    }

    pub fn save_state(&self, state: &AlertState) -> Result<()> {
        self.conn.execute(
            "INSERT INTO alert_state (id, last_streak_len, last_notified_key, last_notified_streak,
                                      last_notified_start_key, last_seen_key, last_seen_streak, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                last_streak_len = excluded.last_streak_len,
                last_notified_key = excluded.last_notified_key,
                last_notified_streak = excluded.last_notified_streak,
                last_notified_start_key = excluded.last_notified_start_key,
                last_seen_key = excluded.last_seen_key,
                last_seen_streak = excluded.last_seen_streak,
                updated_at = excluded.updated_at",
            params![
                state.last_streak_len,
                state.last_notified_key,
                state.last_notified_streak,
                state.last_notified_start_key,
                state.last_seen_key,
                state.last_seen_streak,
                state.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Append to the notification log
    pub fn log_notification(
        &self,
        streak: usize,
        match_key: &str,
        source_url: &str,
        mode: AlertMode,
        dry_run: bool,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO notifications (streak, match_key, source_url, mode, dry_run, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                streak,
                match_key,
                source_url,
                mode.to_string(),
                dry_run,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_notifications(&self) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recent notifications first
    pub fn recent_notifications(&self, limit: usize) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, streak, match_key, source_url, mode, dry_run, sent_at
             FROM notifications
             ORDER BY id DESC
             LIMIT ?1"
        )?;

        let records = stmt.query_map(params![limit], |row| {
            Ok(NotificationRecord {
                id: row.get(0)?,
                streak: row.get(1)?,
                match_key: row.get(2)?,
                source_url: row.get(3)?,
                mode: row.get(4)?,
                dry_run: row.get(5)?,
                sent_at: row.get(6)?,
            })
        })?;

        records.collect::<Result<Vec<_>, _>>().map_err(|e| e.into())
    }
}
