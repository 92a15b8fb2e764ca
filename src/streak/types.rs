use std::fmt;
use std::str::FromStr;

use crate::data::types::MatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertMode {
    /// Alert every time the streak grows past the threshold.
    #[default]
    Each,
    /// Alert once per crossing of the threshold.
    ThresholdOnly,
}

impl fmt::Display for AlertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertMode::Each => write!(f, "EACH"),
            AlertMode::ThresholdOnly => write!(f, "THRESHOLD_ONLY"),
        }
    }
}

impl FromStr for AlertMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EACH" => Ok(AlertMode::Each),
            "THRESHOLD_ONLY" => Ok(AlertMode::ThresholdOnly),
            other => Err(format!("unknown alert mode: {}", other)),
        }
    }
}

/// Trailing run of non-draw matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Streak {
    pub length: usize,
    /// Oldest match of the run. Identifies the run across runs of the bot.
    pub first: Option<MatchResult>,
    /// Most recent match of the run, `None` when the run is empty.
    pub last: Option<MatchResult>,
}

impl Streak {
    pub fn start_key(&self) -> Option<String> {
        self.first.as_ref().map(MatchResult::key)
    }

    pub fn last_key(&self) -> Option<String> {
        self.last.as_ref().map(MatchResult::key)
    }
}

/// What previous runs remembered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlertState {
    pub last_streak_len: usize,
    pub last_notified_key: Option<String>,
    pub last_notified_streak: Option<usize>,
    /// First match of the streak that was last alerted.
    pub last_notified_start_key: Option<String>,
    pub last_seen_key: Option<String>,
    pub last_seen_streak: usize,
    pub updated_at: Option<String>,
}

impl AlertState {
    /// Fold one run into the state.
    pub fn record(&mut self, streak: &Streak, notified: bool, now: String) {
        let key = streak.last_key();

        if notified {
            self.last_notified_key = key.clone();
            self.last_notified_streak = Some(streak.length);
            self.last_notified_start_key = streak.start_key();
        }
        self.last_seen_key = key;
        self.last_seen_streak = streak.length;
        self.last_streak_len = streak.length;
        self.updated_at = Some(now);
    }
}
