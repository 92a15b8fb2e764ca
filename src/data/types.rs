use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub kickoff: Option<NaiveDateTime>,
    /// Date as printed by the source, may be empty.
    pub date: String,
    pub time: String,
    pub home: String,
    pub away: String,
    pub home_goals: u8,
    pub away_goals: u8,
}

impl MatchResult {
    pub fn new(home: impl Into<String>, away: impl Into<String>, home_goals: u8, away_goals: u8) -> Self {
        Self {
            kickoff: None,
            date: String::new(),
            time: String::new(),
            home: home.into(),
            away: away.into(),
            home_goals,
            away_goals,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.outcome() == Outcome::Draw
    }

    pub fn outcome(&self) -> Outcome {
        match self.home_goals.cmp(&self.away_goals) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Less => Outcome::AwayWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    pub fn score(&self) -> String {
        format!("{}–{}", self.home_goals, self.away_goals)
    }

    /// Identity of the match across runs.
    pub fn key(&self) -> String {
        format!(
            "{} {}|{}|{}|{}",
            self.date, self.time, self.home, self.score(), self.away
        )
    }
}

/// Matches of one source, oldest first.
#[derive(Debug, Clone)]
pub struct FetchedMatches {
    pub matches: Vec<MatchResult>,
    pub source_url: String,
    pub source_tag: String,
}
